//! Text decoding for entry names and comments (C7).
//!
//! A ZIP header's general-purpose flag bit 11 (the "language encoding flag")
//! tells us whether a name/comment is UTF-8. When it isn't set, the bytes
//! are in whatever legacy code page the archiver used; PKZIP itself always
//! meant CP437 (the original IBM PC OEM code page), so that's the default
//! here. Callers with archives from a different tool can supply their own
//! [`Codec`].

use codepage_437::{BorrowFromCp437, CP437_CONTROL, IntoCp437};
use std::borrow::Cow;

/// Decodes a legacy (non-UTF-8) byte slice into text.
///
/// The UTF-8 path is handled directly by [`decode`] and doesn't go through
/// this trait, since it isn't a "code page" in the same sense.
pub trait Codec {
    fn decode(&self, bytes: &[u8]) -> String;
}

/// The IBM PC code page 437, the original DOS OEM character set and the
/// de facto default for non-UTF-8 ZIP entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cp437Codec;

impl Codec for Cp437Codec {
    fn decode(&self, bytes: &[u8]) -> String {
        if bytes.is_empty() {
            return String::new();
        }
        match Cow::borrow_from_cp437(bytes, &CP437_CONTROL) {
            Cow::Borrowed(s) => s.to_string(),
            Cow::Owned(s) => s,
        }
    }
}

impl Cp437Codec {
    /// Encodes `text` back into CP437 bytes, failing if any character is
    /// outside the table. Encoding is not on the core's critical path (the
    /// engine only ever decodes), but it's handy for tests and for callers
    /// who want to round-trip a name.
    pub fn encode(text: &str) -> Result<Vec<u8>, codepage_437::IntoCp437Error> {
        text.into_cp437(&CP437_CONTROL)
    }
}

/// Decodes `bytes` as UTF-8 if `prefer_utf8` is set (substituting U+FFFD for
/// malformed sequences), otherwise via `codec`.
pub fn decode(bytes: &[u8], prefer_utf8: bool, codec: &dyn Codec) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    if prefer_utf8 {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        codec.decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_decodes_to_empty_string() {
        assert_eq!(decode(&[], false, &Cp437Codec), "");
        assert_eq!(decode(&[], true, &Cp437Codec), "");
    }

    #[test]
    fn ascii_round_trips() {
        assert_eq!(decode(&[65, 66, 67], false, &Cp437Codec), "ABC");
    }

    #[test]
    fn cp437_high_bytes_decode_to_greek() {
        assert_eq!(decode(&[227, 228, 229], false, &Cp437Codec), "\u{3c0}\u{3a3}\u{3c3}");
    }

    #[test]
    fn cp437_encode_round_trips() {
        let bytes = Cp437Codec::encode("\u{3c0}\u{3a3}\u{3c3}").unwrap();
        assert_eq!(bytes, vec![227, 228, 229]);
    }

    #[test]
    fn cp437_encode_rejects_out_of_table_codepoint() {
        assert!(Cp437Codec::encode("\u{500}").is_err());
    }

    #[test]
    fn every_byte_round_trips_through_cp437() {
        for b in 0u16..256 {
            let b = b as u8;
            let decoded = decode(&[b], false, &Cp437Codec);
            let encoded = Cp437Codec::encode(&decoded).unwrap();
            assert_eq!(encoded, vec![b]);
        }
    }

    #[test]
    fn utf8_flag_decodes_multibyte_name() {
        assert_eq!(decode(&[0xC3, 0xA9], true, &Cp437Codec), "é");
    }

    #[test]
    fn cp437_single_byte_e_acute() {
        assert_eq!(decode(&[0x82], false, &Cp437Codec), "é");
    }
}
