//! CRC-32 verification helper (out of the core's scope, but shipped for
//! callers who want it).
//!
//! `EntryDescriptor::content()` makes no guarantee about verifying the
//! decompressed bytes against the entry's stored CRC-32; wrap the stream in
//! [`Crc32Reader`] if you need that guarantee.

use std::io;
use std::io::prelude::*;

use crc32fast::Hasher;

/// Reads through `inner`, checking the running CRC-32 against
/// `expected_checksum` once the inner reader reaches EOF.
pub struct Crc32Reader<R> {
    inner: R,
    hasher: Hasher,
    expected_checksum: u32,
}

impl<R> Crc32Reader<R> {
    pub fn new(inner: R, expected_checksum: u32) -> Crc32Reader<R> {
        Crc32Reader {
            inner,
            hasher: Hasher::new(),
            expected_checksum,
        }
    }

    fn check_matches(&self) -> bool {
        self.expected_checksum == self.hasher.clone().finalize()
    }
}

impl<R: Read> Read for Crc32Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        if count == 0 && !buf.is_empty() && !self.check_matches() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "crc32 mismatch"));
        }
        self.hasher.update(&buf[0..count]);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_with_zero_checksum_matches() {
        let data: &[u8] = b"";
        let mut buf = [0; 1];
        let mut reader = Crc32Reader::new(data, 0);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn empty_input_with_wrong_checksum_fails() {
        let data: &[u8] = b"";
        let mut buf = [0; 1];
        let mut reader = Crc32Reader::new(data, 1);
        assert!(reader.read(&mut buf).is_err());
    }

    #[test]
    fn byte_by_byte_read_still_checksums_correctly() {
        let data: &[u8] = b"1234";
        let mut buf = [0; 1];
        let mut reader = Crc32Reader::new(data, 0x9be3e0a3);
        for _ in 0..4 {
            assert_eq!(reader.read(&mut buf).unwrap(), 1);
        }
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn zero_length_read_does_not_trigger_eof_check() {
        let data: &[u8] = b"1234";
        let mut buf = [0; 5];
        let mut reader = Crc32Reader::new(data, 0x9be3e0a3);
        assert_eq!(reader.read(&mut buf[..0]).unwrap(), 0);
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
    }
}
