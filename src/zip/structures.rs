//! ZIP file format data structures and their pure byte-to-record decoders.
//!
//! These functions are offset-free: they take an already-sliced buffer of
//! exactly the right fixed size and parse it into a typed record. Verifying
//! that a signature appears where the caller expected it to, and that a
//! record's declared variable-length payload actually fits in its
//! container, is the walker's job (`directory.rs`, `locate.rs`), not this
//! module's.

use byteorder::{ByteOrder, LittleEndian};
use chrono::NaiveDateTime;

use crate::error::{ZipError, ZipResult};

pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
pub const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4b50;
pub const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;

pub const END_RECORD_LEN: usize = 22;
pub const MAX_COMMENT_LEN: usize = 65535;
pub const ZIP64_LOCATOR_LEN: usize = 20;
pub const ZIP64_END_RECORD_LEN: usize = 56;
pub const FILE_HEADER_LEN: usize = 46;
pub const LOCAL_HEADER_LEN: usize = 30;
pub const ENCRYPTION_HEADER_LEN: u64 = 12;
pub const EXTRA_FIELD_HEADER_LEN: usize = 4;

pub const MAGIC_U16: u16 = 0xFFFF;
pub const MAGIC_U32: u32 = 0xFFFF_FFFF;

const ZIP64_EXTRA_ID: u16 = 0x0001;

/// A ZIP compression method, per the registry in the APPNOTE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Shrunk,
    Reduced1,
    Reduced2,
    Reduced3,
    Reduced4,
    Imploded,
    Tokenized,
    Deflated,
    Deflated64,
    IbmTerseOld,
    Bzip2,
    Lzma,
    IbmTerseNew,
    Lz77,
    WavPack,
    Ppmd,
    /// Any code not in the table above.
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(method: u16) -> Self {
        match method {
            0 => CompressionMethod::Stored,
            1 => CompressionMethod::Shrunk,
            2 => CompressionMethod::Reduced1,
            3 => CompressionMethod::Reduced2,
            4 => CompressionMethod::Reduced3,
            5 => CompressionMethod::Reduced4,
            6 => CompressionMethod::Imploded,
            7 => CompressionMethod::Tokenized,
            8 => CompressionMethod::Deflated,
            9 => CompressionMethod::Deflated64,
            10 => CompressionMethod::IbmTerseOld,
            12 => CompressionMethod::Bzip2,
            14 => CompressionMethod::Lzma,
            18 => CompressionMethod::IbmTerseNew,
            19 => CompressionMethod::Lz77,
            97 => CompressionMethod::WavPack,
            98 => CompressionMethod::Ppmd,
            other => CompressionMethod::Unknown(other),
        }
    }
}

/// The legacy 22-byte End-of-Central-Directory record (comment excluded;
/// the walker reads that separately since its length depends on this
/// record).
#[derive(Debug, Clone, Copy)]
pub struct EndRecord {
    pub disk: u16,
    pub directory_disk: u16,
    pub disk_entry_count: u16,
    pub entry_count: u16,
    pub directory_size: u32,
    pub directory_offset: u32,
    pub comment_len: u16,
}

impl EndRecord {
    /// Parses a buffer of exactly `END_RECORD_LEN` bytes, including the
    /// leading signature.
    pub fn parse(buf: &[u8]) -> ZipResult<Self> {
        debug_assert_eq!(buf.len(), END_RECORD_LEN);
        Ok(Self {
            disk: LittleEndian::read_u16(&buf[4..6]),
            directory_disk: LittleEndian::read_u16(&buf[6..8]),
            disk_entry_count: LittleEndian::read_u16(&buf[8..10]),
            entry_count: LittleEndian::read_u16(&buf[10..12]),
            directory_size: LittleEndian::read_u32(&buf[12..16]),
            directory_offset: LittleEndian::read_u32(&buf[16..20]),
            comment_len: LittleEndian::read_u16(&buf[20..22]),
        })
    }
}

/// 20-byte pointer to the ZIP64 end-of-central-directory record.
#[derive(Debug, Clone, Copy)]
pub struct Zip64Locator {
    pub zip64_disk: u32,
    pub zip64_offset: u64,
    pub disk_count: u32,
}

impl Zip64Locator {
    pub fn parse(buf: &[u8]) -> ZipResult<Self> {
        debug_assert_eq!(buf.len(), ZIP64_LOCATOR_LEN);
        Ok(Self {
            zip64_disk: LittleEndian::read_u32(&buf[4..8]),
            zip64_offset: LittleEndian::read_u64(&buf[8..16]),
            disk_count: LittleEndian::read_u32(&buf[16..20]),
        })
    }
}

/// The 64-bit replacement for every possibly-sentinel field of
/// [`EndRecord`]. Any trailing "extensible data sector" is ignored.
#[derive(Debug, Clone, Copy)]
pub struct Zip64EndRecord {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk: u32,
    pub directory_disk: u32,
    pub disk_entry_count: u64,
    pub entry_count: u64,
    pub directory_size: u64,
    pub directory_offset: u64,
}

impl Zip64EndRecord {
    /// Parses the fixed 56-byte prefix of the record; any bytes after that
    /// (the extensible data sector) are the caller's to ignore.
    pub fn parse(buf: &[u8]) -> ZipResult<Self> {
        debug_assert!(buf.len() >= ZIP64_END_RECORD_LEN);
        Ok(Self {
            version_made_by: LittleEndian::read_u16(&buf[12..14]),
            version_needed: LittleEndian::read_u16(&buf[14..16]),
            disk: LittleEndian::read_u32(&buf[16..20]),
            directory_disk: LittleEndian::read_u32(&buf[20..24]),
            disk_entry_count: LittleEndian::read_u64(&buf[24..32]),
            entry_count: LittleEndian::read_u64(&buf[32..40]),
            directory_size: LittleEndian::read_u64(&buf[40..48]),
            directory_offset: LittleEndian::read_u64(&buf[48..56]),
        })
    }
}

/// The fixed 46-byte portion of a central directory file header. The
/// variable-length name/extra/comment blobs that follow are read and
/// decoded by the walker, not here.
#[derive(Debug, Clone, Copy)]
pub struct CentralFileHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
    pub comment_len: u16,
    pub local_disk: u16,
    pub internal_attr: u16,
    pub external_attr: u32,
    pub local_offset: u32,
}

impl CentralFileHeader {
    pub fn parse(buf: &[u8]) -> ZipResult<Self> {
        debug_assert_eq!(buf.len(), FILE_HEADER_LEN);
        Ok(Self {
            version_made_by: LittleEndian::read_u16(&buf[4..6]),
            version_needed: LittleEndian::read_u16(&buf[6..8]),
            flags: LittleEndian::read_u16(&buf[8..10]),
            compression_method: LittleEndian::read_u16(&buf[10..12]),
            mod_time: LittleEndian::read_u16(&buf[12..14]),
            mod_date: LittleEndian::read_u16(&buf[14..16]),
            crc32: LittleEndian::read_u32(&buf[16..20]),
            compressed_size: LittleEndian::read_u32(&buf[20..24]),
            uncompressed_size: LittleEndian::read_u32(&buf[24..28]),
            name_len: LittleEndian::read_u16(&buf[28..30]),
            extra_len: LittleEndian::read_u16(&buf[30..32]),
            comment_len: LittleEndian::read_u16(&buf[32..34]),
            local_disk: LittleEndian::read_u16(&buf[34..36]),
            internal_attr: LittleEndian::read_u16(&buf[36..38]),
            external_attr: LittleEndian::read_u32(&buf[38..42]),
            local_offset: LittleEndian::read_u32(&buf[42..46]),
        })
    }

    pub fn is_utf8_name(&self) -> bool {
        self.flags & (1 << 11) != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & 1 != 0
    }
}

/// The fixed 30-byte portion of a local file header.
#[derive(Debug, Clone, Copy)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
}

impl LocalFileHeader {
    pub fn parse(buf: &[u8]) -> ZipResult<Self> {
        debug_assert_eq!(buf.len(), LOCAL_HEADER_LEN);
        Ok(Self {
            version_needed: LittleEndian::read_u16(&buf[4..6]),
            flags: LittleEndian::read_u16(&buf[6..8]),
            compression_method: LittleEndian::read_u16(&buf[8..10]),
            mod_time: LittleEndian::read_u16(&buf[10..12]),
            mod_date: LittleEndian::read_u16(&buf[12..14]),
            crc32: LittleEndian::read_u32(&buf[14..18]),
            compressed_size: LittleEndian::read_u32(&buf[18..22]),
            uncompressed_size: LittleEndian::read_u32(&buf[22..26]),
            name_len: LittleEndian::read_u16(&buf[26..28]),
            extra_len: LittleEndian::read_u16(&buf[28..30]),
        })
    }
}

/// Which central-header fields still hold their 32/16-bit sentinel and so
/// are eligible for a ZIP64 extra-field override, and in what fixed order
/// (uncompressed, compressed, local_offset, local_disk) they'd be consumed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zip64Need {
    pub uncompressed_size: bool,
    pub compressed_size: bool,
    pub local_offset: bool,
    pub local_disk: bool,
}

impl Zip64Need {
    pub fn required_bytes(&self) -> usize {
        let mut n = 0;
        if self.uncompressed_size {
            n += 8;
        }
        if self.compressed_size {
            n += 8;
        }
        if self.local_offset {
            n += 8;
        }
        if self.local_disk {
            n += 4;
        }
        n
    }
}

/// The values recovered from a ZIP64 extra field, present only for the
/// fields that were actually needed (and thus actually encoded).
#[derive(Debug, Clone, Copy, Default)]
pub struct Zip64Values {
    pub uncompressed_size: Option<u64>,
    pub compressed_size: Option<u64>,
    pub local_offset: Option<u64>,
    pub local_disk: Option<u32>,
}

/// Scans an extra-field blob (a concatenation of `(id: u16, size: u16, data:
/// u8[size])` tuples) for the first valid ZIP64 extra (`id == 0x0001`), and
/// if found, decodes the fields `need` says are present, in the fixed order
/// uncompressed/compressed/local_offset/local_disk.
///
/// Returns `None` if no ZIP64 extra is present, or if one is present but too
/// short for what `need` demands — an undersized extra means the scan aborts
/// without applying any override.
pub fn scan_zip64_extra(extra: &[u8], need: Zip64Need) -> Option<Zip64Values> {
    let mut cursor = extra;
    while cursor.len() >= EXTRA_FIELD_HEADER_LEN {
        let id = LittleEndian::read_u16(&cursor[0..2]);
        let data_size = LittleEndian::read_u16(&cursor[2..4]) as usize;
        let remaining_after_header = cursor.len() - EXTRA_FIELD_HEADER_LEN;
        if data_size > remaining_after_header {
            // Truncated tuple; nothing more to trust in this blob.
            break;
        }
        let data = &cursor[EXTRA_FIELD_HEADER_LEN..EXTRA_FIELD_HEADER_LEN + data_size];

        if id == ZIP64_EXTRA_ID {
            return parse_zip64_extra(data, need);
        }

        cursor = &cursor[EXTRA_FIELD_HEADER_LEN + data_size..];
    }
    None
}

fn parse_zip64_extra(data: &[u8], need: Zip64Need) -> Option<Zip64Values> {
    if data.len() < need.required_bytes() {
        return None;
    }

    let mut values = Zip64Values::default();
    let mut pos = 0usize;
    if need.uncompressed_size {
        values.uncompressed_size = Some(LittleEndian::read_u64(&data[pos..pos + 8]));
        pos += 8;
    }
    if need.compressed_size {
        values.compressed_size = Some(LittleEndian::read_u64(&data[pos..pos + 8]));
        pos += 8;
    }
    if need.local_offset {
        values.local_offset = Some(LittleEndian::read_u64(&data[pos..pos + 8]));
        pos += 8;
    }
    if need.local_disk {
        values.local_disk = Some(LittleEndian::read_u32(&data[pos..pos + 4]));
    }
    Some(values)
}

/// Unpacks a DOS-packed date/time pair into a civil timestamp.
///
/// Date bits 0-4 are the day (1-31), 5-8 the month (1-12), 9-15 the year
/// offset from 1980. Time bits 0-4 are seconds/2, 5-10 the minute, 11-15 the
/// hour. Milliseconds are always zero; DOS timestamps have 2-second
/// resolution.
pub fn unpack_dos_time(date: u16, time: u16) -> ZipResult<NaiveDateTime> {
    let day = (date & 0x1F) as u32;
    let month = ((date >> 5) & 0x0F) as u32;
    let year = ((date >> 9) & 0x7F) as i32 + 1980;

    let second = ((time & 0x1F) as u32) * 2;
    let minute = ((time >> 5) & 0x3F) as u32;
    let hour = ((time >> 11) & 0x1F) as u32;

    let date = chrono::NaiveDate::from_ymd_opt(year, month.max(1), day.max(1)).ok_or(
        ZipError::MalformedArchive {
            offset: 0,
            reason: "invalid DOS date in header",
        },
    )?;
    date.and_hms_opt(hour, minute, second)
        .ok_or(ZipError::MalformedArchive {
            offset: 0,
            reason: "invalid DOS time in header",
        })
}

/// Packs a civil timestamp back into the DOS date/time representation.
/// Provided mainly so the unpack/pack round trip is testable; the core
/// reader never needs to re-pack a timestamp.
pub fn pack_dos_time(dt: NaiveDateTime) -> (u16, u16) {
    use chrono::{Datelike, Timelike};

    let date = ((dt.year() - 1980) as u16) << 9 | (dt.month() as u16) << 5 | dt.day() as u16;
    let time = (dt.hour() as u16) << 11 | (dt.minute() as u16) << 5 | (dt.second() / 2) as u16;
    (date, time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dos_time_round_trips() {
        let dt = unpack_dos_time(
            // 2023-11-05, 14:33:28 (even second, since DOS only has 2s resolution)
            (43 << 9) | (11 << 5) | 5,
            (14 << 11) | (33 << 5) | 14,
        )
        .unwrap();
        let (date, time) = pack_dos_time(dt);
        assert_eq!(date, (43 << 9) | (11 << 5) | 5);
        assert_eq!(time, (14 << 11) | (33 << 5) | 14);
    }

    #[test]
    fn zip64_extra_scan_honors_need_order() {
        let mut extra = Vec::new();
        extra.extend_from_slice(&0x0001u16.to_le_bytes());
        extra.extend_from_slice(&20u16.to_le_bytes()); // 8 + 8 + 4
        extra.extend_from_slice(&0x1_0000_0000u64.to_le_bytes());
        extra.extend_from_slice(&0x2_0000_0000u64.to_le_bytes());
        extra.extend_from_slice(&7u32.to_le_bytes());

        let need = Zip64Need {
            uncompressed_size: true,
            compressed_size: true,
            local_offset: false,
            local_disk: true,
        };
        let values = scan_zip64_extra(&extra, need).unwrap();
        assert_eq!(values.uncompressed_size, Some(0x1_0000_0000));
        assert_eq!(values.compressed_size, Some(0x2_0000_0000));
        assert_eq!(values.local_offset, None);
        assert_eq!(values.local_disk, Some(7));
    }

    #[test]
    fn zip64_extra_too_short_aborts_without_applying() {
        let mut extra = Vec::new();
        extra.extend_from_slice(&0x0001u16.to_le_bytes());
        extra.extend_from_slice(&4u16.to_le_bytes());
        extra.extend_from_slice(&1u32.to_le_bytes());

        let need = Zip64Need {
            uncompressed_size: true,
            ..Default::default()
        };
        assert!(scan_zip64_extra(&extra, need).is_none());
    }

    #[test]
    fn zip64_extra_skips_unrelated_tuples_first() {
        let mut extra = Vec::new();
        extra.extend_from_slice(&0x9999u16.to_le_bytes());
        extra.extend_from_slice(&4u16.to_le_bytes());
        extra.extend_from_slice(&[0xAA; 4]);
        extra.extend_from_slice(&0x0001u16.to_le_bytes());
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&0xABCDu64.to_le_bytes());

        let need = Zip64Need {
            uncompressed_size: true,
            ..Default::default()
        };
        let values = scan_zip64_extra(&extra, need).unwrap();
        assert_eq!(values.uncompressed_size, Some(0xABCD));
    }
}
