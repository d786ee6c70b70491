//! Walks the central directory one entry at a time, applying any ZIP64
//! overrides and decoding each entry's name and comment.
//!
//! The central directory can be arbitrarily large, so this never loads it
//! whole: each call to [`DirectoryWalker::next`] reads exactly one fixed
//! header plus its trailing name/extra/comment blob through the shared
//! windowed reader, then advances to the next header's offset.

use crate::codec::{self, Codec};
use crate::error::{ZipError, ZipResult};
use crate::io::WindowedReader;
use crate::observer::{ParseEvent, ParseObserver};
use crate::zip::structures::{
    CentralFileHeader, CENTRAL_HEADER_SIGNATURE, CompressionMethod, FILE_HEADER_LEN, MAGIC_U16,
    MAGIC_U32, scan_zip64_extra, Zip64Need, Zip64Values,
};

/// A central directory entry with any central-extra ZIP64 override already
/// applied, name and comment decoded to text. `zip64_need` records which
/// fields were sentinel in the *raw* header, so the local-header correlator
/// can re-run the same extra-field scan against the local extra blob.
#[derive(Debug, Clone)]
pub struct CentralEntry {
    pub index: u64,
    pub name: String,
    pub comment: String,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_offset: u64,
    pub local_disk: u32,
    pub external_attr: u32,
    pub is_encrypted: bool,
    pub central_extra: Vec<u8>,
    pub zip64_need: Zip64Need,
}

impl CentralEntry {
    /// A directory entry's name conventionally ends in `/`; external
    /// attributes can also mark it via the MS-DOS directory bit, but the
    /// trailing slash is the portable signal used here.
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Iterates the central directory, one entry per call to `next`.
pub struct DirectoryWalker {
    next_offset: u64,
    directory_end: u64,
    remaining: u64,
    index: u64,
}

impl DirectoryWalker {
    pub fn new(start_offset: u64, directory_size: u64, entry_count: u64) -> Self {
        Self {
            next_offset: start_offset,
            directory_end: start_offset + directory_size,
            remaining: entry_count,
            index: 0,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Reads and decodes the next central directory entry, or `None` once
    /// `entry_count` entries have been consumed.
    pub fn next(
        &mut self,
        reader: &mut WindowedReader,
        codec: &dyn Codec,
        observer: &dyn ParseObserver,
    ) -> ZipResult<Option<CentralEntry>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let header_offset = self.next_offset;
        let header_bytes = reader.read_owned(header_offset, FILE_HEADER_LEN as u64)?;
        let signature = u32::from_le_bytes([
            header_bytes[0],
            header_bytes[1],
            header_bytes[2],
            header_bytes[3],
        ]);
        if signature != CENTRAL_HEADER_SIGNATURE {
            return Err(ZipError::malformed(
                header_offset,
                "expected central directory file header signature",
            ));
        }
        let header = CentralFileHeader::parse(&header_bytes)?;

        let name_offset = header_offset + FILE_HEADER_LEN as u64;
        let extra_offset = name_offset + header.name_len as u64;
        let comment_offset = extra_offset + header.extra_len as u64;
        let entry_end = comment_offset + header.comment_len as u64;

        if entry_end > self.directory_end {
            return Err(ZipError::malformed(
                header_offset,
                "central directory entry overruns the directory extent",
            ));
        }

        let name_bytes = reader.read_owned(name_offset, header.name_len as u64)?;
        let extra_bytes = reader.read_owned(extra_offset, header.extra_len as u64)?;
        let comment_bytes = reader.read_owned(comment_offset, header.comment_len as u64)?;

        let need = zip64_need(&header);
        let values = resolve_zip64(need, &extra_bytes);

        let name = codec::decode(&name_bytes, header.is_utf8_name(), codec);
        let comment = codec::decode(&comment_bytes, header.is_utf8_name(), codec);

        observer.on_event(ParseEvent::CentralHeaderParsed {
            index: self.index,
            name: &name,
        });

        let entry = CentralEntry {
            index: self.index,
            name,
            comment,
            flags: header.flags,
            compression_method: CompressionMethod::from_u16(header.compression_method),
            mod_time: header.mod_time,
            mod_date: header.mod_date,
            crc32: header.crc32,
            compressed_size: values
                .compressed_size
                .unwrap_or(header.compressed_size as u64),
            uncompressed_size: values
                .uncompressed_size
                .unwrap_or(header.uncompressed_size as u64),
            local_offset: values.local_offset.unwrap_or(header.local_offset as u64),
            local_disk: values.local_disk.unwrap_or(header.local_disk as u32),
            external_attr: header.external_attr,
            is_encrypted: header.is_encrypted(),
            central_extra: extra_bytes,
            zip64_need: need,
        };

        if entry.local_disk != 0 {
            return Err(ZipError::unsupported_archive(
                "multi-disk archives are not supported",
            ));
        }

        self.next_offset = entry_end;
        self.remaining -= 1;
        self.index += 1;

        Ok(Some(entry))
    }
}

/// Determines which of a raw central header's fields are sentinel.
pub(crate) fn zip64_need(header: &CentralFileHeader) -> Zip64Need {
    Zip64Need {
        uncompressed_size: header.uncompressed_size == MAGIC_U32,
        compressed_size: header.compressed_size == MAGIC_U32,
        local_offset: header.local_offset == MAGIC_U32,
        local_disk: header.local_disk == MAGIC_U16,
    }
}

/// Scans `extra` for a ZIP64 override of the fields named by `need`.
pub(crate) fn resolve_zip64(need: Zip64Need, extra: &[u8]) -> Zip64Values {
    if need.required_bytes() == 0 {
        return Zip64Values::default();
    }
    scan_zip64_extra(extra, need).unwrap_or_default()
}
