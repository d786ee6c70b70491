//! Correlates a central directory entry with its local file header to find
//! where the entry's payload actually begins, and to apply any ZIP64
//! override that only shows up in the local extra field.
//!
//! The central directory's `local_offset` only points at the *local file
//! header*, not the payload: the header is followed by its own (possibly
//! differently-sized) copy of the name and extra field, and only after
//! those does the compressed data start. This is also where an otherwise
//! unencrypted-looking entry's 12-byte traditional encryption header, if
//! the central header's encryption flag is set, gets skipped.

use crate::error::{ZipError, ZipResult};
use crate::io::WindowedReader;
use crate::observer::{ParseEvent, ParseObserver};
use crate::zip::directory::{resolve_zip64, CentralEntry};
use crate::zip::structures::{
    ENCRYPTION_HEADER_LEN, LOCAL_HEADER_LEN, LOCAL_HEADER_SIGNATURE, LocalFileHeader,
};

/// The entry fields resolved only once its local header has been read: the
/// final (possibly local-extra-overridden) sizes, the absolute payload
/// offset, and the raw local extra bytes.
pub struct Correlated {
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub payload_offset: u64,
    pub local_extra: Vec<u8>,
}

/// Reads `entry`'s local file header, re-applies the ZIP64 extra-field scan
/// against the local extra blob (using the same sentinel fields the central
/// header originally declared), and computes the absolute payload offset.
pub fn correlate(
    reader: &mut WindowedReader,
    entry: &CentralEntry,
    observer: &dyn ParseObserver,
) -> ZipResult<Correlated> {
    let header_bytes = reader.read_owned(entry.local_offset, LOCAL_HEADER_LEN as u64)?;
    let signature = u32::from_le_bytes([
        header_bytes[0],
        header_bytes[1],
        header_bytes[2],
        header_bytes[3],
    ]);
    if signature != LOCAL_HEADER_SIGNATURE {
        return Err(ZipError::malformed(
            entry.local_offset,
            "expected local file header signature",
        ));
    }
    let local = LocalFileHeader::parse(&header_bytes)?;

    let extra_offset = entry.local_offset + LOCAL_HEADER_LEN as u64 + local.name_len as u64;
    let local_extra = reader.read_owned(extra_offset, local.extra_len as u64)?;

    let values = resolve_zip64(entry.zip64_need, &local_extra);
    let uncompressed_size = values.uncompressed_size.unwrap_or(entry.uncompressed_size);
    let compressed_size = values.compressed_size.unwrap_or(entry.compressed_size);

    let mut payload_offset = extra_offset + local.extra_len as u64;
    if entry.is_encrypted {
        payload_offset += ENCRYPTION_HEADER_LEN;
    }

    if payload_offset + compressed_size > reader.len() {
        return Err(ZipError::malformed(
            payload_offset,
            "entry payload extends past the end of the file",
        ));
    }

    observer.on_event(ParseEvent::LocalHeaderCorrelated {
        name: &entry.name,
        payload_offset,
    });

    Ok(Correlated {
        compressed_size,
        uncompressed_size,
        payload_offset,
        local_extra,
    })
}
