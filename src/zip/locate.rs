//! Locates the end-of-central-directory record (and, if present, its ZIP64
//! extension) by scanning backward from the end of the file.
//!
//! A ZIP file's only unambiguous anchor is the EOCD record, and even that is
//! only unambiguous if its variable-length comment doesn't itself happen to
//! contain the signature bytes. The search scans the trailing
//! `comment_len_max + END_RECORD_LEN` bytes of the file once and picks the
//! match closest to EOF whose declared comment length is consistent with
//! the file's actual length — that's the one a real archiver would have
//! written.

use crate::error::{ZipError, ZipResult};
use crate::io::WindowedReader;
use crate::observer::{ParseEvent, ParseObserver};
use crate::zip::structures::{
    END_RECORD_LEN, EndRecord, EOCD_SIGNATURE, MAGIC_U16, MAGIC_U32, MAX_COMMENT_LEN,
    Zip64EndRecord, ZIP64_EOCD_SIGNATURE, Zip64Locator, ZIP64_LOCATOR_LEN,
    ZIP64_LOCATOR_SIGNATURE, ZIP64_END_RECORD_LEN,
};

/// Result of locating the end of an archive's central directory.
pub struct LocatedEnd {
    /// Absolute offset of the (possibly ZIP64-overridden) end record.
    pub end_offset: u64,
    pub end: EndRecord,
    pub comment: Vec<u8>,
    pub zip64: Option<Zip64EndRecord>,
}

impl LocatedEnd {
    pub fn directory_offset(&self) -> u64 {
        self.zip64
            .map(|z| z.directory_offset)
            .unwrap_or(self.end.directory_offset as u64)
    }

    pub fn directory_size(&self) -> u64 {
        self.zip64
            .map(|z| z.directory_size)
            .unwrap_or(self.end.directory_size as u64)
    }

    pub fn entry_count(&self) -> u64 {
        self.zip64
            .map(|z| z.entry_count)
            .unwrap_or(self.end.entry_count as u64)
    }
}

/// Verifies the reconciled central directory doesn't overrun the
/// end-of-central-directory pointer record that named it (the legacy
/// record's offset, or the ZIP64 end record's own offset when ZIP64 is
/// present).
fn check_directory_bounds(directory_offset: u64, directory_size: u64, tail_offset: u64) -> ZipResult<()> {
    let directory_end = directory_offset
        .checked_add(directory_size)
        .ok_or_else(|| ZipError::malformed(tail_offset, "central directory offset+size overflows"))?;
    if directory_end > tail_offset {
        return Err(ZipError::malformed(
            tail_offset,
            "central directory overruns the end-of-central-directory record",
        ));
    }
    Ok(())
}

fn needs_zip64(end: &EndRecord) -> bool {
    end.entry_count == MAGIC_U16
        || end.disk_entry_count == MAGIC_U16
        || end.directory_size == MAGIC_U32
        || end.directory_offset == MAGIC_U32
}

/// Locates the end-of-central-directory record, resolving its ZIP64
/// extension if the legacy record's fields are sentinel.
pub fn locate(reader: &mut WindowedReader, observer: &dyn ParseObserver) -> ZipResult<LocatedEnd> {
    let file_len = reader.len();
    if file_len < END_RECORD_LEN as u64 {
        return Err(ZipError::NotAnArchive);
    }

    let tail_len = file_len.min((MAX_COMMENT_LEN + END_RECORD_LEN) as u64);
    let tail_start = file_len - tail_len;
    let tail = reader.read_owned(tail_start, tail_len)?;

    let signature_bytes = EOCD_SIGNATURE.to_le_bytes();
    let mut found = None;
    // Scan right-to-left: the candidate closest to EOF wins.
    let mut i = tail.len().saturating_sub(END_RECORD_LEN);
    loop {
        if tail[i..i + 4] == signature_bytes {
            let comment_len = u16::from_le_bytes([tail[i + 20], tail[i + 21]]) as u64;
            if i as u64 + END_RECORD_LEN as u64 + comment_len == tail.len() as u64 {
                found = Some(i);
                break;
            }
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let record_start = found.ok_or(ZipError::NotAnArchive)?;
    let end_offset = tail_start + record_start as u64;
    let end = EndRecord::parse(&tail[record_start..record_start + END_RECORD_LEN])?;
    let comment = tail[record_start + END_RECORD_LEN..].to_vec();

    observer.on_event(ParseEvent::EndRecordFound { offset: end_offset });

    if !needs_zip64(&end) {
        if end.disk != 0 || end.directory_disk != 0 {
            return Err(ZipError::unsupported_archive(
                "multi-disk archives are not supported",
            ));
        }
        check_directory_bounds(end.directory_offset as u64, end.directory_size as u64, end_offset)?;
        return Ok(LocatedEnd {
            end_offset,
            end,
            comment,
            zip64: None,
        });
    }

    let locator_offset = end_offset
        .checked_sub(ZIP64_LOCATOR_LEN as u64)
        .ok_or(ZipError::malformed(
            end_offset,
            "zip64 sentinel fields present but no room for a locator before the end record",
        ))?;
    let locator_bytes = reader.read_owned(locator_offset, ZIP64_LOCATOR_LEN as u64)?;
    if u32::from_le_bytes([
        locator_bytes[0],
        locator_bytes[1],
        locator_bytes[2],
        locator_bytes[3],
    ]) != ZIP64_LOCATOR_SIGNATURE
    {
        return Err(ZipError::malformed(
            locator_offset,
            "expected zip64 end-of-central-directory locator signature",
        ));
    }
    let locator = Zip64Locator::parse(&locator_bytes)?;
    if locator.disk_count > 1 || locator.zip64_disk != 0 {
        return Err(ZipError::unsupported_archive(
            "multi-disk archives are not supported",
        ));
    }

    let zip64_end_bytes = reader.read_owned(locator.zip64_offset, ZIP64_END_RECORD_LEN as u64)?;
    if u32::from_le_bytes([
        zip64_end_bytes[0],
        zip64_end_bytes[1],
        zip64_end_bytes[2],
        zip64_end_bytes[3],
    ]) != ZIP64_EOCD_SIGNATURE
    {
        return Err(ZipError::malformed(
            locator.zip64_offset,
            "expected zip64 end-of-central-directory record signature",
        ));
    }
    let zip64_end = Zip64EndRecord::parse(&zip64_end_bytes)?;
    if zip64_end.disk != 0 || zip64_end.directory_disk != 0 {
        return Err(ZipError::unsupported_archive(
            "multi-disk archives are not supported",
        ));
    }
    check_directory_bounds(
        zip64_end.directory_offset,
        zip64_end.directory_size,
        locator.zip64_offset,
    )?;

    observer.on_event(ParseEvent::Zip64Resolved {
        end_record_offset: locator.zip64_offset,
    });

    Ok(LocatedEnd {
        end_offset,
        end,
        comment,
        zip64: Some(zip64_end),
    })
}
