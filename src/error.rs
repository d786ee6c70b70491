//! Error types for the archive engine.
//!
//! Errors are taxonomic rather than stringly-typed: callers that need to
//! tell "this isn't a zip" from "this zip is broken" from "this entry can't
//! be opened" can match on the variant instead of parsing a message.

use thiserror::Error;

pub type ZipResult<T> = Result<T, ZipError>;

/// Errors produced while locating, parsing, or reading a ZIP archive.
#[derive(Debug, Error)]
pub enum ZipError {
    /// No End-of-Central-Directory signature was found anywhere in the
    /// trailing search window. The file is not a ZIP archive at all.
    #[error("not a zip archive: no end-of-central-directory record found")]
    NotAnArchive,

    /// A signature mismatched at an expected offset, a record's declared
    /// payload overran its container, or a sentinel field had no ZIP64
    /// override when ZIP64 was absent.
    #[error("malformed archive at offset {offset}: {reason}")]
    MalformedArchive { offset: u64, reason: &'static str },

    /// The archive uses a feature this engine deliberately does not
    /// support (multi-disk spanning, an unvalidated ZIP64 locator, etc.).
    #[error("unsupported archive: {reason}")]
    UnsupportedArchive { reason: String },

    /// An individual entry can't be opened for content, even though its
    /// metadata parsed fine (encrypted, or an unsupported compression
    /// method). Iteration may continue past this error.
    #[error("unsupported entry {name:?}: {reason}")]
    UnsupportedEntry { name: String, reason: &'static str },

    /// A read or seek against the underlying file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A caller passed an out-of-range argument to the windowed reader.
    /// This is a programming bug, not a property of the input data.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: &'static str },
}

impl ZipError {
    pub(crate) fn malformed(offset: u64, reason: &'static str) -> Self {
        ZipError::MalformedArchive { offset, reason }
    }

    pub(crate) fn unsupported_archive(reason: impl Into<String>) -> Self {
        ZipError::UnsupportedArchive {
            reason: reason.into(),
        }
    }
}
