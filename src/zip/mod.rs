//! ZIP archive reading.
//!
//! ## Architecture
//!
//! - [`structures`]: pure byte-to-record decoders for the ZIP format's
//!   fixed-layout records, plus the ZIP64 extra-field scanner.
//! - [`locate`]: finds the end-of-central-directory record (and its ZIP64
//!   extension) by scanning backward from the end of the file.
//! - [`directory`]: walks the central directory one header at a time.
//! - [`local_header`]: correlates a central entry with its local file
//!   header to find where the entry's payload actually starts.
//! - [`archive`]: the public `ArchiveView`/`ZipEntity`/`EntryDescriptor`
//!   surface built on top of the above.
//!
//! ## Supported features
//!
//! - Standard ZIP format and ZIP64 extensions (files and archives over the
//!   32-bit size/offset/count limits)
//! - STORED and DEFLATE compression
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No compression method besides STORED and DEFLATE

pub mod archive;
pub mod directory;
pub mod local_header;
pub mod locate;
pub mod structures;

pub use archive::{ArchiveView, Entities, EntryDescriptor, ZipEntity};
pub use structures::CompressionMethod;
