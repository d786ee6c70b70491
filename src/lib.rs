//! # zipview
//!
//! A read-only PKWARE ZIP/ZIP64 archive engine.
//!
//! Opening an archive locates and parses its end-of-central-directory
//! record (following the ZIP64 locator when the legacy record's fields are
//! sentinel); entries are then walked lazily out of the central directory,
//! and an entry's payload is only read and decompressed once a caller asks
//! for it.
//!
//! ```no_run
//! use std::path::Path;
//! use zipview::{ArchiveView, ZipEntity};
//!
//! # fn main() -> zipview::ZipResult<()> {
//! let mut archive = ArchiveView::open(Path::new("archive.zip"))?;
//! for entity in archive.entities() {
//!     match entity? {
//!         ZipEntity::Comment(text) => println!("archive comment: {text}"),
//!         ZipEntity::Entry(descriptor) => {
//!             println!("{} ({} bytes)", descriptor.name(), descriptor.uncompressed_size());
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod codec;
pub mod crc;
pub mod error;
pub mod io;
pub mod observer;
pub mod zip;

pub use cli::Cli;
pub use codec::{Codec, Cp437Codec};
pub use crc::Crc32Reader;
pub use error::{ZipError, ZipResult};
pub use observer::{LoggingObserver, NoopObserver, ParseEvent, ParseObserver};
pub use zip::{ArchiveView, CompressionMethod, Entities, EntryDescriptor, ZipEntity};
