//! The archive engine's public surface: open a local ZIP file, iterate its
//! entities, and stream an entry's decompressed content on demand.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use flate2::read::DeflateDecoder;

use crate::codec::{Codec, Cp437Codec};
use crate::error::{ZipError, ZipResult};
use crate::io::WindowedReader;
use crate::observer::{NoopObserver, ParseObserver};
use crate::zip::directory::{CentralEntry, DirectoryWalker};
use crate::zip::local_header;
use crate::zip::locate::{self, LocatedEnd};
use crate::zip::structures::{self, CompressionMethod};

/// A read-only view over a local ZIP (or ZIP64) archive.
///
/// Opening an archive only locates and parses the end-of-central-directory
/// record; the central directory itself is walked lazily through
/// [`ArchiveView::entities`], and an entry's payload is only touched when
/// [`EntryDescriptor::content`] is called on it.
pub struct ArchiveView {
    reader: WindowedReader,
    located: LocatedEnd,
    codec: Box<dyn Codec>,
    observer: Box<dyn ParseObserver>,
}

impl ArchiveView {
    /// Opens `path`, using CP437 for non-UTF-8 names/comments and discarding
    /// structural parse events.
    pub fn open(path: &Path) -> ZipResult<Self> {
        Self::open_with(path, Box::new(Cp437Codec), Box::new(NoopObserver))
    }

    /// Opens `path` with a caller-supplied codec and observer.
    pub fn open_with(
        path: &Path,
        codec: Box<dyn Codec>,
        observer: Box<dyn ParseObserver>,
    ) -> ZipResult<Self> {
        let mut reader = WindowedReader::open(path)?;
        let located = locate::locate(&mut reader, observer.as_ref())?;
        Ok(Self {
            reader,
            located,
            codec,
            observer,
        })
    }

    /// Number of entries the central directory declares.
    pub fn entry_count(&self) -> u64 {
        self.located.entry_count()
    }

    /// Returns a lazy iterator over this archive's entities: the
    /// archive-level comment first (if non-empty), then one entry per
    /// central directory record, in directory order.
    pub fn entities(&mut self) -> Entities<'_> {
        let comment = if self.located.comment.is_empty() {
            None
        } else {
            Some(crate::codec::decode(
                &self.located.comment,
                false,
                self.codec.as_ref(),
            ))
        };
        Entities {
            reader: &mut self.reader,
            codec: self.codec.as_ref(),
            observer: self.observer.as_ref(),
            walker: DirectoryWalker::new(
                self.located.directory_offset(),
                self.located.directory_size(),
                self.located.entry_count(),
            ),
            comment,
        }
    }
}

/// Lazily walks the central directory, yielding one [`ZipEntity`] per call
/// to `next`. The archive-level comment, if present, is yielded first.
pub struct Entities<'a> {
    reader: &'a mut WindowedReader,
    codec: &'a dyn Codec,
    observer: &'a dyn ParseObserver,
    walker: DirectoryWalker,
    comment: Option<String>,
}

impl<'a> Iterator for Entities<'a> {
    type Item = ZipResult<ZipEntity>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(text) = self.comment.take() {
            return Some(Ok(ZipEntity::Comment(text)));
        }

        let central = match self.walker.next(self.reader, self.codec, self.observer) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };

        match local_header::correlate(self.reader, &central, self.observer) {
            Ok(correlated) => Some(Ok(ZipEntity::Entry(EntryDescriptor::new(central, correlated)))),
            Err(e) => Some(Err(e)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.walker.remaining() as usize + self.comment.is_some() as usize;
        (remaining, Some(remaining))
    }
}

/// One logical item of the entity stream: either the archive-level comment
/// or a resolved directory entry.
#[derive(Debug, Clone)]
pub enum ZipEntity {
    Comment(String),
    Entry(EntryDescriptor),
}

/// A single archive member, fully resolved against any central- or
/// local-extra ZIP64 override. Metadata only; payload bytes are read lazily
/// through [`EntryDescriptor::content`].
#[derive(Debug, Clone)]
pub struct EntryDescriptor {
    entry: CentralEntry,
    compressed_size: u64,
    uncompressed_size: u64,
    payload_offset: u64,
    local_extra: Vec<u8>,
}

impl EntryDescriptor {
    fn new(entry: CentralEntry, correlated: local_header::Correlated) -> Self {
        Self {
            entry,
            compressed_size: correlated.compressed_size,
            uncompressed_size: correlated.uncompressed_size,
            payload_offset: correlated.payload_offset,
            local_extra: correlated.local_extra,
        }
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn comment(&self) -> &str {
        &self.entry.comment
    }

    pub fn compression_method(&self) -> CompressionMethod {
        self.entry.compression_method
    }

    pub fn crc32(&self) -> u32 {
        self.entry.crc32
    }

    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    pub fn is_directory(&self) -> bool {
        self.entry.is_directory()
    }

    pub fn is_encrypted(&self) -> bool {
        self.entry.is_encrypted
    }

    /// The raw central-extra field bytes, before any ZIP64 interpretation.
    pub fn central_extra(&self) -> &[u8] {
        &self.entry.central_extra
    }

    /// The raw local-extra field bytes, before any ZIP64 interpretation.
    pub fn local_extra(&self) -> &[u8] {
        &self.local_extra
    }

    /// The entry's last-modified timestamp, decoded from its DOS date/time
    /// fields.
    pub fn modified(&self) -> ZipResult<NaiveDateTime> {
        structures::unpack_dos_time(self.entry.mod_date, self.entry.mod_time)
    }

    /// Opens the entry's decompressed content as a `Read` stream.
    ///
    /// `Stored` entries are passed through directly; `Deflated` entries are
    /// wrapped in a raw (non-zlib, non-gzip) DEFLATE decoder. Any other
    /// compression method, or an entry with the encryption flag set,
    /// produces [`ZipError::UnsupportedEntry`] rather than garbage bytes.
    ///
    /// Takes `&mut ArchiveView` because the content stream is read through
    /// the archive's single windowed buffer: no two operations on the same
    /// `ArchiveView` can be in flight at once.
    pub fn content<'a>(&self, archive: &'a mut ArchiveView) -> ZipResult<Box<dyn Read + 'a>> {
        if self.entry.is_encrypted {
            return Err(ZipError::UnsupportedEntry {
                name: self.entry.name.clone(),
                reason: "entry is encrypted",
            });
        }

        let slice = archive
            .reader
            .open_slice(self.payload_offset, self.compressed_size)?;

        match self.entry.compression_method {
            CompressionMethod::Stored => Ok(Box::new(slice)),
            CompressionMethod::Deflated => Ok(Box::new(DeflateDecoder::new(slice))),
            other => Err(ZipError::UnsupportedEntry {
                name: self.entry.name.clone(),
                reason: unsupported_method_reason(other),
            }),
        }
    }
}

fn unsupported_method_reason(method: CompressionMethod) -> &'static str {
    match method {
        CompressionMethod::Shrunk => "shrink compression is not supported",
        CompressionMethod::Reduced1
        | CompressionMethod::Reduced2
        | CompressionMethod::Reduced3
        | CompressionMethod::Reduced4 => "reduce compression is not supported",
        CompressionMethod::Imploded => "implode compression is not supported",
        CompressionMethod::Tokenized => "tokenizing compression is not supported",
        CompressionMethod::Deflated64 => "deflate64 is not supported",
        CompressionMethod::IbmTerseOld | CompressionMethod::IbmTerseNew => {
            "IBM TERSE compression is not supported"
        }
        CompressionMethod::Bzip2 => "bzip2 compression is not supported",
        CompressionMethod::Lzma => "lzma compression is not supported",
        CompressionMethod::Lz77 => "lz77 compression is not supported",
        CompressionMethod::WavPack => "wavpack compression is not supported",
        CompressionMethod::Ppmd => "ppmd compression is not supported",
        CompressionMethod::Stored | CompressionMethod::Deflated => unreachable!(),
        CompressionMethod::Unknown(_) => "unrecognized compression method",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn central_header(
        name: &[u8],
        method: u16,
        compressed_size: u32,
        uncompressed_size: u32,
        local_offset: u32,
        flags: u16,
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&structures::CENTRAL_HEADER_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&20u16.to_le_bytes());
        buf.extend_from_slice(&20u16.to_le_bytes());
        buf.extend_from_slice(&flags.to_le_bytes());
        buf.extend_from_slice(&method.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&compressed_size.to_le_bytes());
        buf.extend_from_slice(&uncompressed_size.to_le_bytes());
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&local_offset.to_le_bytes());
        buf.extend_from_slice(name);
        buf
    }

    fn local_header_bytes(name: &[u8], method: u16, compressed_size: u32, uncompressed_size: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&structures::LOCAL_HEADER_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&20u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&method.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&compressed_size.to_le_bytes());
        buf.extend_from_slice(&uncompressed_size.to_le_bytes());
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(name);
        buf
    }

    fn minimal_eocd(directory_offset: u32, directory_size: u32, entry_count: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&structures::EOCD_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&entry_count.to_le_bytes());
        buf.extend_from_slice(&entry_count.to_le_bytes());
        buf.extend_from_slice(&directory_size.to_le_bytes());
        buf.extend_from_slice(&directory_offset.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf
    }

    fn build_archive(name: &[u8], content: &[u8], method: u16) -> Vec<u8> {
        let mut data = Vec::new();
        let local_offset = data.len() as u32;
        data.extend_from_slice(&local_header_bytes(name, method, content.len() as u32, content.len() as u32));
        data.extend_from_slice(content);

        let directory_offset = data.len() as u32;
        let central = central_header(name, method, content.len() as u32, content.len() as u32, local_offset, 0);
        let directory_size = central.len() as u32;
        data.extend_from_slice(&central);

        data.extend_from_slice(&minimal_eocd(directory_offset, directory_size, 1));
        data
    }

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    fn only_entry(entities: Vec<ZipEntity>) -> EntryDescriptor {
        match entities.into_iter().next().unwrap() {
            ZipEntity::Entry(d) => d,
            ZipEntity::Comment(_) => panic!("expected an entry, got a comment"),
        }
    }

    #[test]
    fn reads_a_stored_entry_end_to_end() {
        let data = build_archive(b"hello.txt", b"hello, world", 0);
        let f = write_temp(&data);
        let mut archive = ArchiveView::open(f.path()).unwrap();
        assert_eq!(archive.entry_count(), 1);

        let entities: Vec<_> = archive.entities().collect::<ZipResult<_>>().unwrap();
        assert_eq!(entities.len(), 1);
        let descriptor = only_entry(entities);
        assert_eq!(descriptor.name(), "hello.txt");
        assert_eq!(descriptor.uncompressed_size(), 12);

        let mut content = Vec::new();
        descriptor
            .content(&mut archive)
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"hello, world");
    }

    #[test]
    fn reads_a_deflated_entry_end_to_end() {
        use flate2::Compression;
        use flate2::write::DeflateEncoder;

        let plain = b"the quick brown fox jumps over the lazy dog, twice over";
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(plain).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut data = Vec::new();
        let local_offset = data.len() as u32;
        data.extend_from_slice(&local_header_bytes(b"fox.txt", 8, compressed.len() as u32, plain.len() as u32));
        data.extend_from_slice(&compressed);

        let directory_offset = data.len() as u32;
        let central = central_header(b"fox.txt", 8, compressed.len() as u32, plain.len() as u32, local_offset, 0);
        let directory_size = central.len() as u32;
        data.extend_from_slice(&central);
        data.extend_from_slice(&minimal_eocd(directory_offset, directory_size, 1));

        let f = write_temp(&data);
        let mut archive = ArchiveView::open(f.path()).unwrap();
        let entities: Vec<_> = archive.entities().collect::<ZipResult<_>>().unwrap();
        let descriptor = only_entry(entities);

        let mut out = Vec::new();
        descriptor.content(&mut archive).unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn unsupported_compression_method_errors_without_corrupting_iteration() {
        let data = build_archive(b"weird.dat", b"xx", 19); // LZ77
        let f = write_temp(&data);
        let mut archive = ArchiveView::open(f.path()).unwrap();
        let entities: Vec<_> = archive.entities().collect::<ZipResult<_>>().unwrap();
        let descriptor = only_entry(entities);
        assert!(matches!(
            descriptor.content(&mut archive),
            Err(ZipError::UnsupportedEntry { .. })
        ));
    }

    #[test]
    fn directory_entry_detected_by_trailing_slash() {
        let data = build_archive(b"a/dir/", b"", 0);
        let f = write_temp(&data);
        let mut archive = ArchiveView::open(f.path()).unwrap();
        let entities: Vec<_> = archive.entities().collect::<ZipResult<_>>().unwrap();
        let descriptor = only_entry(entities);
        assert!(descriptor.is_directory());
    }

    #[test]
    fn archive_comment_is_yielded_before_any_entry() {
        let mut data = build_archive(b"a.txt", b"x", 0);
        // minimal_eocd always writes a zero comment length; patch one on.
        let eocd_start = data.len() - structures::END_RECORD_LEN;
        data.truncate(eocd_start + 20);
        data.extend_from_slice(&5u16.to_le_bytes());
        data.extend_from_slice(b"hello");

        let f = write_temp(&data);
        let mut archive = ArchiveView::open(f.path()).unwrap();
        let entities: Vec<_> = archive.entities().collect::<ZipResult<_>>().unwrap();
        assert_eq!(entities.len(), 2);
        assert!(matches!(&entities[0], ZipEntity::Comment(text) if text == "hello"));
        assert!(matches!(&entities[1], ZipEntity::Entry(_)));
    }

    #[test]
    fn empty_archive_comment_is_not_emitted() {
        let data = build_archive(b"a.txt", b"x", 0);
        let f = write_temp(&data);
        let mut archive = ArchiveView::open(f.path()).unwrap();
        let entities: Vec<_> = archive.entities().collect::<ZipResult<_>>().unwrap();
        assert_eq!(entities.len(), 1);
        assert!(matches!(&entities[0], ZipEntity::Entry(_)));
    }
}
