//! Random-access reading over a local archive file, through a single
//! bounded-size buffer.
//!
//! The central directory of a ZIP archive can be arbitrarily large, but a
//! parser walking it only ever needs a handful of sequential windows into it
//! plus the occasional pointer-chase read out to a local file header. A
//! single reusable buffer amortizes I/O without paying for a whole-file
//! memory map, and keeps the reader's resource footprint bounded regardless
//! of archive size.

use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::{ZipError, ZipResult};

/// Size of the single buffered window, in bytes.
pub const BLOCK: usize = 65536;

/// A random-access byte reader over a local file, backed by one `BLOCK`-sized
/// buffer.
///
/// `read` ensures a requested byte range is resident in the buffer,
/// re-issuing a positioned read from the file only when the request isn't
/// already covered by the current window. Typed little-endian accessors are
/// layered on top, all addressed by absolute file offset.
pub struct WindowedReader {
    file: File,
    length: u64,
    buf: Vec<u8>,
    /// Absolute file offset the buffer's first byte corresponds to.
    window_start: u64,
    /// Number of valid bytes in `buf`, starting at `window_start`.
    window_len: usize,
}

impl WindowedReader {
    /// Opens `path` for random-access reading and caches its length.
    pub fn open(path: &Path) -> ZipResult<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            file,
            length,
            buf: vec![0u8; BLOCK],
            window_start: 0,
            window_len: 0,
        })
    }

    /// Total length of the underlying file, in bytes.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Ensures `[offset, offset + size)` is resident in the buffer and
    /// returns it as a slice.
    ///
    /// `size` must be in `[1, BLOCK]` and `offset` must be within the file.
    /// No request larger than `BLOCK` is ever honored in one call; callers
    /// that need more must loop (the central-directory walker does this one
    /// chunk at a time).
    pub fn read(&mut self, offset: u64, size: usize) -> ZipResult<&[u8]> {
        if size == 0 || size > BLOCK {
            return Err(ZipError::InvalidArgument {
                reason: "read size must be in [1, BLOCK]",
            });
        }
        if offset >= self.length {
            return Err(ZipError::InvalidArgument {
                reason: "read offset out of range",
            });
        }
        let end = offset
            .checked_add(size as u64)
            .ok_or(ZipError::InvalidArgument {
                reason: "read range overflows u64",
            })?;
        if end > self.length {
            return Err(ZipError::InvalidArgument {
                reason: "read range extends past end of file",
            });
        }

        let covered = offset >= self.window_start
            && end <= self.window_start + self.window_len as u64
            && self.window_len > 0;

        if !covered {
            self.refill(offset, size)?;
        }

        let start = (offset - self.window_start) as usize;
        Ok(&self.buf[start..start + size])
    }

    fn refill(&mut self, offset: u64, size: usize) -> ZipResult<()> {
        positioned_read_exact(&self.file, offset, &mut self.buf[..size])?;
        self.window_start = offset;
        self.window_len = size;
        Ok(())
    }

    pub fn u8(&mut self, offset: u64) -> ZipResult<u8> {
        Ok(self.read(offset, 1)?[0])
    }

    pub fn u16(&mut self, offset: u64) -> ZipResult<u16> {
        let b = self.read(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self, offset: u64) -> ZipResult<u32> {
        let b = self.read(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self, offset: u64) -> ZipResult<u64> {
        let b = self.read(offset, 8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Reads `size` bytes starting at `offset` into an owned buffer,
    /// looping over `BLOCK`-sized windows as needed. Unlike `read`, this has
    /// no upper bound on `size` other than the file's length, since the
    /// walker needs to pull whole name/extra/comment blobs that can exceed
    /// `BLOCK` in pathological archives.
    pub fn read_owned(&mut self, offset: u64, size: u64) -> ZipResult<Vec<u8>> {
        let mut out = Vec::with_capacity(size as usize);
        let mut pos = offset;
        let mut remaining = size;
        while remaining > 0 {
            let chunk = remaining.min(BLOCK as u64) as usize;
            out.extend_from_slice(self.read(pos, chunk)?);
            pos += chunk as u64;
            remaining -= chunk as u64;
        }
        Ok(out)
    }

    /// Opens a sequential, positioned-read view of `[offset, offset + len)`,
    /// independent of this reader's own window. Used to stream an entry's
    /// payload without disturbing the buffer the directory walker is using.
    pub fn open_slice(&self, offset: u64, len: u64) -> ZipResult<SliceReader> {
        let end = offset.checked_add(len).ok_or(ZipError::InvalidArgument {
            reason: "slice range overflows u64",
        })?;
        if end > self.length {
            return Err(ZipError::InvalidArgument {
                reason: "slice range extends past end of file",
            });
        }
        Ok(SliceReader {
            file: self.file.try_clone()?,
            pos: offset,
            remaining: len,
        })
    }
}

/// A `Read` over a fixed byte range of a file, addressed by `pread` so it
/// never disturbs (or is disturbed by) any other handle's seek position.
pub struct SliceReader {
    file: File,
    pos: u64,
    remaining: u64,
}

impl io::Read for SliceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let want = (buf.len() as u64).min(self.remaining) as usize;
        let count = positioned_read(&self.file, self.pos, &mut buf[..want])?;
        self.pos += count as u64;
        self.remaining -= count as u64;
        Ok(count)
    }
}

fn positioned_read(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_at(buf, offset)
    }

    #[cfg(not(unix))]
    {
        use std::io::{Read, Seek, SeekFrom};
        let mut file = file;
        file.seek(SeekFrom::Start(offset))?;
        file.read(buf)
    }
}

/// Fills `buf` completely from `offset`, using `pread` on Unix (so the
/// read doesn't disturb any other position state on the handle) and
/// seek+read elsewhere.
fn positioned_read_exact(file: &File, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_exact_at(buf, offset)
    }

    #[cfg(not(unix))]
    {
        use std::io::{Read, Seek, SeekFrom};
        let mut file = file;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn reads_within_and_across_refills() {
        let data: Vec<u8> = (0u32..(BLOCK as u32 * 2 + 100))
            .map(|i| (i % 256) as u8)
            .collect();
        let f = write_temp(&data);
        let mut r = WindowedReader::open(f.path()).unwrap();
        assert_eq!(r.len(), data.len() as u64);

        assert_eq!(r.u8(0).unwrap(), data[0]);
        assert_eq!(r.u8(BLOCK as u64).unwrap(), data[BLOCK]);
        assert_eq!(
            r.read(BLOCK as u64 - 2, 4).unwrap(),
            &data[BLOCK - 2..BLOCK + 2]
        );

        let tail_offset = (data.len() - 4) as u64;
        assert_eq!(r.u32(tail_offset).unwrap(), {
            let b = &data[data.len() - 4..];
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        });
    }

    #[test]
    fn rejects_out_of_range_requests() {
        let f = write_temp(&[1, 2, 3, 4]);
        let mut r = WindowedReader::open(f.path()).unwrap();
        assert!(matches!(
            r.read(0, 0),
            Err(ZipError::InvalidArgument { .. })
        ));
        assert!(matches!(
            r.read(0, BLOCK + 1),
            Err(ZipError::InvalidArgument { .. })
        ));
        assert!(matches!(
            r.read(10, 1),
            Err(ZipError::InvalidArgument { .. })
        ));
        assert!(matches!(
            r.read(2, 4),
            Err(ZipError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn read_owned_spans_multiple_windows() {
        let data: Vec<u8> = (0u32..(BLOCK as u32 + 16)).map(|i| (i % 256) as u8).collect();
        let f = write_temp(&data);
        let mut r = WindowedReader::open(f.path()).unwrap();
        let owned = r.read_owned(10, data.len() as u64 - 10).unwrap();
        assert_eq!(owned, &data[10..]);
    }

    #[test]
    fn slice_reader_reads_exactly_its_range() {
        use std::io::Read;
        let data: Vec<u8> = (0u32..200).map(|i| (i % 256) as u8).collect();
        let f = write_temp(&data);
        let r = WindowedReader::open(f.path()).unwrap();
        let mut slice = r.open_slice(50, 30).unwrap();
        let mut out = Vec::new();
        slice.read_to_end(&mut out).unwrap();
        assert_eq!(out, &data[50..80]);
    }

    #[test]
    fn slice_reader_rejects_out_of_range() {
        let f = write_temp(&[1, 2, 3, 4]);
        let r = WindowedReader::open(f.path()).unwrap();
        assert!(r.open_slice(2, 10).is_err());
    }
}
