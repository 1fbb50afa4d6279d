//! Random-access byte sources
//!
//! The scanner never owns the bytes it searches. It borrows a `ByteSource`
//! for the duration of a scan and only moves its read cursor. Adapters
//! cover image files and block devices, in-memory buffers, memory maps and
//! a buffered wrapper that serves small reads from a sliding window.

use crate::error::{CarveError, Result};
use memmap2::Mmap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

pub const DEFAULT_WINDOW_SIZE: usize = 1024 * 1024;

/// Read-only, random-access input with a length known up front.
pub trait ByteSource {
    /// Total length of the source in bytes.
    fn size(&self) -> u64;

    /// Moves the read cursor to `offset`.
    fn seek_to(&mut self, offset: u64) -> Result<()>;

    /// Fills `buf` completely from the cursor position.
    ///
    /// A read that runs out of bytes fails with [`CarveError::ShortRead`];
    /// partial data is never handed back as if it were complete.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.seek_to(offset)?;
        self.read_exact(buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        (**self).seek_to(offset)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact(buf)
    }
}

fn fill_from<R: Read>(reader: &mut R, buf: &mut [u8], offset: u64) -> Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(CarveError::ShortRead {
                    offset,
                    expected: buf.len(),
                    actual: filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(filled)
}

/// Disk image or block device opened read-only.
pub struct DiskReader {
    file: File,
    size: u64,
    position: u64,
}

impl DiskReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new().read(true).open(path)?;

        let mut size = file.metadata()?.len();

        // Block devices report a zero metadata length
        if size == 0 {
            size = file.seek(SeekFrom::End(0))?;
            file.seek(SeekFrom::Start(0))?;
        }

        tracing::debug!("Opened {} ({} bytes)", path.display(), size);

        Ok(Self {
            file,
            size,
            position: 0,
        })
    }
}

impl ByteSource for DiskReader {
    #[inline]
    fn size(&self) -> u64 {
        self.size
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.position = self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let n = fill_from(&mut self.file, buf, self.position)?;
        self.position += n as u64;
        Ok(())
    }
}

/// Byte source over anything that can be viewed as a byte slice.
#[derive(Debug, Clone)]
pub struct MemorySource<T> {
    data: T,
    position: u64,
}

impl<T: AsRef<[u8]>> MemorySource<T> {
    pub fn new(data: T) -> Self {
        Self { data, position: 0 }
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: AsRef<[u8]>> ByteSource for MemorySource<T> {
    #[inline]
    fn size(&self) -> u64 {
        self.data.as_ref().len() as u64
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.position = offset;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let data = self.data.as_ref();
        let start = usize::try_from(self.position)
            .unwrap_or(usize::MAX)
            .min(data.len());
        let available = data.len() - start;

        if available < buf.len() {
            return Err(CarveError::ShortRead {
                offset: self.position,
                expected: buf.len(),
                actual: available,
            });
        }

        buf.copy_from_slice(&data[start..start + buf.len()]);
        self.position += buf.len() as u64;
        Ok(())
    }
}

/// Read-only memory map of a disk image.
pub type MmapSource = MemorySource<Mmap>;

impl MemorySource<Mmap> {
    pub fn map(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        if file.metadata()?.len() == 0 {
            return Err(CarveError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot memory-map empty file {}", path.display()),
            )));
        }

        // SAFETY: read-only mapping; the input is never written while mapped
        let mmap = unsafe { Mmap::map(&file) }?;

        tracing::debug!("Mapped {} ({} bytes)", path.display(), mmap.len());

        Ok(Self::new(mmap))
    }
}

/// Serves reads from a window of the inner source, refilling it only when
/// a request falls outside the cached range.
///
/// The marker scanner issues one tiny read per offset; this wrapper turns
/// those into one large read per window without changing which offsets are
/// examined. A window that cannot be filled is remembered, and requests
/// inside it go straight to the inner source, so a bad sector only fails
/// the reads that actually touch it.
pub struct BufferedSource<S> {
    inner: S,
    window: Vec<u8>,
    window_start: u64,
    capacity: usize,
    position: u64,
    failed_window: Option<Range<u64>>,
}

impl<S: ByteSource> BufferedSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_capacity(DEFAULT_WINDOW_SIZE, inner)
    }

    pub fn with_capacity(capacity: usize, inner: S) -> Self {
        Self {
            inner,
            window: Vec::with_capacity(capacity),
            window_start: 0,
            capacity: capacity.max(1),
            position: 0,
            failed_window: None,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn window_covers(&self, offset: u64, len: usize) -> bool {
        let window_end = self.window_start + self.window.len() as u64;
        offset >= self.window_start && offset + len as u64 <= window_end
    }

    fn in_failed_window(&self, offset: u64) -> bool {
        self.failed_window
            .as_ref()
            .is_some_and(|range| range.contains(&offset))
    }

    fn read_direct(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact_at(offset, buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn refill(&mut self, offset: u64) -> Result<()> {
        let remaining = self.inner.size().saturating_sub(offset);
        let len = remaining.min(self.capacity as u64) as usize;

        self.window.clear();
        self.window.resize(len, 0);
        self.window_start = offset;

        if let Err(e) = self.inner.read_exact_at(offset, &mut self.window) {
            tracing::debug!("Read window at {} ({} bytes) failed: {}", offset, len, e);
            self.window.clear();
            self.failed_window = Some(offset..offset + len as u64);
            return Err(e);
        }

        tracing::trace!("Refilled read window at {} ({} bytes)", offset, len);
        Ok(())
    }
}

impl<S: ByteSource> ByteSource for BufferedSource<S> {
    #[inline]
    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.position = offset;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let offset = self.position;

        if buf.len() > self.capacity {
            return self.read_direct(offset, buf);
        }

        if !self.window_covers(offset, buf.len())
            && (self.in_failed_window(offset) || self.refill(offset).is_err())
        {
            return self.read_direct(offset, buf);
        }

        if !self.window_covers(offset, buf.len()) {
            return Err(CarveError::ShortRead {
                offset,
                expected: buf.len(),
                actual: self.window.len(),
            });
        }

        let start = (offset - self.window_start) as usize;
        buf.copy_from_slice(&self.window[start..start + buf.len()]);
        self.position += buf.len() as u64;
        Ok(())
    }
}
