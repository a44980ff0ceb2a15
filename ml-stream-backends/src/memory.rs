//! In-memory backends: a growable sink and a fixed read-only view

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use memmap2::{Mmap, MmapOptions};
use ml_stream_core::{Error, Reader, Result, Writer};
use tracing::debug;

/// Growable byte buffer shared between a vector writer and its caller
pub type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// Appends every write to a shared buffer; never fails
pub(crate) struct VectorWriter {
    buffer: SharedBuffer,
}

impl VectorWriter {
    pub(crate) fn new(buffer: SharedBuffer) -> Self {
        Self { buffer }
    }
}

impl Writer for VectorWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Appends are all-or-nothing, so a poisoned buffer is still consistent
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.reserve(buf.len());
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// Read-only cursor over a fixed byte range; always resettable
///
/// `read_head` stays within `0..=data.len()`.
pub(crate) struct BufferView<B> {
    data: B,
    read_head: usize,
}

impl<B: AsRef<[u8]>> BufferView<B> {
    pub(crate) fn new(data: B) -> Self {
        Self { data, read_head: 0 }
    }

    #[cfg(test)]
    fn read_head(&self) -> usize {
        self.read_head
    }
}

impl<B: AsRef<[u8]> + Send> Reader for BufferView<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.data.as_ref()[self.read_head..];
        let n = remaining.len().min(buf.len());
        if n == 0 {
            return Ok(0);
        }

        buf[..n].copy_from_slice(&remaining[..n]);
        self.read_head += n;
        Ok(n)
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> io::Result<()> {
        self.read_head = 0;
        Ok(())
    }
}

/// Map `path` read-only for a [`BufferView`]
///
/// An empty file maps to an empty view.
pub(crate) fn map_file(path: &Path) -> Result<BufferView<MappedBytes>> {
    let file = File::open(path).map_err(|e| Error::open(path, e))?;
    let len = file.metadata().map_err(|e| Error::open(path, e))?.len();
    if len == 0 {
        return Ok(BufferView::new(MappedBytes::Empty));
    }

    #[allow(unsafe_code)]
    // SAFETY: the map is read-only; callers must not truncate the file while
    // the reader is alive.
    let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| Error::open(path, e))?;
    debug!(path = %path.display(), bytes = len, "memory-mapped file for reading");

    Ok(BufferView::new(MappedBytes::Mapped(mmap)))
}

/// Bytes backing a memory-mapped view
pub(crate) enum MappedBytes {
    Empty,
    Mapped(Mmap),
}

impl AsRef<[u8]> for MappedBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Empty => &[],
            Self::Mapped(mmap) => &mmap[..],
        }
    }
}
