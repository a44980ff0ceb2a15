//! Reader and Writer capability contracts
//!
//! Every backend implements one or both of these traits. Callers hold a
//! `Box<dyn Reader>` or `Box<dyn Writer>` and never branch on the transport.

use std::io;

/// A source of bytes
pub trait Reader: Send {
    /// Read up to `buf.len()` bytes into `buf`
    ///
    /// Returns the number of bytes read. `Ok(0)` signals end-of-stream (or an
    /// empty `buf`); `Err` is reserved for genuine I/O failures.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Whether [`Reader::reset`] may be called on this stream
    ///
    /// Fixed at construction for each backend.
    fn is_resettable(&self) -> bool;

    /// Rewind the logical read position to the start of the stream
    ///
    /// # Panics
    ///
    /// Panics if the stream is not resettable. Callers that need multiple
    /// passes must check [`Reader::is_resettable`] first.
    fn reset(&mut self) -> io::Result<()> {
        panic!("reset() called on a non-resettable stream");
    }

    /// Read until end-of-stream, appending to `out`
    ///
    /// Returns the number of bytes appended.
    fn read_to_end(&mut self, out: &mut Vec<u8>) -> io::Result<usize> {
        let mut chunk = [0u8; 8 * 1024];
        let mut total = 0;
        loop {
            match self.read(&mut chunk) {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    out.extend_from_slice(&chunk[..n]);
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

/// A sink for bytes
pub trait Writer: Send {
    /// Write up to `buf.len()` bytes from `buf`
    ///
    /// Returns the number of bytes accepted, which may be less than
    /// `buf.len()` for file and socket backends.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Push any bytes held by the backend to the underlying transport
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Write all of `buf`, retrying short writes
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "stream accepted zero bytes",
                    ))
                }
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn is_resettable(&self) -> bool {
        (**self).is_resettable()
    }

    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<R: Reader + ?Sized> Reader for &mut R {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn is_resettable(&self) -> bool {
        (**self).is_resettable()
    }

    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Adapts a [`Reader`] to [`std::io::Read`] for use with std/ecosystem parsers
pub struct IoReader<R>(pub R);

impl<R: Reader> io::Read for IoReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// Adapts a [`Writer`] to [`std::io::Write`]
pub struct IoWriter<W>(pub W);

impl<W: Writer> io::Write for IoWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
