//! Shared ownership of a socket descriptor
//!
//! A socket is split into a reader-role and a writer-role stream that may live
//! on different threads. Both hold an `Arc<DescriptorCloser>`; the descriptor
//! is released when the last of them (and the originating socket) is dropped.

use std::fmt;
use std::mem::ManuallyDrop;
use std::net::TcpStream;

#[cfg(unix)]
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawSocket, OwnedSocket, RawSocket};

use tracing::debug;

/// Owned OS socket descriptor
#[cfg(unix)]
pub type OwnedDescriptor = OwnedFd;
/// Owned OS socket descriptor
#[cfg(windows)]
pub type OwnedDescriptor = OwnedSocket;

/// Raw OS socket descriptor
#[cfg(unix)]
pub type RawDescriptor = RawFd;
/// Raw OS socket descriptor
#[cfg(windows)]
pub type RawDescriptor = RawSocket;

/// Releases a descriptor once its last owner is gone
#[cfg_attr(test, mockall::automock)]
pub trait CloseDescriptor: Send + Sync {
    /// Take ownership of `descriptor` and release it
    fn close(&self, descriptor: OwnedDescriptor);
}

/// Closes the descriptor with the platform's close primitive
#[derive(Debug, Default, Clone, Copy)]
pub struct OsClose;

impl CloseDescriptor for OsClose {
    fn close(&self, descriptor: OwnedDescriptor) {
        // close(2) on unix, closesocket on windows
        drop(descriptor);
    }
}

/// Reference-counted owner of one socket descriptor
///
/// Share it with `Arc`. The close hook runs exactly once, from `Drop`.
pub struct DescriptorCloser {
    stream: ManuallyDrop<TcpStream>,
    raw: RawDescriptor,
    hook: Box<dyn CloseDescriptor>,
}

impl DescriptorCloser {
    /// Bind a closer to `descriptor` using the OS close primitive
    pub fn new(descriptor: OwnedDescriptor) -> Self {
        Self::with_hook(descriptor, OsClose)
    }

    /// Bind a closer to `descriptor`, releasing it through `hook`
    pub fn with_hook(descriptor: OwnedDescriptor, hook: impl CloseDescriptor + 'static) -> Self {
        #[cfg(unix)]
        let raw = descriptor.as_raw_fd();
        #[cfg(windows)]
        let raw = descriptor.as_raw_socket();

        Self {
            stream: ManuallyDrop::new(TcpStream::from(descriptor)),
            raw,
            hook: Box::new(hook),
        }
    }

    /// The raw descriptor value, for diagnostics
    pub fn raw(&self) -> RawDescriptor {
        self.raw
    }

    /// Borrow the descriptor as a socket for `recv`/`send` style I/O
    ///
    /// `&TcpStream` implements `Read` and `Write`, which map onto the
    /// platform's socket calls.
    pub fn socket(&self) -> &TcpStream {
        &self.stream
    }
}

impl Drop for DescriptorCloser {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: `stream` is never touched again after this point.
        let stream = unsafe { ManuallyDrop::take(&mut self.stream) };
        debug!(descriptor = ?self.raw, "closing shared socket descriptor");
        self.hook.close(OwnedDescriptor::from(stream));
    }
}

impl fmt::Debug for DescriptorCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorCloser")
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(DescriptorCloser: Send, Sync);
