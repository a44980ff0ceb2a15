//! Socket backend
//!
//! A [`Socket`] is split into independent reader and writer streams before
//! use. Every piece holds the same [`DescriptorCloser`], so the descriptor is
//! closed once, after the socket and all streams derived from it are dropped.

use std::io::{self, Read, Write};
use std::sync::Arc;

use ml_stream_core::{DescriptorCloser, OwnedDescriptor, RawDescriptor, Reader, Writer};
use tracing::{debug, trace};

/// A connected socket that hands out role-specific streams
#[derive(Debug, Clone)]
pub struct Socket {
    closer: Arc<DescriptorCloser>,
}

impl Socket {
    /// Take ownership of a connected socket descriptor
    pub fn new(descriptor: OwnedDescriptor) -> Self {
        Self::from_closer(Arc::new(DescriptorCloser::new(descriptor)))
    }

    /// Build a socket around an existing closer
    ///
    /// Use [`DescriptorCloser::with_hook`] to control how the descriptor is
    /// released.
    pub fn from_closer(closer: Arc<DescriptorCloser>) -> Self {
        debug!(descriptor = ?closer.raw(), "wrapped socket descriptor");
        Self { closer }
    }

    /// The raw descriptor value
    pub fn raw(&self) -> RawDescriptor {
        self.closer.raw()
    }

    /// A reader-role stream over this socket
    pub fn get_reader(&self) -> Box<dyn Reader> {
        Box::new(SocketAdapter::new(self.closer.clone()))
    }

    /// A writer-role stream over this socket
    pub fn get_writer(&self) -> Box<dyn Writer> {
        Box::new(SocketAdapter::new(self.closer.clone()))
    }
}

/// Pass-through stream over the shared descriptor; never resettable
struct SocketAdapter {
    closer: Arc<DescriptorCloser>,
}

impl SocketAdapter {
    fn new(closer: Arc<DescriptorCloser>) -> Self {
        Self { closer }
    }
}

impl Reader for SocketAdapter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.closer.socket().read(buf)?;
        trace!(descriptor = ?self.closer.raw(), bytes = n, "socket read");
        Ok(n)
    }

    fn is_resettable(&self) -> bool {
        false
    }
}

impl Writer for SocketAdapter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.closer.socket().write(buf)?;
        trace!(descriptor = ?self.closer.raw(), bytes = n, "socket write");
        Ok(n)
    }
}

static_assertions::assert_impl_all!(Socket: Send, Sync);
