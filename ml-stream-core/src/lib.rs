//! Core contracts for transport-agnostic ML data streams
//!
//! This crate defines the [`Reader`] and [`Writer`] capability traits that
//! every stream backend implements, the reference-counted
//! [`DescriptorCloser`] that lets a socket's reader and writer roles share one
//! OS descriptor, and the error and configuration types used by the factories.

#![warn(missing_docs)]

pub mod closer;
pub mod config;
pub mod error;
pub mod stream;

// Re-export key types for convenience
pub use closer::{CloseDescriptor, DescriptorCloser, OsClose, OwnedDescriptor, RawDescriptor};
pub use config::StreamConfig;
pub use error::{Error, Result};
pub use stream::{IoReader, IoWriter, Reader, Writer};
