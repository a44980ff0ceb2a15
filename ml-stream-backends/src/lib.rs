//! Stream backends for ML data ingestion
//!
//! This crate implements the [`Reader`] and [`Writer`] contracts over plain
//! files, gzip files, process stdio (plain and gzip), sockets, growable
//! in-memory sinks and fixed in-memory views. Callers obtain streams through
//! the factory functions or a configured [`StreamFactory`] and never name a
//! backend type.
//!
//! ```no_run
//! use ml_stream_backends::{open_compressed_file_reader, Reader};
//!
//! let mut reader = open_compressed_file_reader("train.txt.gz")?;
//! let mut bytes = Vec::new();
//! reader.read_to_end(&mut bytes)?;
//! if reader.is_resettable() {
//!     reader.reset()?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

mod factory;
mod file;
mod gzip;
mod io;
mod memory;
mod socket;
mod stdio;

pub use factory::{
    create_buffer_view, create_vector_writer, open_compressed_file_reader,
    open_compressed_file_writer, open_compressed_stdin, open_compressed_stdout, open_file_reader,
    open_file_writer, open_mapped_file_reader, open_stdin, open_stdout, wrap_socket,
    wrap_socket_descriptor, Endpoint, StreamFactory,
};
pub use memory::SharedBuffer;
pub use socket::Socket;
pub use stdio::StdStreams;

// Re-export core types
pub use ml_stream_core::{
    CloseDescriptor, DescriptorCloser, Error, IoReader, IoWriter, OsClose, OwnedDescriptor,
    RawDescriptor, Reader, Result, StreamConfig, Writer,
};
