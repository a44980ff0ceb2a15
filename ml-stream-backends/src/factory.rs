//! Factories: the single point of backend selection
//!
//! Each factory returns the narrowest capability its backend satisfies, as a
//! trait object. Sockets return a [`Socket`] that must be split with
//! `get_reader`/`get_writer` before use.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ml_stream_core::{OwnedDescriptor, RawDescriptor, Reader, Result, StreamConfig, Writer};

use crate::file::FileAdapter;
use crate::gzip::GzipFileAdapter;
use crate::io::FileMode;
use crate::memory::{map_file, BufferView, SharedBuffer, VectorWriter};
use crate::socket::Socket;
use crate::stdio::{GzipStdioAdapter, StdStreams, StdioAdapter};

/// Where a stream reads from or writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// No backing resource: reads return 0, writes are discarded
    Null,
    /// The process's standard input or output
    Std {
        /// Whether the bytes are gzip-compressed
        compressed: bool,
    },
    /// A filesystem path
    File {
        /// Path to the file
        path: PathBuf,
        /// Whether the bytes are gzip-compressed
        compressed: bool,
    },
}

impl Endpoint {
    /// Interpret a command-line style location
    ///
    /// `""` is the null stream, `"-"` the standard streams, and a path ending
    /// in `.gz` or `.gzip` a compressed file.
    pub fn parse(location: &str) -> Self {
        match location {
            "" => Self::Null,
            "-" => Self::Std { compressed: false },
            _ => {
                let path = PathBuf::from(location);
                let compressed = Self::has_gzip_extension(&path);
                Self::File { path, compressed }
            }
        }
    }

    /// Force the compression flag, e.g. for a compressed standard input
    #[must_use]
    pub fn compressed(self, compressed: bool) -> Self {
        match self {
            Self::Null => Self::Null,
            Self::Std { .. } => Self::Std { compressed },
            Self::File { path, .. } => Self::File { path, compressed },
        }
    }

    fn has_gzip_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("gzip"))
    }
}

/// Builds streams using one validated [`StreamConfig`]
#[derive(Debug, Clone, Default)]
pub struct StreamFactory {
    config: StreamConfig,
}

impl StreamFactory {
    /// Create a factory, rejecting out-of-range configuration
    pub fn new(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Open a file for reading
    pub fn open_file_reader(&self, path: impl AsRef<Path>) -> Result<Box<dyn Reader>> {
        let adapter = FileAdapter::open(path.as_ref(), FileMode::Read, &self.config)?;
        Ok(Box::new(adapter))
    }

    /// Create or truncate a file for writing
    pub fn open_file_writer(&self, path: impl AsRef<Path>) -> Result<Box<dyn Writer>> {
        let adapter = FileAdapter::open(path.as_ref(), FileMode::Write, &self.config)?;
        Ok(Box::new(adapter))
    }

    /// Open a gzip file for reading
    pub fn open_compressed_file_reader(&self, path: impl AsRef<Path>) -> Result<Box<dyn Reader>> {
        let adapter = GzipFileAdapter::open(path.as_ref(), FileMode::Read, &self.config)?;
        Ok(Box::new(adapter))
    }

    /// Create or truncate a gzip file for writing
    pub fn open_compressed_file_writer(&self, path: impl AsRef<Path>) -> Result<Box<dyn Writer>> {
        let adapter = GzipFileAdapter::open(path.as_ref(), FileMode::Write, &self.config)?;
        Ok(Box::new(adapter))
    }

    /// Read from an already open file, starting at its current position
    pub fn file_reader_from(&self, file: File) -> Box<dyn Reader> {
        Box::new(FileAdapter::from_file(file, FileMode::Read))
    }

    /// Write to an already open file
    pub fn file_writer_from(&self, file: File) -> Box<dyn Writer> {
        Box::new(FileAdapter::from_file(file, FileMode::Write))
    }

    /// Decode gzip from an already open file
    pub fn compressed_file_reader_from(&self, file: File) -> Box<dyn Reader> {
        Box::new(GzipFileAdapter::from_file(file, FileMode::Read, &self.config))
    }

    /// Encode gzip into an already open file
    pub fn compressed_file_writer_from(&self, file: File) -> Box<dyn Writer> {
        Box::new(GzipFileAdapter::from_file(file, FileMode::Write, &self.config))
    }

    /// Read from the input half of `streams`
    pub fn stdio_reader<R, W>(&self, streams: StdStreams<R, W>) -> Box<dyn Reader>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Box::new(StdioAdapter::new(streams))
    }

    /// Write to the output half of `streams`
    pub fn stdio_writer<R, W>(&self, streams: StdStreams<R, W>) -> Box<dyn Writer>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Box::new(StdioAdapter::new(streams))
    }

    /// Decode gzip from the input half of `streams`
    pub fn compressed_stdio_reader<R, W>(&self, streams: StdStreams<R, W>) -> Box<dyn Reader>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Box::new(GzipStdioAdapter::new(streams, &self.config))
    }

    /// Encode gzip into the output half of `streams`
    pub fn compressed_stdio_writer<R, W>(&self, streams: StdStreams<R, W>) -> Box<dyn Writer>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Box::new(GzipStdioAdapter::writer(streams, &self.config))
    }

    /// Read the process's standard input
    pub fn open_stdin(&self) -> Box<dyn Reader> {
        self.stdio_reader(StdStreams::process())
    }

    /// Write the process's standard output
    pub fn open_stdout(&self) -> Box<dyn Writer> {
        self.stdio_writer(StdStreams::process())
    }

    /// Decode gzip from the process's standard input
    pub fn open_compressed_stdin(&self) -> Box<dyn Reader> {
        self.compressed_stdio_reader(StdStreams::process())
    }

    /// Encode gzip onto the process's standard output
    pub fn open_compressed_stdout(&self) -> Box<dyn Writer> {
        self.compressed_stdio_writer(StdStreams::process())
    }

    /// Map a file read-only and read it as a resettable in-memory view
    pub fn open_mapped_file_reader(&self, path: impl AsRef<Path>) -> Result<Box<dyn Reader>> {
        Ok(Box::new(map_file(path.as_ref())?))
    }

    /// Open `endpoint` for reading
    pub fn open_input(&self, endpoint: &Endpoint) -> Result<Box<dyn Reader>> {
        match endpoint {
            Endpoint::Null => self.open_file_reader(""),
            Endpoint::Std { compressed: false } => Ok(self.open_stdin()),
            Endpoint::Std { compressed: true } => Ok(self.open_compressed_stdin()),
            Endpoint::File { path, compressed: false } => self.open_file_reader(path),
            Endpoint::File { path, compressed: true } => self.open_compressed_file_reader(path),
        }
    }

    /// Open `endpoint` for writing
    pub fn open_output(&self, endpoint: &Endpoint) -> Result<Box<dyn Writer>> {
        match endpoint {
            Endpoint::Null => self.open_file_writer(""),
            Endpoint::Std { compressed: false } => Ok(self.open_stdout()),
            Endpoint::Std { compressed: true } => Ok(self.open_compressed_stdout()),
            Endpoint::File { path, compressed: false } => self.open_file_writer(path),
            Endpoint::File { path, compressed: true } => self.open_compressed_file_writer(path),
        }
    }
}

/// Open a file for reading with the default configuration
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<Box<dyn Reader>> {
    StreamFactory::default().open_file_reader(path)
}

/// Create or truncate a file for writing with the default configuration
pub fn open_file_writer(path: impl AsRef<Path>) -> Result<Box<dyn Writer>> {
    StreamFactory::default().open_file_writer(path)
}

/// Open a gzip file for reading with the default configuration
pub fn open_compressed_file_reader(path: impl AsRef<Path>) -> Result<Box<dyn Reader>> {
    StreamFactory::default().open_compressed_file_reader(path)
}

/// Create or truncate a gzip file for writing with the default configuration
pub fn open_compressed_file_writer(path: impl AsRef<Path>) -> Result<Box<dyn Writer>> {
    StreamFactory::default().open_compressed_file_writer(path)
}

/// Read the process's standard input
pub fn open_stdin() -> Box<dyn Reader> {
    StreamFactory::default().open_stdin()
}

/// Write the process's standard output
pub fn open_stdout() -> Box<dyn Writer> {
    StreamFactory::default().open_stdout()
}

/// Decode gzip from the process's standard input
pub fn open_compressed_stdin() -> Box<dyn Reader> {
    StreamFactory::default().open_compressed_stdin()
}

/// Encode gzip onto the process's standard output
pub fn open_compressed_stdout() -> Box<dyn Writer> {
    StreamFactory::default().open_compressed_stdout()
}

/// Map a file read-only and read it as a resettable in-memory view
pub fn open_mapped_file_reader(path: impl AsRef<Path>) -> Result<Box<dyn Reader>> {
    StreamFactory::default().open_mapped_file_reader(path)
}

/// Take ownership of a connected socket
pub fn wrap_socket(descriptor: OwnedDescriptor) -> Socket {
    Socket::new(descriptor)
}

/// Take ownership of a raw connected socket descriptor
///
/// # Safety
///
/// `descriptor` must be an open socket that nothing else will close.
#[allow(unsafe_code)]
pub unsafe fn wrap_socket_descriptor(descriptor: RawDescriptor) -> Socket {
    #[cfg(unix)]
    let owned = {
        use std::os::fd::FromRawFd;
        // SAFETY: upheld by the caller
        unsafe { OwnedDescriptor::from_raw_fd(descriptor) }
    };
    #[cfg(windows)]
    let owned = {
        use std::os::windows::io::FromRawSocket;
        // SAFETY: upheld by the caller
        unsafe { OwnedDescriptor::from_raw_socket(descriptor) }
    };

    Socket::new(owned)
}

/// Append every write to `buffer`
pub fn create_vector_writer(buffer: SharedBuffer) -> Box<dyn Writer> {
    Box::new(VectorWriter::new(buffer))
}

/// Read from a caller-owned byte range
pub fn create_buffer_view(data: &[u8]) -> Box<dyn Reader + '_> {
    Box::new(BufferView::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use test_case::test_case;

    fn read_all(reader: &mut dyn Reader) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    #[test_case("", Endpoint::Null ; "empty is null")]
    #[test_case("-", Endpoint::Std { compressed: false } ; "dash is stdio")]
    #[test_case("train.txt", Endpoint::File { path: "train.txt".into(), compressed: false } ; "plain file")]
    #[test_case("train.txt.gz", Endpoint::File { path: "train.txt.gz".into(), compressed: true } ; "gz file")]
    #[test_case("cache.GZIP", Endpoint::File { path: "cache.GZIP".into(), compressed: true } ; "gzip upper case")]
    fn test_endpoint_parse(location: &str, expected: Endpoint) {
        assert_eq!(Endpoint::parse(location), expected);
    }

    #[test]
    fn test_endpoint_force_compression() {
        assert_eq!(Endpoint::parse("-").compressed(true), Endpoint::Std { compressed: true });
        assert_eq!(Endpoint::Null.compressed(true), Endpoint::Null);
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        let config = StreamConfig {
            compression_level: 12,
            ..StreamConfig::default()
        };
        assert!(StreamFactory::new(config).is_err());
    }

    #[test_case(false ; "plain")]
    #[test_case(true ; "compressed")]
    fn test_round_trip_through_endpoints(compressed: bool) {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::File {
            path: dir.path().join("round_trip"),
            compressed,
        };
        let factory = StreamFactory::default();
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 7 % 256) as u8).collect();

        let mut writer = factory.open_output(&endpoint).unwrap();
        writer.write_all(&data).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let mut reader = factory.open_input(&endpoint).unwrap();
        assert!(reader.is_resettable());
        let first = read_all(reader.as_mut());
        reader.reset().unwrap();
        let second = read_all(reader.as_mut());

        assert_eq!(first, data);
        assert_eq!(second, data);
    }

    #[test]
    fn test_compressed_writer_output_readable_by_plain_reader_as_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.gz");

        let mut writer = open_compressed_file_writer(&path).unwrap();
        writer.write_all(b"model bytes").unwrap();
        drop(writer);

        let raw = read_all(open_file_reader(&path).unwrap().as_mut());
        assert_eq!(&raw[..2], &[0x1f_u8, 0x8b]);
        assert_eq!(read_all(open_compressed_file_reader(&path).unwrap().as_mut()), b"model bytes");
    }

    #[test]
    fn test_open_failures_surface_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        for result in [
            open_file_reader(&missing).map(drop),
            open_compressed_file_reader(&missing).map(drop),
            open_mapped_file_reader(&missing).map(drop),
            open_file_writer(dir.path().join("no-dir").join("out")).map(drop),
        ] {
            let err = result.unwrap_err();
            assert!(err.is_open_failure());
            assert!(err.os_error_code().is_some());
        }
    }

    #[test]
    fn test_null_endpoint_reads_nothing() {
        let factory = StreamFactory::default();
        let mut reader = factory.open_input(&Endpoint::Null).unwrap();
        assert!(read_all(reader.as_mut()).is_empty());

        let mut writer = factory.open_output(&Endpoint::Null).unwrap();
        writer.write_all(b"ignored").unwrap();
    }

    #[test]
    fn test_vector_writer_and_buffer_view_pair() {
        let shared: SharedBuffer = Arc::default();
        let mut writer = create_vector_writer(shared.clone());
        writer.write_all(b"A").unwrap();
        writer.write_all(b"").unwrap();
        writer.write_all(b"BC").unwrap();

        let bytes = shared.lock().unwrap().clone();
        assert_eq!(bytes, b"ABC");

        let mut view = create_buffer_view(&bytes);
        assert!(view.is_resettable());
        assert_eq!(read_all(view.as_mut()), b"ABC");
        view.reset().unwrap();
        assert_eq!(read_all(view.as_mut()), b"ABC");
    }

    #[test]
    fn test_stdio_factories_use_supplied_streams() {
        let factory = StreamFactory::default();
        let mut reader = factory.stdio_reader(StdStreams::new(Cursor::new(b"stdin".to_vec()), Vec::new()));
        assert!(!reader.is_resettable());
        assert_eq!(read_all(reader.as_mut()), b"stdin");

        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut writer = factory.compressed_stdio_writer(StdStreams::new(
            Cursor::new(Vec::new()),
            SharedSink(sink.clone()),
        ));
        writer.write_all(b"gz out").unwrap();
        drop(writer);

        let encoded = sink.lock().unwrap().clone();
        let mut decoder = factory.compressed_stdio_reader(StdStreams::new(Cursor::new(encoded), Vec::new()));
        assert_eq!(read_all(decoder.as_mut()), b"gz out");
    }

    #[test]
    fn test_unused_compressed_stdio_writer_is_valid_gzip() {
        let factory = StreamFactory::default();
        let sink = Arc::new(Mutex::new(Vec::new()));
        drop(factory.compressed_stdio_writer(StdStreams::new(
            Cursor::new(Vec::new()),
            SharedSink(sink.clone()),
        )));

        let encoded = sink.lock().unwrap().clone();
        let mut decoder = factory.compressed_stdio_reader(StdStreams::new(Cursor::new(encoded), Vec::new()));
        assert!(read_all(decoder.as_mut()).is_empty());
    }

    #[test]
    fn test_one_byte_buffer_compressed_round_trip() {
        let factory = StreamFactory::new(StreamConfig {
            read_buffer_capacity: 1,
            ..StreamConfig::default()
        })
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.gz");

        let mut writer = factory.open_compressed_file_writer(&path).unwrap();
        writer.write_all(b"hello gzip").unwrap();
        drop(writer);

        let mut reader = factory.open_compressed_file_reader(&path).unwrap();
        assert_eq!(read_all(reader.as_mut()), b"hello gzip");
    }

    #[test]
    fn test_adopted_files() {
        let factory = StreamFactory::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adopted.gz");

        let mut writer = factory.compressed_file_writer_from(File::create(&path).unwrap());
        writer.write_all(b"from descriptor").unwrap();
        drop(writer);

        let mut reader = factory.compressed_file_reader_from(File::open(&path).unwrap());
        assert_eq!(read_all(reader.as_mut()), b"from descriptor");

        let mut plain = factory.file_writer_from(File::create(dir.path().join("plain")).unwrap());
        plain.write_all(b"plain").unwrap();
        drop(plain);
        let mut reader = factory.file_reader_from(File::open(dir.path().join("plain")).unwrap());
        assert_eq!(read_all(reader.as_mut()), b"plain");
    }

    #[test]
    fn test_wrapped_socket_descriptor_round_trip() {
        use std::net::{TcpListener, TcpStream};

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        #[cfg(unix)]
        let raw = std::os::fd::IntoRawFd::into_raw_fd(client);
        #[cfg(windows)]
        let raw = std::os::windows::io::IntoRawSocket::into_raw_socket(client);

        #[allow(unsafe_code)]
        // SAFETY: `raw` was just released by `client` and is owned by no one else
        let socket = unsafe { wrap_socket_descriptor(raw) };
        assert_eq!(socket.raw(), raw);

        let mut writer = socket.get_writer();
        writer.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        server.write_all(b"pong").unwrap();
        let mut reader = socket.get_reader();
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < buf.len() {
            filled += reader.read(&mut buf[filled..]).unwrap();
        }
        assert_eq!(&buf, b"pong");
    }

    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
