//! Standard input/output backends
//!
//! Process stdio is reached only through [`StdStreams::process`]; everything
//! else takes a `StdStreams` value so tests can substitute in-memory streams.

use std::io::{self, BufReader, Read, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use ml_stream_core::{Reader, StreamConfig, Writer};
use tracing::{debug, warn};

use crate::gzip::{codec_result, TransparentDecoder};

/// The console pair: one input and one output stream
#[derive(Debug)]
pub struct StdStreams<R, W> {
    input: R,
    output: W,
}

impl StdStreams<io::Stdin, io::Stdout> {
    /// The process's standard input and standard output
    pub fn process() -> Self {
        Self::new(io::stdin(), io::stdout())
    }
}

impl<R, W> StdStreams<R, W> {
    /// Pair an arbitrary input and output as a console
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Split back into the input and output streams
    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}

/// Uncompressed console stream; never resettable
pub(crate) struct StdioAdapter<R, W: Write> {
    streams: StdStreams<R, W>,
}

impl<R, W: Write> StdioAdapter<R, W> {
    pub(crate) fn new(streams: StdStreams<R, W>) -> Self {
        debug!("opened stdio stream");
        Self { streams }
    }
}

impl<R: Read + Send, W: Write + Send> Reader for StdioAdapter<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.streams.input.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                result => return result,
            }
        }
    }

    fn is_resettable(&self) -> bool {
        false
    }
}

impl<R: Read + Send, W: Write + Send> Writer for StdioAdapter<R, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.streams.output.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.streams.output.flush()
    }
}

impl<R, W: Write> Drop for StdioAdapter<R, W> {
    fn drop(&mut self) {
        if let Err(e) = self.streams.output.flush() {
            warn!(error = %e, "failed to flush stdio stream");
        }
    }
}

/// Compressed console stream; never resettable
///
/// The decoder is bound to the input at construction. A stream built with
/// [`GzipStdioAdapter::writer`] starts its encoder immediately, so dropping it
/// unused still leaves a valid empty gzip member on the output. One built with
/// [`GzipStdioAdapter::new`] creates the encoder on first write, so a console
/// opened only for reading never writes to the output.
pub(crate) struct GzipStdioAdapter<R, W: Write> {
    input: TransparentDecoder<BufReader<R>>,
    output: Option<W>,
    encoder: Option<GzEncoder<W>>,
    level: Compression,
}

impl<R: Read, W: Write> GzipStdioAdapter<R, W> {
    pub(crate) fn new(streams: StdStreams<R, W>, config: &StreamConfig) -> Self {
        debug!("opened compressed stdio stream");
        let (input, output) = streams.into_parts();
        Self {
            input: TransparentDecoder::new(BufReader::with_capacity(config.read_buffer_capacity, input)),
            output: Some(output),
            encoder: None,
            level: Compression::new(config.compression_level),
        }
    }

    pub(crate) fn writer(streams: StdStreams<R, W>, config: &StreamConfig) -> Self {
        let mut adapter = Self::new(streams, config);
        adapter.encoder();
        adapter
    }

    fn encoder(&mut self) -> Option<&mut GzEncoder<W>> {
        if self.encoder.is_none() {
            let output = self.output.take()?;
            self.encoder = Some(GzEncoder::new(output, self.level));
        }
        self.encoder.as_mut()
    }
}

impl<R: Read + Send, W: Write + Send> Reader for GzipStdioAdapter<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        codec_result(self.input.read(buf), "read")
    }

    fn is_resettable(&self) -> bool {
        false
    }
}

impl<R: Read + Send, W: Write + Send> Writer for GzipStdioAdapter<R, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.encoder() {
            Some(encoder) => codec_result(encoder.write(buf), "write"),
            None => Ok(0),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.encoder {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }
}

impl<R, W: Write> Drop for GzipStdioAdapter<R, W> {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            if let Err(e) = encoder.try_finish() {
                warn!(error = %e, "failed to finish compressed stdio stream");
            }
        }
    }
}
