//! gzip file backend
//!
//! Reads decode concatenated gzip members as one stream and pass through
//! input that does not start with the gzip magic bytes. Codec failures are
//! reported as a zero-byte result, the same as end-of-stream; each one is
//! logged at `warn` so it is not lost entirely.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Chain, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ml_stream_core::{Error, Reader, Result, StreamConfig, Writer};
use tracing::{debug, warn};

use crate::io::{FileMode, OpenOptions};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Bytes consumed while sniffing, replayed ahead of the rest of the input
type Lookahead<R> = Chain<Cursor<Vec<u8>>, R>;

enum DecodeState<R> {
    Undetected { head: Vec<u8>, inner: R },
    Gzip(MultiGzDecoder<Lookahead<R>>),
    Plain(Lookahead<R>),
}

/// Decoder that sniffs the gzip header on first read
///
/// The header may arrive split across several short reads; detection waits
/// until the full magic is buffered or the input ends.
pub(crate) struct TransparentDecoder<R> {
    state: Option<DecodeState<R>>,
}

impl<R: BufRead> TransparentDecoder<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            state: Some(DecodeState::Undetected {
                head: Vec::with_capacity(GZIP_MAGIC.len()),
                inner,
            }),
        }
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let state = match self.state.take() {
            Some(DecodeState::Undetected { mut head, mut inner }) => {
                if let Err(e) = fill_head(&mut head, &mut inner) {
                    self.state = Some(DecodeState::Undetected { head, inner });
                    return Err(e);
                }
                let is_gzip = head.starts_with(&GZIP_MAGIC);
                let lookahead = Cursor::new(head).chain(inner);
                if is_gzip {
                    DecodeState::Gzip(MultiGzDecoder::new(lookahead))
                } else {
                    DecodeState::Plain(lookahead)
                }
            }
            Some(state) => state,
            None => return Ok(0),
        };

        match self.state.insert(state) {
            DecodeState::Gzip(decoder) => decoder.read(buf),
            DecodeState::Plain(inner) => inner.read(buf),
            DecodeState::Undetected { .. } => Ok(0),
        }
    }

    pub(crate) fn into_inner(self) -> Option<R> {
        self.state.map(|state| match state {
            DecodeState::Undetected { inner, .. } => inner,
            DecodeState::Plain(lookahead) => lookahead.into_inner().1,
            DecodeState::Gzip(decoder) => decoder.into_inner().into_inner().1,
        })
    }
}

/// Move bytes from `inner` into `head` until it holds the magic's length or
/// the input ends
fn fill_head<R: BufRead>(head: &mut Vec<u8>, inner: &mut R) -> io::Result<()> {
    while head.len() < GZIP_MAGIC.len() {
        let available = match inner.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            break;
        }

        let take = available.len().min(GZIP_MAGIC.len() - head.len());
        head.extend_from_slice(&available[..take]);
        inner.consume(take);
    }
    Ok(())
}

/// Collapse a codec result into this layer's contract: failures read as 0
pub(crate) fn codec_result(result: io::Result<usize>, op: &'static str) -> io::Result<usize> {
    match result {
        Ok(n) => Ok(n),
        Err(e) => {
            warn!(op, error = %e, "gzip codec error reported as end-of-stream");
            Ok(0)
        }
    }
}

/// gzip stream over a file, opened for exactly one direction
pub(crate) struct GzipFileAdapter {
    input: Option<TransparentDecoder<BufReader<File>>>,
    output: Option<GzEncoder<File>>,
    mode: FileMode,
    capacity: usize,
}

impl GzipFileAdapter {
    /// Open `path` in `mode`; an empty path yields a null stream
    pub(crate) fn open(path: &Path, mode: FileMode, config: &StreamConfig) -> Result<Self> {
        if path.as_os_str().is_empty() {
            debug!(?mode, "opening null compressed stream");
            return Ok(Self {
                input: None,
                output: None,
                mode,
                capacity: config.read_buffer_capacity,
            });
        }

        let file = OpenOptions::new(mode, config)
            .open(path)
            .map_err(|e| Error::open(path, e))?;
        debug!(path = %path.display(), ?mode, "opened compressed file stream");

        Ok(Self::from_file(file, mode, config))
    }

    /// Adopt an already open file
    pub(crate) fn from_file(file: File, mode: FileMode, config: &StreamConfig) -> Self {
        let capacity = config.read_buffer_capacity;
        let (input, output) = match mode {
            FileMode::Read => (
                Some(TransparentDecoder::new(BufReader::with_capacity(capacity, file))),
                None,
            ),
            FileMode::Write => (
                None,
                Some(GzEncoder::new(file, Compression::new(config.compression_level))),
            ),
        };

        Self {
            input,
            output,
            mode,
            capacity,
        }
    }
}

impl Reader for GzipFileAdapter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        assert_eq!(self.mode, FileMode::Read, "read() called on a write-mode compressed file stream");
        match &mut self.input {
            Some(decoder) => codec_result(decoder.read(buf), "read"),
            None => Ok(0),
        }
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> io::Result<()> {
        assert_eq!(self.mode, FileMode::Read, "reset() called on a write-mode compressed file stream");
        let Some(mut file) = self
            .input
            .take()
            .and_then(TransparentDecoder::into_inner)
            .map(BufReader::into_inner)
        else {
            return Ok(());
        };

        let rewound = file.seek(SeekFrom::Start(0)).map(|_| ());
        self.input = Some(TransparentDecoder::new(BufReader::with_capacity(self.capacity, file)));
        rewound
    }
}

impl Writer for GzipFileAdapter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        assert_eq!(self.mode, FileMode::Write, "write() called on a read-mode compressed file stream");
        match &mut self.output {
            Some(encoder) => codec_result(encoder.write(buf), "write"),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.output {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for GzipFileAdapter {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.output.take() {
            if let Err(e) = encoder.try_finish() {
                warn!(error = %e, "failed to finish compressed file stream");
            }
        }
    }
}
