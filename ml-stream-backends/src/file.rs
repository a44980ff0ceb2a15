//! Plain file backend

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use ml_stream_core::{Error, Reader, Result, StreamConfig, Writer};
use tracing::debug;

use crate::io::{FileMode, OpenOptions};

/// Stream over an OS file descriptor, opened for exactly one direction
///
/// A stream built from an empty path holds no file: reads return 0 and
/// writes are discarded.
pub(crate) struct FileAdapter {
    file: Option<File>,
    mode: FileMode,
}

impl FileAdapter {
    /// Open `path` in `mode`
    pub(crate) fn open(path: &Path, mode: FileMode, config: &StreamConfig) -> Result<Self> {
        if path.as_os_str().is_empty() {
            debug!(?mode, "opening null file stream");
            return Ok(Self { file: None, mode });
        }

        let file = OpenOptions::new(mode, config)
            .open(path)
            .map_err(|e| Error::open(path, e))?;
        debug!(path = %path.display(), ?mode, "opened file stream");

        Ok(Self {
            file: Some(file),
            mode,
        })
    }

    /// Adopt an already open file
    pub(crate) fn from_file(file: File, mode: FileMode) -> Self {
        Self {
            file: Some(file),
            mode,
        }
    }
}

impl Reader for FileAdapter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        assert_eq!(self.mode, FileMode::Read, "read() called on a write-mode file stream");
        match &mut self.file {
            Some(file) => file.read(buf),
            None => Ok(0),
        }
    }

    fn is_resettable(&self) -> bool {
        true
    }

    fn reset(&mut self) -> io::Result<()> {
        if let Some(file) = &mut self.file {
            file.seek(SeekFrom::Start(0))?;
        }
        Ok(())
    }
}

impl Writer for FileAdapter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        assert_eq!(self.mode, FileMode::Write, "write() called on a read-mode file stream");
        match &mut self.file {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.file {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StreamConfig {
        StreamConfig::default()
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");

        let mut writer = FileAdapter::open(&path, FileMode::Write, &config()).unwrap();
        writer.write_all(b"1 |f a b c\n-1 |f d e\n").unwrap();
        drop(writer);

        let mut reader = FileAdapter::open(&path, FileMode::Read, &config()).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"1 |f a b c\n-1 |f d e\n");
    }

    #[test]
    fn test_reset_replays_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passes.txt");
        let contents: Vec<u8> = (0..10_000u32).flat_map(u32::to_le_bytes).collect();
        std::fs::write(&path, &contents).unwrap();

        let mut reader = FileAdapter::open(&path, FileMode::Read, &config()).unwrap();
        assert!(reader.is_resettable());

        let mut first = Vec::new();
        reader.read_to_end(&mut first).unwrap();
        reader.reset().unwrap();
        let mut second = Vec::new();
        reader.read_to_end(&mut second).unwrap();

        assert_eq!(first, contents);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_path_fails_with_os_detail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.txt");

        let err = FileAdapter::open(&path, FileMode::Read, &config())
            .err()
            .expect("open should fail");
        assert!(err.is_open_failure());
        assert!(err.os_error_code().is_some());
        assert!(err.to_string().contains("does-not-exist.txt"));
    }

    #[test]
    fn test_empty_path_is_null_stream() {
        let mut reader = FileAdapter::open(Path::new(""), FileMode::Read, &config()).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        reader.reset().unwrap();
        assert_eq!(reader.read(&mut buf).unwrap(), 0);

        let mut writer = FileAdapter::open(Path::new(""), FileMode::Write, &config()).unwrap();
        assert_eq!(writer.write(b"discarded").unwrap(), 9);
    }

    #[test]
    fn test_adopted_file_is_resettable() {
        let mut scratch = tempfile::tempfile().unwrap();
        scratch.write_all(b"adopted").unwrap();
        scratch.seek(SeekFrom::Start(0)).unwrap();

        let mut reader = FileAdapter::from_file(scratch, FileMode::Read);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        reader.reset().unwrap();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"adoptedadopted");
    }

    #[test]
    #[should_panic(expected = "read() called on a write-mode file stream")]
    fn test_read_on_write_mode_panics() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FileAdapter::open(&dir.path().join("w"), FileMode::Write, &config()).unwrap();
        let mut buf = [0u8; 4];
        let _ = Reader::read(&mut writer, &mut buf);
    }

    #[test]
    #[should_panic(expected = "write() called on a read-mode file stream")]
    fn test_write_on_read_mode_panics() {
        let mut reader = FileAdapter::open(Path::new(""), FileMode::Read, &config()).unwrap();
        let _ = Writer::write(&mut reader, b"x");
    }
}
