//! Platform-aware file opening

use std::fs::File;
use std::io;
use std::path::Path;

use ml_stream_core::StreamConfig;

/// Direction a file-backed stream is opened in
///
/// Chosen at construction and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Read-only, positioned at the start
    Read,
    /// Write-only, created or truncated
    Write,
}

/// File opening options with per-platform access hints
pub struct OpenOptions {
    /// Inner standard library open options
    inner: std::fs::OpenOptions,

    /// Direction the file is opened in
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    mode: FileMode,

    /// Whether to hint sequential access on read
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    sequential: bool,
}

impl OpenOptions {
    /// Options for opening in `mode`, taking hints and permissions from `config`
    pub fn new(mode: FileMode, config: &StreamConfig) -> Self {
        let mut inner = std::fs::OpenOptions::new();
        match mode {
            FileMode::Read => {
                inner.read(true);
            }
            FileMode::Write => {
                inner.write(true).create(true).truncate(true);
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            if mode == FileMode::Write {
                inner.mode(config.create_mode);
            }
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::OpenOptionsExt;
            // Deny writers while the file is open
            inner.share_mode(windows::FILE_SHARE_READ);
            if mode == FileMode::Read && config.sequential_hint {
                inner.custom_flags(windows::FILE_FLAG_SEQUENTIAL_SCAN);
            }
        }

        Self {
            inner,
            mode,
            sequential: config.sequential_hint,
        }
    }

    /// Open `path` with these options
    pub fn open(&self, path: &Path) -> io::Result<File> {
        let file = self.inner.open(path)?;

        #[cfg(target_os = "linux")]
        {
            if self.mode == FileMode::Read && self.sequential {
                advise_sequential(&file);
            }
        }

        Ok(file)
    }
}

#[cfg(windows)]
mod windows {
    pub const FILE_SHARE_READ: u32 = 0x0000_0001;
    pub const FILE_FLAG_SEQUENTIAL_SCAN: u32 = 0x0800_0000;
}

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
fn advise_sequential(file: &File) {
    use std::os::fd::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and open for this call.
    let rc = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL) };
    if rc != 0 {
        tracing::trace!(errno = rc, "posix_fadvise(SEQUENTIAL) failed");
    }
}
