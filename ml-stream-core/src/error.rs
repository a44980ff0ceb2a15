//! Error types for ML data streams

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for stream construction and configuration
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for stream construction and configuration
///
/// Per-call `read`/`write` failures stay as [`io::Error`] so that a clean
/// zero-byte end-of-stream is never confused with a failure.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend could not acquire its resource (bad path, permission denied,
    /// codec open failure)
    #[error("can't open {}: {source}", .path.display())]
    Open {
        /// Path that was being opened
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// IO error outside of stream construction
    ///
    /// Backends never build this; it lets callers lift a per-call
    /// [`io::Error`] into [`Result`] with `?`.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration document could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl Error {
    /// Status reported for success at a foreign-call boundary
    pub const STATUS_SUCCESS: i32 = 0;
    /// Status reported when a stream could not be opened
    pub const STATUS_OPEN_FAILED: i32 = 1;
    /// Status reported for an I/O failure outside of construction
    pub const STATUS_IO: i32 = 2;
    /// Status reported for an invalid or unparsable configuration
    pub const STATUS_CONFIG: i32 = 3;

    /// Create an open failure for `path`
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Raw OS error code behind this error, if any
    pub fn os_error_code(&self) -> Option<i32> {
        match self {
            Self::Open { source, .. } | Self::Io(source) => source.raw_os_error(),
            Self::InvalidConfig(_) | Self::ConfigParse(_) => None,
        }
    }

    /// Stable status code for marshalling across a language boundary
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Open { .. } => Self::STATUS_OPEN_FAILED,
            Self::Io(_) => Self::STATUS_IO,
            Self::InvalidConfig(_) | Self::ConfigParse(_) => Self::STATUS_CONFIG,
        }
    }

    /// Whether this is a construction-time open failure
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}
