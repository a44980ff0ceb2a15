//! Stream configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options shared by the stream factories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// gzip compression level for compressed writers (0-9)
    pub compression_level: u32,

    /// Hint the OS that files opened for reading are consumed sequentially
    pub sequential_hint: bool,

    /// Permission bits for files created by writers (before umask)
    pub create_mode: u32,

    /// Capacity of the buffer feeding the decompressor
    pub read_buffer_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
            sequential_hint: true,
            create_mode: 0o666,
            read_buffer_capacity: 64 * 1024, // 64KB
        }
    }
}

impl StreamConfig {
    /// Check that every value is in range
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(Error::InvalidConfig(format!(
                "compression_level must be between 0 and 9, got {}",
                self.compression_level
            )));
        }
        if self.read_buffer_capacity == 0 {
            return Err(Error::InvalidConfig(
                "read_buffer_capacity must be non-zero".into(),
            ));
        }
        if self.create_mode > 0o7777 {
            return Err(Error::InvalidConfig(format!(
                "create_mode {:o} is not a permission mask",
                self.create_mode
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document
    ///
    /// Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
