//! Configuration types for split operations.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, SplitError};
use crate::{default_read_buffer_size, DEFAULT_SEPARATOR, MIN_CHUNK_BYTE_SIZE};

/// Immutable options of a single split run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Target maximum size of an output chunk, in bytes
    pub chunk_byte_size: u64,

    /// Whether the first record is repeated at the top of every chunk
    pub with_header: bool,

    /// Field separator byte
    pub separator: u8,

    /// Bytes requested from the input per read call
    pub read_buffer_size: usize,
}

impl SplitConfig {
    /// Create a config with the given chunk size and default options.
    pub fn new(chunk_byte_size: u64) -> Self {
        Self {
            chunk_byte_size,
            with_header: true,
            separator: DEFAULT_SEPARATOR,
            read_buffer_size: default_read_buffer_size(),
        }
    }

    /// Enable or disable header repetition.
    pub fn with_header(mut self, with_header: bool) -> Self {
        self.with_header = with_header;
        self
    }

    /// Set the separator from its textual form.
    ///
    /// Only single-byte separators are accepted, so `";"` works while a
    /// multi-byte character such as `"Ω"` is rejected.
    pub fn with_separator(mut self, separator: &str) -> Result<Self, ConfigError> {
        self.separator = parse_separator(separator)?;
        Ok(self)
    }

    /// Set the read buffer size.
    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    /// Check the config before any I/O is attempted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_byte_size < MIN_CHUNK_BYTE_SIZE {
            return Err(ConfigError::ChunkSizeTooSmall {
                size: self.chunk_byte_size,
                min: MIN_CHUNK_BYTE_SIZE,
            });
        }
        if self.read_buffer_size == 0 {
            return Err(ConfigError::ZeroReadBuffer);
        }
        Ok(())
    }

    /// Chunks smaller than a read buffer are flushed line by line instead
    /// of once per buffer.
    pub fn is_small_buffer_mode(&self) -> bool {
        self.chunk_byte_size < self.read_buffer_size as u64
    }

    /// Size above which a written chunk is closed and the next flush opens
    /// a new one.
    pub fn rotation_threshold(&self) -> u64 {
        self.chunk_byte_size
            .saturating_sub(self.read_buffer_size as u64)
    }
}

/// Parse a separator given as text into its single byte.
pub fn parse_separator(separator: &str) -> Result<u8, ConfigError> {
    match separator.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(ConfigError::SeparatorLength(separator.to_string())),
    }
}

/// Layered settings as read from a settings file and the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitSettings {
    /// Target chunk size in bytes (required before a split can run)
    pub chunk_byte_size: Option<u64>,

    /// Repeat the header in every chunk
    pub with_header: bool,

    /// Separator in textual form
    pub separator: String,

    /// Read buffer size in bytes
    pub read_buffer_size: usize,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            chunk_byte_size: None,
            with_header: true,
            separator: char::from(DEFAULT_SEPARATOR).to_string(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl SplitSettings {
    /// Prefix of environment variables, e.g. `CSV_SPLITTER_CHUNK_BYTE_SIZE`.
    pub const ENV_PREFIX: &'static str = "CSV_SPLITTER";

    /// Load settings from an optional file, overlaid with the environment.
    ///
    /// The file format is inferred from its extension. Values missing from
    /// both layers keep their defaults.
    pub fn load(file: Option<&Path>) -> Result<Self, SplitError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}

impl TryFrom<SplitSettings> for SplitConfig {
    type Error = ConfigError;

    fn try_from(settings: SplitSettings) -> Result<Self, Self::Error> {
        let chunk_byte_size = settings
            .chunk_byte_size
            .ok_or(ConfigError::MissingChunkSize)?;

        let config = SplitConfig::new(chunk_byte_size)
            .with_header(settings.with_header)
            .with_separator(&settings.separator)?
            .with_read_buffer_size(settings.read_buffer_size);
        config.validate()?;

        Ok(config)
    }
}
