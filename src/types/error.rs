//! Error types for split operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid configuration, detected before any I/O happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("only one-byte separators are supported, got {0:?}")]
    SeparatorLength(String),

    #[error("file chunk size is too small: {size} bytes (minimum is {min})")]
    ChunkSizeTooSmall { size: u64, min: u64 },

    #[error("read buffer size must be greater than zero")]
    ZeroReadBuffer,

    #[error("file chunk size is not set")]
    MissingChunkSize,
}

/// Errors returned by a split session.
///
/// Every I/O variant is fatal: the session stops at the first failure and
/// chunk files already written are left in place.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load settings: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("file chunk size is bigger than input file ({input_size} <= {chunk_byte_size} bytes)")]
    SourceSize { input_size: u64, chunk_byte_size: u64 },

    #[error("couldn't get file stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't open file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't read file bulk {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't create file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't write chunk file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SplitError {
    /// Whether the error was raised by configuration checks or loading.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Settings(_))
    }

    /// Whether the error came from the underlying file system or stream.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Stat { .. }
                | Self::Open { .. }
                | Self::Read { .. }
                | Self::Create { .. }
                | Self::Write { .. }
        )
    }

    /// Path of the file involved in an I/O failure.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Stat { path, .. }
            | Self::Open { path, .. }
            | Self::Read { path, .. }
            | Self::Create { path, .. }
            | Self::Write { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = SplitError::from(ConfigError::ZeroReadBuffer);
        assert!(err.is_config());
        assert!(!err.is_io());
        assert!(err.path().is_none());

        let err = SplitError::Create {
            path: PathBuf::from("wrong/test_1.csv"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
        };
        assert!(err.is_io());
        assert_eq!(err.path(), Some(std::path::Path::new("wrong/test_1.csv")));
        assert_eq!(
            err.to_string(),
            "couldn't create file wrong/test_1.csv: no such file or directory"
        );
    }

    #[test]
    fn test_config_error_messages() {
        let err = SplitError::from(ConfigError::SeparatorLength("Ω".to_string()));
        assert_eq!(err.to_string(), "only one-byte separators are supported, got \"Ω\"");

        let err = SplitError::SourceSize {
            input_size: 50,
            chunk_byte_size: 1_000_000,
        };
        assert!(!err.is_config());
        assert!(err.to_string().starts_with("file chunk size is bigger than input file"));
    }
}
