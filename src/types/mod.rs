//! Core types for split operations.

mod config;
mod error;

pub use config::{parse_separator, SplitConfig, SplitSettings};
pub use error::{ConfigError, SplitError};
