//! CSV Splitter Library
//!
//! Streams a large delimited-text file and re-emits it as a sequence of
//! smaller chunk files, each close to a target byte size. Records are never
//! split across chunks, even when a quoted field spans several physical
//! lines, and the header record can be repeated at the top of every chunk.

pub mod fs;
pub mod scanner;
pub mod splitter;
pub mod types;

pub use fs::{ChunkNaming, FileOperator, LocalFileSystem};
pub use scanner::{
    classify_line, count_completed_columns, is_completing_line, scan_columns, ColumnScanner,
    LineKind,
};
pub use splitter::Splitter;
pub use types::{ConfigError, SplitConfig, SplitError, SplitSettings};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::fs::*;
    pub use crate::scanner::*;
    pub use crate::splitter::Splitter;
    pub use crate::types::*;
}

/// Smallest accepted chunk size in bytes
pub const MIN_CHUNK_BYTE_SIZE: u64 = 100;

/// Default field separator
pub const DEFAULT_SEPARATOR: u8 = b',';

/// Number of memory pages read per I/O call by default
pub const READ_BUFFER_PAGES: usize = 128;

/// Default bytes per read call: [`READ_BUFFER_PAGES`] pages of the
/// platform's page size.
pub fn default_read_buffer_size() -> usize {
    page_size::get() * READ_BUFFER_PAGES
}
