//! File-system access used by the splitter.
//!
//! The splitter only touches the file system through [`FileOperator`], so
//! tests can substitute in-memory or failing implementations.

mod naming;

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

pub use naming::{split_file_name, ChunkNaming};

/// Narrow file-system interface consumed by a split session.
pub trait FileOperator {
    /// Open an existing file for sequential reading.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>>;

    /// Create (or truncate) a file for writing.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write>>;

    /// Size of a file in bytes.
    fn stat(&self, path: &Path) -> io::Result<u64>;

    /// Whether an error returned by this operator means the file is missing.
    fn is_not_found(&self, err: &io::Error) -> bool {
        err.kind() == io::ErrorKind::NotFound
    }

    /// Whether a file already exists at `path`.
    fn exists(&self, path: &Path) -> bool {
        match self.stat(path) {
            Ok(_) => true,
            Err(e) => !self.is_not_found(&e),
        }
    }
}

/// [`FileOperator`] backed by the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileOperator for LocalFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(File::open(path)?))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }

    fn stat(&self, path: &Path) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }
}
