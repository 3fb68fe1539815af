//! Streaming, quote-aware splitting of delimited files into chunks.
//!
//! The input is read in bounded buffers. Each buffer is cut into physical
//! lines ([`LineReassembler`]), every line is classified against the column
//! count of the first record ([`crate::scanner`]), and lines are accumulated
//! into size-bounded chunk files ([`ChunkAssembler`]) that never end in the
//! middle of a quoted multi-line field.

mod assembler;
mod reassembler;
mod session;

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

pub use assembler::ChunkAssembler;
pub use reassembler::LineReassembler;
pub use session::{SessionState, SplitSession};

use crate::fs::{ChunkNaming, FileOperator, LocalFileSystem};
use crate::types::{SplitConfig, SplitError};

/// Splits delimited files into chunks of roughly `chunk_byte_size` bytes.
///
/// Each call to [`Splitter::split`] or [`Splitter::split_reader`] runs an
/// independent session; the splitter itself holds no per-run state.
#[derive(Debug, Clone)]
pub struct Splitter<F: FileOperator = LocalFileSystem> {
    config: SplitConfig,
    fs: F,
}

impl Splitter {
    /// Create a splitter working on the local file system.
    pub fn new(config: SplitConfig) -> Self {
        Self::with_file_operator(config, LocalFileSystem)
    }
}

impl<F: FileOperator> Splitter<F> {
    /// Create a splitter using a custom file operator.
    pub fn with_file_operator(config: SplitConfig, fs: F) -> Self {
        Self { config, fs }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Split the file at `input` into chunks written under `output_dir`.
    ///
    /// Chunks are named `{base_name}_{n}.{extension}` after the input file,
    /// starting at 1.
    pub fn split(
        &self,
        input: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>, SplitError> {
        let input = input.as_ref();
        self.config.validate()?;

        let input_size = self.fs.stat(input).map_err(|source| SplitError::Stat {
            path: input.to_path_buf(),
            source,
        })?;
        self.check_source_size(input_size)?;

        let reader = self.fs.open(input).map_err(|source| SplitError::Open {
            path: input.to_path_buf(),
            source,
        })?;

        self.run(reader, input, output_dir.as_ref())
    }

    /// Split a sequential byte stream.
    ///
    /// `input_name` provides the chunk naming stem (e.g. `orders.csv`). The
    /// size check only runs when `size_hint` is known.
    pub fn split_reader<R: Read>(
        &self,
        reader: R,
        input_name: impl AsRef<Path>,
        size_hint: Option<u64>,
        output_dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>, SplitError> {
        self.config.validate()?;
        match size_hint {
            Some(size) => self.check_source_size(size)?,
            None => debug!("Input size unknown, skipping size check"),
        }

        self.run(reader, input_name.as_ref(), output_dir.as_ref())
    }

    fn check_source_size(&self, input_size: u64) -> Result<(), SplitError> {
        if input_size <= self.config.chunk_byte_size {
            return Err(SplitError::SourceSize {
                input_size,
                chunk_byte_size: self.config.chunk_byte_size,
            });
        }
        Ok(())
    }

    fn run<R: Read>(
        &self,
        reader: R,
        input: &Path,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SplitError> {
        let naming = ChunkNaming::new(input, output_dir);
        debug!(
            base_name = naming.base_name(),
            extension = naming.extension().unwrap_or_default(),
            output_dir = %output_dir.display(),
            "Resolved chunk naming"
        );
        SplitSession::new(&self.fs, &self.config, input, naming).run(reader)
    }
}
