//! Output path naming for chunk files.

use std::path::{Path, PathBuf};

/// Derive the base name and extension of an input path.
///
/// `path/to/file.txt` yields `("file", Some("txt"))` and a name without an
/// extension yields `(name, None)`.
pub fn split_file_name(path: &Path) -> (String, Option<String>) {
    let base_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned());

    (base_name, extension)
}

/// Builds `{base_name}_{index}.{extension}` paths under an output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkNaming {
    output_dir: PathBuf,
    base_name: String,
    extension: Option<String>,
}

impl ChunkNaming {
    /// Create the naming scheme for chunks of `input` written to `output_dir`.
    ///
    /// An empty output directory means the current location.
    pub fn new(input: &Path, output_dir: &Path) -> Self {
        let (base_name, extension) = split_file_name(input);
        Self {
            output_dir: output_dir.to_path_buf(),
            base_name,
            extension,
        }
    }

    /// Path of the chunk with the given 1-based index.
    pub fn path_for(&self, index: usize) -> PathBuf {
        let file_name = match &self.extension {
            Some(ext) => format!("{}_{}.{}", self.base_name, index, ext),
            None => format!("{}_{}", self.base_name, index),
        };
        self.output_dir.join(file_name)
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}
