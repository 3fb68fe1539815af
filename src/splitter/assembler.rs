//! Accumulation of lines into chunk files.

use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::fs::{ChunkNaming, FileOperator};
use crate::scanner::LineKind;
use crate::types::{SplitConfig, SplitError};

/// The chunk file currently receiving flushes.
struct OpenChunk {
    index: usize,
    path: PathBuf,
    writer: Box<dyn Write>,
    size: u64,
}

/// Owns the flush and rotation policy of a split session.
///
/// Lines are buffered in memory and written to the current chunk once
/// enough bytes have accumulated, never right after a line that leaves a
/// record unfinished. A chunk is closed when its size passes the rotation
/// threshold; the next flush opens a new file with the header on top.
pub struct ChunkAssembler<'a, F: FileOperator> {
    fs: &'a F,
    config: &'a SplitConfig,
    naming: ChunkNaming,
    header: Vec<u8>,
    header_complete: bool,
    bulk: Vec<u8>,
    record_open: bool,
    chunk_index: usize,
    current: Option<OpenChunk>,
    outputs: Vec<PathBuf>,
}

impl<'a, F: FileOperator> ChunkAssembler<'a, F> {
    pub fn new(fs: &'a F, config: &'a SplitConfig, naming: ChunkNaming) -> Self {
        Self {
            fs,
            config,
            naming,
            header: Vec::new(),
            header_complete: !config.with_header,
            bulk: Vec::with_capacity(config.read_buffer_size.min(crate::default_read_buffer_size())),
            record_open: false,
            chunk_index: 1,
            current: None,
            outputs: Vec::new(),
        }
    }

    /// Route one classified line to the header or the bulk buffer.
    pub fn push_line(&mut self, line: &[u8], kind: LineKind) -> Result<(), SplitError> {
        if !self.header_complete {
            self.header.extend_from_slice(line);
            if kind.ends_record() {
                self.header_complete = true;
                debug!(header_bytes = self.header.len(), "Captured header");
            }
            return Ok(());
        }

        self.bulk.extend_from_slice(line);
        self.record_open = !kind.ends_record();

        let pending = (self.bulk.len() + self.header.len()) as u64;
        if !self.record_open && pending >= self.config.chunk_byte_size {
            self.flush()?;
        }

        Ok(())
    }

    /// Called after every read buffer has been routed.
    ///
    /// When chunks are at least one buffer large, accumulated lines are
    /// written once per buffer unless a record is still open.
    pub fn end_of_buffer(&mut self) -> Result<(), SplitError> {
        if self.config.is_small_buffer_mode() || self.record_open {
            return Ok(());
        }
        self.flush()
    }

    /// Write the bulk buffer to the current chunk, creating it if needed.
    ///
    /// Nothing is written when the bulk buffer is empty, so no chunk ever
    /// holds only a header.
    pub fn flush(&mut self) -> Result<(), SplitError> {
        if self.bulk.is_empty() {
            return Ok(());
        }

        let needs_new_chunk = self
            .current
            .as_ref()
            .map_or(true, |chunk| chunk.index != self.chunk_index);
        if needs_new_chunk {
            self.open_chunk()?;
        }

        let Some(chunk) = self.current.as_mut() else {
            return Ok(());
        };
        chunk
            .writer
            .write_all(&self.bulk)
            .map_err(|source| SplitError::Write {
                path: chunk.path.clone(),
                source,
            })?;
        chunk.size += self.bulk.len() as u64;

        debug!(
            chunk = chunk.index,
            bytes = self.bulk.len(),
            chunk_size = chunk.size,
            "Flushed bulk buffer"
        );
        self.bulk.clear();

        if chunk.size > self.config.rotation_threshold() {
            self.chunk_index += 1;
            self.close_chunk()?;
        }

        Ok(())
    }

    /// Flush everything left, including `residual` bytes that never got a
    /// terminating newline, and return the chunk paths in creation order.
    pub fn finish(&mut self, residual: &[u8]) -> Result<Vec<PathBuf>, SplitError> {
        self.bulk.extend_from_slice(residual);
        self.flush()?;
        self.close_chunk()?;
        Ok(std::mem::take(&mut self.outputs))
    }

    #[cfg(test)]
    pub(crate) fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    #[cfg(test)]
    pub(crate) fn header(&self) -> &[u8] {
        &self.header
    }

    #[cfg(test)]
    pub(crate) fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    fn open_chunk(&mut self) -> Result<(), SplitError> {
        self.close_chunk()?;

        let path = self.naming.path_for(self.chunk_index);
        if self.fs.exists(&path) {
            warn!(path = %path.display(), "Overwriting existing chunk file");
        }

        let mut writer = self.fs.create(&path).map_err(|source| SplitError::Create {
            path: path.clone(),
            source,
        })?;
        writer
            .write_all(&self.header)
            .map_err(|source| SplitError::Write {
                path: path.clone(),
                source,
            })?;

        info!(chunk = self.chunk_index, path = %path.display(), "Created chunk file");
        self.outputs.push(path.clone());
        self.current = Some(OpenChunk {
            index: self.chunk_index,
            path,
            writer,
            size: self.header.len() as u64,
        });

        Ok(())
    }

    fn close_chunk(&mut self) -> Result<(), SplitError> {
        let Some(mut chunk) = self.current.take() else {
            return Ok(());
        };
        chunk.writer.flush().map_err(|source| SplitError::Write {
            path: chunk.path.clone(),
            source,
        })?;
        debug!(chunk = chunk.index, size = chunk.size, "Closed chunk file");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::io::{self, Read};
    use std::path::Path;
    use std::rc::Rc;

    /// In-memory file system recording every created file.
    #[derive(Default, Clone)]
    pub(crate) struct MemoryFs {
        pub files: Rc<RefCell<BTreeMap<PathBuf, Vec<u8>>>>,
        pub inputs: Rc<RefCell<BTreeMap<PathBuf, Vec<u8>>>>,
    }

    struct MemoryWriter {
        path: PathBuf,
        files: Rc<RefCell<BTreeMap<PathBuf, Vec<u8>>>>,
    }

    impl Write for MemoryWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.files
                .borrow_mut()
                .entry(self.path.clone())
                .or_default()
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl MemoryFs {
        pub fn with_input(path: &str, content: &[u8]) -> Self {
            let fs = Self::default();
            fs.inputs
                .borrow_mut()
                .insert(PathBuf::from(path), content.to_vec());
            fs
        }

        pub fn file(&self, path: &str) -> Vec<u8> {
            self.files
                .borrow()
                .get(Path::new(path))
                .cloned()
                .unwrap_or_default()
        }
    }

    impl FileOperator for MemoryFs {
        fn open(&self, path: &Path) -> io::Result<Box<dyn Read>> {
            let content = self
                .inputs
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
            Ok(Box::new(io::Cursor::new(content)))
        }

        fn create(&self, path: &Path) -> io::Result<Box<dyn Write>> {
            self.files.borrow_mut().insert(path.to_path_buf(), Vec::new());
            Ok(Box::new(MemoryWriter {
                path: path.to_path_buf(),
                files: Rc::clone(&self.files),
            }))
        }

        fn stat(&self, path: &Path) -> io::Result<u64> {
            self.inputs
                .borrow()
                .get(path)
                .or(self.files.borrow().get(path))
                .map(|content| content.len() as u64)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }

    fn naming() -> ChunkNaming {
        ChunkNaming::new(Path::new("in.csv"), Path::new("out"))
    }

    #[test]
    fn test_header_is_written_to_every_chunk() {
        let fs = MemoryFs::default();
        let config = SplitConfig::new(100).with_read_buffer_size(1000);
        let mut assembler = ChunkAssembler::new(&fs, &config, naming());

        let row = [b'x'; 59];
        let mut line = row.to_vec();
        line.push(b'\n');

        assembler.push_line(b"h1,h2\n", LineKind::Complete).unwrap();
        assembler.push_line(&line, LineKind::Complete).unwrap();
        assert!(assembler.outputs().is_empty());
        assembler.push_line(&line, LineKind::Complete).unwrap();
        assert_eq!(assembler.outputs().len(), 1);
        assert_eq!(assembler.chunk_index(), 2);

        assembler.push_line(&line, LineKind::Complete).unwrap();
        let outputs = assembler.finish(b"").unwrap();

        assert_eq!(
            outputs,
            vec![PathBuf::from("out/in_1.csv"), PathBuf::from("out/in_2.csv")]
        );
        let first = fs.file("out/in_1.csv");
        let second = fs.file("out/in_2.csv");
        assert!(first.starts_with(b"h1,h2\n"));
        assert!(second.starts_with(b"h1,h2\n"));
        assert_eq!(first.len(), 6 + 120);
        assert_eq!(second.len(), 6 + 60);
    }

    #[test]
    fn test_broken_line_never_triggers_flush() {
        let fs = MemoryFs::default();
        let config = SplitConfig::new(100)
            .with_header(false)
            .with_read_buffer_size(1000);
        let mut assembler = ChunkAssembler::new(&fs, &config, naming());

        let long = format!("1,\"{}\n", "y".repeat(120));
        assembler.push_line(long.as_bytes(), LineKind::Broken).unwrap();
        assert!(assembler.outputs().is_empty());

        assembler.push_line(b"tail\"\n", LineKind::Completing).unwrap();
        assert_eq!(assembler.outputs().len(), 1);

        let outputs = assembler.finish(b"").unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(fs.file("out/in_1.csv").ends_with(b"tail\"\n"));
    }

    #[test]
    fn test_multiline_header() {
        let fs = MemoryFs::default();
        let config = SplitConfig::new(100).with_read_buffer_size(1000);
        let mut assembler = ChunkAssembler::new(&fs, &config, naming());

        assembler.push_line(b"id,\"multi\n", LineKind::Broken).unwrap();
        assembler.push_line(b"line\"\n", LineKind::Completing).unwrap();
        assert_eq!(assembler.header(), b"id,\"multi\nline\"\n");

        assembler.push_line(b"1,2\n", LineKind::Complete).unwrap();
        let outputs = assembler.finish(b"").unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(fs.file("out/in_1.csv"), b"id,\"multi\nline\"\n1,2\n".to_vec());
    }

    #[test]
    fn test_end_of_buffer_flush_and_rotation() {
        let fs = MemoryFs::default();
        let config = SplitConfig::new(200)
            .with_header(false)
            .with_read_buffer_size(100);
        let mut assembler = ChunkAssembler::new(&fs, &config, naming());

        let line = format!("{}\n", "z".repeat(49));
        assembler.push_line(line.as_bytes(), LineKind::Complete).unwrap();
        assembler.end_of_buffer().unwrap();
        assert_eq!(assembler.outputs().len(), 1);
        assert_eq!(assembler.chunk_index(), 1);

        // An open record defers the flush.
        assembler.push_line(line.as_bytes(), LineKind::Complete).unwrap();
        assembler.push_line(b"1,\"open\n", LineKind::Broken).unwrap();
        assembler.end_of_buffer().unwrap();
        assert_eq!(fs.file("out/in_1.csv").len(), 50);

        assembler.push_line(b"closed\"\n", LineKind::Completing).unwrap();
        assembler.end_of_buffer().unwrap();
        // 50 + 50 + 8 + 8 > 200 - 100
        assert_eq!(assembler.chunk_index(), 2);

        assembler.push_line(line.as_bytes(), LineKind::Complete).unwrap();
        let outputs = assembler.finish(b"").unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(fs.file("out/in_2.csv"), line.as_bytes().to_vec());
    }

    #[test]
    fn test_line_trigger_in_standard_mode() {
        let fs = MemoryFs::default();
        let config = SplitConfig::new(200)
            .with_header(false)
            .with_read_buffer_size(100);
        assert!(!config.is_small_buffer_mode());
        let mut assembler = ChunkAssembler::new(&fs, &config, naming());

        let opening = format!("1,\"{}\n", "a".repeat(146));
        let middle = format!("{}\n", "b".repeat(59));
        assembler.push_line(opening.as_bytes(), LineKind::Broken).unwrap();
        assembler.push_line(middle.as_bytes(), LineKind::Broken).unwrap();
        assert!(assembler.outputs().is_empty());

        // The record closes past the target size, so it is written without
        // waiting for the end of the buffer.
        assembler.push_line(b"end\",2\n", LineKind::Completing).unwrap();
        assert_eq!(assembler.outputs().len(), 1);
        assert_eq!(fs.file("out/in_1.csv").len(), 150 + 60 + 7);
        // 217 > 200 - 100
        assert_eq!(assembler.chunk_index(), 2);

        // Below the target, standard mode waits for the end of the buffer.
        assembler.push_line(b"3,4\n", LineKind::Complete).unwrap();
        assert_eq!(assembler.outputs().len(), 1);
        assembler.end_of_buffer().unwrap();
        assert_eq!(assembler.outputs().len(), 2);
        assert_eq!(fs.file("out/in_2.csv"), b"3,4\n".to_vec());
    }

    #[test]
    fn test_residual_is_flushed_on_finish() {
        let fs = MemoryFs::default();
        let config = SplitConfig::new(500)
            .with_header(false)
            .with_read_buffer_size(1000);
        let mut assembler = ChunkAssembler::new(&fs, &config, naming());

        assembler.push_line(b"a,b\n", LineKind::Complete).unwrap();
        let outputs = assembler.finish(b"c,d").unwrap();
        assert_eq!(outputs, vec![PathBuf::from("out/in_1.csv")]);
        assert_eq!(fs.file("out/in_1.csv"), b"a,b\nc,d".to_vec());
    }

    #[test]
    fn test_empty_session_creates_nothing() {
        let fs = MemoryFs::default();
        let config = SplitConfig::new(500);
        let mut assembler = ChunkAssembler::new(&fs, &config, naming());
        assembler.push_line(b"only,header\n", LineKind::Complete).unwrap();

        let outputs = assembler.finish(b"").unwrap();
        assert!(outputs.is_empty());
        assert!(fs.files.borrow().is_empty());
    }
}
