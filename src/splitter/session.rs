//! Per-run state and the read loop of a split.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::assembler::ChunkAssembler;
use super::reassembler::LineReassembler;
use crate::fs::{ChunkNaming, FileOperator};
use crate::scanner::{classify_line, ColumnScanner};
use crate::types::{SplitConfig, SplitError};

/// Lifecycle of a split session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No line has been classified yet; the baseline column count is unknown.
    AwaitingFirstBuffer,
    /// Buffers are being read, reassembled and routed.
    StreamingLines,
    /// The input is exhausted and the remaining bytes are being written.
    Draining,
    /// All chunks are finalized.
    Done,
}

/// Mutable state of one split run.
pub struct SplitSession<'a, F: FileOperator> {
    config: &'a SplitConfig,
    source: PathBuf,
    state: SessionState,
    baseline_columns: Option<usize>,
    first_record: ColumnScanner,
    reassembler: LineReassembler,
    assembler: ChunkAssembler<'a, F>,
}

impl<'a, F: FileOperator> SplitSession<'a, F> {
    /// Create a session writing chunks through `fs`.
    ///
    /// `source` only labels errors and log events.
    pub fn new(fs: &'a F, config: &'a SplitConfig, source: &Path, naming: ChunkNaming) -> Self {
        Self {
            config,
            source: source.to_path_buf(),
            state: SessionState::AwaitingFirstBuffer,
            baseline_columns: None,
            first_record: ColumnScanner::new(config.separator),
            reassembler: LineReassembler::new(),
            assembler: ChunkAssembler::new(fs, config, naming),
        }
    }

    /// Drive the session until the input is exhausted.
    ///
    /// Returns the produced chunk paths in creation order. The first error
    /// aborts the run; chunks written before it are left in place.
    pub fn run<R: Read>(mut self, mut reader: R) -> Result<Vec<PathBuf>, SplitError> {
        info!(
            source = %self.source.display(),
            chunk_byte_size = self.config.chunk_byte_size,
            read_buffer_size = self.config.read_buffer_size,
            with_header = self.config.with_header,
            "Starting split"
        );

        let mut buffer = vec![0u8; self.config.read_buffer_size];
        let mut outputs = Vec::new();

        loop {
            self.state = match self.state {
                SessionState::AwaitingFirstBuffer | SessionState::StreamingLines => {
                    let read = self.read_buffer(&mut reader, &mut buffer)?;
                    if read == 0 {
                        SessionState::Draining
                    } else {
                        self.process_buffer(&buffer[..read])?;
                        if self.baseline_columns.is_some() {
                            SessionState::StreamingLines
                        } else {
                            SessionState::AwaitingFirstBuffer
                        }
                    }
                }
                SessionState::Draining => {
                    outputs = self.drain()?;
                    SessionState::Done
                }
                SessionState::Done => break,
            };
        }

        info!(
            source = %self.source.display(),
            chunks = outputs.len(),
            "Split complete"
        );

        Ok(outputs)
    }

    fn read_buffer<R: Read>(&self, reader: &mut R, buffer: &mut [u8]) -> Result<usize, SplitError> {
        loop {
            match reader.read(buffer) {
                Ok(read) => return Ok(read),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(SplitError::Read {
                        path: self.source.clone(),
                        source,
                    })
                }
            }
        }
    }

    /// Route the lines of one read buffer.
    fn process_buffer(&mut self, buffer: &[u8]) -> Result<(), SplitError> {
        if let Some(baseline) = self.baseline_columns {
            return self.route(buffer, baseline);
        }

        // The baseline needs the whole first record, which may span buffers.
        // The carried bytes are a prefix of `data`, so the scan resumes
        // where the previous buffer left off.
        let mut data = self.reassembler.take_pending();
        data.extend_from_slice(buffer);

        let scan = self.first_record.resume(&data);
        if !scan.terminated {
            self.reassembler.carry(data);
            return Ok(());
        }

        debug!(columns = scan.columns, "Established baseline column count");
        self.baseline_columns = Some(scan.columns);
        self.route(&data, scan.columns)
    }

    fn route(&mut self, buffer: &[u8], baseline: usize) -> Result<(), SplitError> {
        let separator = self.config.separator;
        let assembler = &mut self.assembler;

        self.reassembler.reassemble(buffer, |line| {
            let kind = classify_line(line, separator, baseline);
            assembler.push_line(line, kind)
        })?;

        self.assembler.end_of_buffer()
    }

    /// Write the carried fragment and everything still buffered.
    fn drain(&mut self) -> Result<Vec<PathBuf>, SplitError> {
        let residual = self.reassembler.take_pending();
        self.assembler.finish(&residual)
    }
}
