//! Reassembly of physical lines across read buffer boundaries.

use std::mem;

use memchr::memchr;

/// Splits read buffers into `\n`-terminated lines.
///
/// The unterminated tail of a buffer is carried as the "broken line" and
/// prefixed onto the first line of the next buffer, so a line may span any
/// number of reads.
#[derive(Debug, Default)]
pub struct LineReassembler {
    broken_line: Vec<u8>,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read buffer, calling `on_line` for every completed line.
    ///
    /// Each line passed to `on_line` ends with `\n`. The trailing fragment of
    /// `buffer` becomes the new broken line, even when it is empty.
    pub fn reassemble<E>(
        &mut self,
        buffer: &[u8],
        mut on_line: impl FnMut(&[u8]) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut rest = buffer;

        if !self.broken_line.is_empty() {
            match memchr(b'\n', rest) {
                Some(pos) => {
                    let mut line = mem::take(&mut self.broken_line);
                    line.extend_from_slice(&rest[..=pos]);
                    on_line(&line)?;
                    rest = &rest[pos + 1..];

                    line.clear();
                    self.broken_line = line;
                }
                None => {
                    self.broken_line.extend_from_slice(rest);
                    return Ok(());
                }
            }
        }

        while let Some(pos) = memchr(b'\n', rest) {
            on_line(&rest[..=pos])?;
            rest = &rest[pos + 1..];
        }

        self.broken_line.clear();
        self.broken_line.extend_from_slice(rest);
        Ok(())
    }

    /// Bytes carried over from previous buffers.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> &[u8] {
        &self.broken_line
    }

    /// Take the carried bytes, leaving the reassembler empty.
    pub fn take_pending(&mut self) -> Vec<u8> {
        mem::take(&mut self.broken_line)
    }

    /// Replace the carried bytes.
    pub fn carry(&mut self, bytes: Vec<u8>) {
        self.broken_line = bytes;
    }
}
