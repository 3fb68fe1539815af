//! Quote-aware scanning of delimited lines.
//!
//! A line is compared against the column count of the first record of the
//! stream. Lines whose count differs are either a continuation of a quoted
//! field that spans several physical lines, or the line that closes such a
//! field.
//!
//! Quoting rules:
//! - a `"` opens a quoted field only at the start of the scanned content or
//!   right after an unquoted separator; spaces in between are ignored
//! - inside a quoted field `""` is an escaped quote, any other `"` closes it
//! - a `"` anywhere else is ordinary data

const QUOTE: u8 = b'"';
const NEWLINE: u8 = b'\n';
const SPACE: u8 = b' ';

/// Classification of a physical line relative to the baseline column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A standalone record.
    Complete,
    /// Closes a quoted field left open by earlier lines.
    Completing,
    /// Part of a record that continues on the next line.
    Broken,
}

impl LineKind {
    /// Whether a record may end after this line.
    pub fn ends_record(self) -> bool {
        !matches!(self, LineKind::Broken)
    }
}

/// Result of scanning content for its first record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnScan {
    /// Number of fully closed columns.
    pub columns: usize,
    /// Whether the scan stopped at a newline outside any quoted field.
    pub terminated: bool,
}

/// What a single scanning step ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Separator,
    Newline,
    QuotedNewline,
    Data,
}

/// Single forward pass over bytes, tracking quote state.
#[derive(Debug)]
struct QuoteTracker {
    separator: u8,
    in_quotes: bool,
    after_separator: bool,
    quotes: usize,
}

impl QuoteTracker {
    fn new(separator: u8) -> Self {
        Self {
            separator,
            in_quotes: false,
            after_separator: true,
            quotes: 0,
        }
    }

    /// Consume the byte at `pos` (two bytes for an escaped quote) and return
    /// the number of bytes consumed with the token found.
    fn step(&mut self, content: &[u8], pos: usize) -> (usize, Token) {
        let byte = content[pos];

        if self.in_quotes {
            if byte == QUOTE {
                self.quotes += 1;
                if content.get(pos + 1) == Some(&QUOTE) {
                    self.quotes += 1;
                    return (2, Token::Data);
                }
                self.in_quotes = false;
                return (1, Token::Data);
            }
            if byte == NEWLINE {
                return (1, Token::QuotedNewline);
            }
            return (1, Token::Data);
        }

        match byte {
            QUOTE => {
                self.quotes += 1;
                if self.after_separator {
                    self.in_quotes = true;
                }
                self.after_separator = false;
                (1, Token::Data)
            }
            NEWLINE => (1, Token::Newline),
            b if b == self.separator => {
                self.after_separator = true;
                (1, Token::Separator)
            }
            SPACE => (1, Token::Data),
            _ => {
                self.after_separator = false;
                (1, Token::Data)
            }
        }
    }
}

/// Scan `content` up to the first newline outside a quoted field.
///
/// When the content ends inside an open quoted field the last column is not
/// counted.
pub fn scan_columns(content: &[u8], separator: u8) -> ColumnScan {
    ColumnScanner::new(separator).advance(content, true)
}

/// Resumable form of [`scan_columns`] for a first record that arrives over
/// several reads.
///
/// Each call only examines the bytes appended since the previous one.
#[derive(Debug)]
pub struct ColumnScanner {
    tracker: QuoteTracker,
    columns: usize,
    scanned: usize,
}

impl ColumnScanner {
    pub fn new(separator: u8) -> Self {
        Self {
            tracker: QuoteTracker::new(separator),
            columns: 1,
            scanned: 0,
        }
    }

    /// Continue the scan over `content`, which must start with the bytes
    /// passed to earlier calls.
    ///
    /// `columns` is only final once `terminated` is set.
    pub fn resume(&mut self, content: &[u8]) -> ColumnScan {
        self.advance(content, false)
    }

    fn advance(&mut self, content: &[u8], complete: bool) -> ColumnScan {
        let mut terminated = false;

        while self.scanned < content.len() {
            let pos = self.scanned;
            // A quote at the very end may still be the first half of `""`.
            if !complete
                && self.tracker.in_quotes
                && content[pos] == QUOTE
                && pos + 1 == content.len()
            {
                break;
            }

            let (consumed, token) = self.tracker.step(content, pos);
            match token {
                Token::Separator => self.columns += 1,
                Token::Newline => {
                    terminated = true;
                    break;
                }
                Token::QuotedNewline | Token::Data => {}
            }
            self.scanned += consumed;
        }

        ColumnScan {
            columns: self.columns - usize::from(self.tracker.in_quotes),
            terminated,
        }
    }
}

/// Number of completed columns in the first record of `content`.
pub fn count_completed_columns(content: &[u8], separator: u8) -> usize {
    scan_columns(content, separator).columns
}

/// Whether `line` closes a quoted field opened on a previous line.
///
/// The line completes a field when it leaves no quote open and holds an odd
/// number of quote characters: one closing quote plus any number of
/// self-contained quoted values.
pub fn is_completing_line(line: &[u8], separator: u8) -> bool {
    let mut tracker = QuoteTracker::new(separator);
    let mut pos = 0;

    while pos < line.len() {
        let (consumed, token) = tracker.step(line, pos);
        match token {
            Token::QuotedNewline => return false,
            Token::Newline => break,
            Token::Separator | Token::Data => {}
        }
        pos += consumed;
    }

    !tracker.in_quotes && tracker.quotes % 2 == 1
}

/// Classify a physical line against the baseline column count.
pub fn classify_line(line: &[u8], separator: u8, baseline_columns: usize) -> LineKind {
    if count_completed_columns(line, separator) == baseline_columns {
        LineKind::Complete
    } else if is_completing_line(line, separator) {
        LineKind::Completing
    } else {
        LineKind::Broken
    }
}
