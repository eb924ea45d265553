//! Record-sequence parser.
//!
//! Turns a line-oriented text stream into a lazy sequence of JSON
//! records. Two framings are supported and auto-detected from the
//! first line:
//!
//! - **LF mode**: one JSON document per line (blank lines skipped).
//! - **RS mode**: each record is prefixed by an ASCII Record Separator
//!   (0x1E) and may span multiple physical lines.
//!
//! Detection happens once; mixed framing within one stream is
//! undefined. Nothing is read from the underlying reader until the
//! sequence is pulled, and parse failures surface on the element that
//! carries them, not before.

use std::io::{BufRead, Lines};
use std::mem;

use crate::error::PipelineError;
use crate::record::Record;

/// ASCII Record Separator, the RS-mode record prefix.
pub const RS: char = '\u{1e}';

enum Mode {
    Rs,
    Lf,
}

/// Lazy record sequence over a buffered reader. Single-pass.
pub struct RecordSeq<R: BufRead> {
    lines: Lines<R>,
    mode: Option<Mode>,
    /// Physical line most recently read, 1-based.
    line_no: usize,
    /// RS-mode accumulation buffer and the line its record started on.
    buffer: String,
    buffer_line: usize,
    done: bool,
}

/// Parse records from a reader. Framing is detected from the first line.
pub fn records<R: BufRead>(reader: R) -> RecordSeq<R> {
    RecordSeq {
        lines: reader.lines(),
        mode: None,
        line_no: 0,
        buffer: String::new(),
        buffer_line: 0,
        done: false,
    }
}

impl<R: BufRead> RecordSeq<R> {
    fn read_line(&mut self) -> Option<std::io::Result<String>> {
        let next = self.lines.next();
        if next.is_some() {
            self.line_no += 1;
        }
        next
    }

    /// Next raw record text and the line it started on.
    ///
    /// Blank chunks never surface: LF mode skips blank lines, RS mode
    /// drops blank accumulation buffers (a stray leading separator with
    /// no content yields nothing, mid-stream or at end of input).
    fn next_chunk(&mut self) -> Option<Result<(usize, String), PipelineError>> {
        if self.done {
            return None;
        }
        loop {
            match self.mode {
                None => {
                    let line = match self.read_line() {
                        None => {
                            self.done = true;
                            return None;
                        }
                        Some(Err(e)) => {
                            self.done = true;
                            return Some(Err(e.into()));
                        }
                        Some(Ok(line)) => line,
                    };
                    if let Some(rest) = line.strip_prefix(RS) {
                        self.mode = Some(Mode::Rs);
                        self.buffer = rest.to_string();
                        self.buffer_line = self.line_no;
                    } else {
                        self.mode = Some(Mode::Lf);
                        if !line.trim().is_empty() {
                            return Some(Ok((self.line_no, line)));
                        }
                    }
                }
                Some(Mode::Lf) => match self.read_line() {
                    None => {
                        self.done = true;
                        return None;
                    }
                    Some(Err(e)) => {
                        self.done = true;
                        return Some(Err(e.into()));
                    }
                    Some(Ok(line)) => {
                        if !line.trim().is_empty() {
                            return Some(Ok((self.line_no, line)));
                        }
                    }
                },
                Some(Mode::Rs) => match self.read_line() {
                    None => {
                        self.done = true;
                        let pending = mem::take(&mut self.buffer);
                        if pending.trim().is_empty() {
                            return None;
                        }
                        return Some(Ok((self.buffer_line, pending)));
                    }
                    Some(Err(e)) => {
                        self.done = true;
                        return Some(Err(e.into()));
                    }
                    Some(Ok(line)) => {
                        if let Some(rest) = line.strip_prefix(RS) {
                            let pending = mem::take(&mut self.buffer);
                            let pending_line = self.buffer_line;
                            self.buffer = rest.to_string();
                            self.buffer_line = self.line_no;
                            if !pending.trim().is_empty() {
                                return Some(Ok((pending_line, pending)));
                            }
                        } else {
                            if !self.buffer.is_empty() {
                                self.buffer.push('\n');
                            }
                            self.buffer.push_str(&line);
                        }
                    }
                },
            }
        }
    }
}

impl<R: BufRead> Iterator for RecordSeq<R> {
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (line, text) = match self.next_chunk()? {
            Ok(chunk) => chunk,
            Err(e) => return Some(Err(e)),
        };
        Some(
            serde_json::from_str(&text)
                .map_err(|source| PipelineError::MalformedRecord { line, source }),
        )
    }
}
