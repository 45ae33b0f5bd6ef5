//! Forward-only line cursor with a single line of pushback.
//!
//! The export is read strictly forward except that a caller may push the most
//! recently returned line back once, which is enough for one-line-lookahead
//! parsing without buffering the whole file.

use std::io::BufRead;

use dvh_model::Result;

/// Known non-ASCII spellings in exports, substituted before the remaining
/// non-ASCII bytes are dropped. Exports are sometimes Latin-1, so the cubic
/// centimeter symbol may arrive as a replacement character after lossy
/// decoding.
const SUBSTITUTIONS: [(&str, &str); 3] = [("cm\u{b3}", "cc"), ("cm\u{fffd}", "cc"), ("\u{b3}", "3")];

fn normalize_line(bytes: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    for (from, to) in SUBSTITUTIONS {
        if text.contains(from) {
            text = text.replace(from, to);
        }
    }
    text.retain(|ch| ch.is_ascii() && ch != '\n' && ch != '\r');
    text
}

/// Buffered line reader over the export text.
pub struct LineCursor<R: BufRead> {
    reader: R,
    line_number: usize,
    last: Option<String>,
    stepped_back: bool,
}

impl<R: BufRead> LineCursor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            last: None,
            stepped_back: false,
        }
    }

    /// 1-based number of the line most recently returned.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Returns the next logical line, or `None` at end of input.
    ///
    /// After [`backstep`](Self::backstep) this returns the previously
    /// returned line again instead of advancing.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        if self.stepped_back {
            self.stepped_back = false;
            return Ok(self.last.clone());
        }
        let mut buf = Vec::new();
        let read = self.reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            self.last = None;
            return Ok(None);
        }
        self.line_number += 1;
        let line = normalize_line(&buf);
        self.last = Some(line.clone());
        Ok(Some(line))
    }

    /// Pushes the most recently returned line back; the next
    /// [`next_line`](Self::next_line) returns it again. Idempotent until the
    /// line is re-read, and a no-op before the first read.
    pub fn backstep(&mut self) {
        if self.last.is_some() {
            self.stepped_back = true;
        }
    }

    /// Collects lines until a stop condition.
    ///
    /// With no break condition, reading stops at (and consumes) the first
    /// blank line. With a break substring, reading stops at the first line
    /// containing it and that line is pushed back for the next read. End of
    /// input stops either mode.
    pub fn read_lines(&mut self, break_condition: Option<&str>) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line()? {
            match break_condition {
                None if line.trim().is_empty() => break,
                Some(marker) if line.contains(marker) => {
                    self.backstep();
                    break;
                }
                _ => lines.push(line),
            }
        }
        Ok(lines)
    }
}
