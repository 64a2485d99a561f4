//! Line/column bookkeeping for byte offsets.

use rowan::{TextRange, TextSize};
use serde::Serialize;

/// A 0-based line and column. Columns count bytes from the line start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// A source range expressed as start and end line/column pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub start: LineCol,
    pub end: LineCol,
}

/// Maps byte offsets to line/column positions.
///
/// Built once per source text; lookups are a binary search over the
/// recorded line starts.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(TextSize::from(offset as u32 + 1));
            }
        }
        LineIndex {
            line_starts,
            len: TextSize::from(text.len() as u32),
        }
    }

    /// Number of lines (a trailing newline starts a new, empty line).
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Position of `offset`. Offsets past the end clamp to the end.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let col = offset - self.line_starts[line];
        LineCol {
            line: line as u32,
            col: col.into(),
        }
    }

    pub fn location(&self, range: TextRange) -> Location {
        Location {
            start: self.line_col(range.start()),
            end: self.line_col(range.end()),
        }
    }

    /// Inverse of [`LineIndex::line_col`]. Returns `None` for lines that do
    /// not exist; columns past the line end clamp to the end of the text.
    pub fn offset(&self, pos: LineCol) -> Option<TextSize> {
        let start = *self.line_starts.get(pos.line as usize)?;
        Some((start + TextSize::from(pos.col)).min(self.len))
    }
}
