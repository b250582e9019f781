//! Byte ranges and their conversion to lines and columns.

pub use text_size::TextRange;
pub use text_size::TextSize;

use super::location::{FileId, SourceLocation};

/// 0-indexed line/column pair. Columns count UTF-8 bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Maps byte offsets of one source text to [`LineCol`] positions.
#[derive(Clone, Debug)]
pub struct LineIndex {
    /// Offset of the first byte of every line.
    newlines: Vec<TextSize>,
    len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let newlines = std::iter::once(TextSize::from(0))
            .chain(
                text.match_indices('\n')
                    .map(|(offset, _)| TextSize::from(offset as u32 + 1)),
            )
            .collect();

        Self {
            newlines,
            len: TextSize::of(text),
        }
    }

    /// Offsets past the end of the text clamp to the last position.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = self
            .newlines
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);

        LineCol {
            line: line as u32,
            col: u32::from(offset - self.newlines[line]),
        }
    }

    /// Location of the start of `range` inside `file`.
    pub fn location(&self, file: FileId, range: TextRange) -> SourceLocation {
        let pos = self.line_col(range.start());
        SourceLocation::new(file, pos.line, pos.col)
    }

    pub fn line_count(&self) -> usize {
        self.newlines.len()
    }
}
