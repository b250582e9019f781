//! File handles and declaration locations.

use std::fmt;

#[cfg(feature = "interchange")]
use serde::{Deserialize, Serialize};

/// Handle for a loaded source file (binding declaration or library header).
///
/// Paths live in [`crate::hir::SourceRoot`]; everything downstream of the
/// loader only carries this 4-byte id.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct FileId(pub u32);

impl FileId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// A point in a source file: file plus 0-indexed line and column.
///
/// Displayed 1-indexed (`file#0:3:5`), the way compilers print positions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
#[cfg_attr(feature = "interchange", derive(Serialize, Deserialize))]
pub struct SourceLocation {
    pub file: FileId,
    pub line: u32,
    pub col: u32,
}

impl SourceLocation {
    pub const fn new(file: FileId, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }

    /// 1-indexed line for display.
    pub const fn display_line(self) -> u32 {
        self.line + 1
    }

    /// 1-indexed column for display.
    pub const fn display_col(self) -> u32 {
        self.col + 1
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}:{}", self.file, self.display_line(), self.display_col())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.display_line(), self.display_col())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display_is_one_indexed() {
        let loc = SourceLocation::new(FileId::new(2), 0, 4);
        assert_eq!(loc.to_string(), "file#2:1:5");
    }

    #[test]
    fn test_location_ordering_follows_file_then_line() {
        let a = SourceLocation::new(FileId::new(0), 9, 0);
        let b = SourceLocation::new(FileId::new(1), 0, 0);
        let c = SourceLocation::new(FileId::new(1), 3, 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_file_id_size() {
        assert_eq!(std::mem::size_of::<FileId>(), 4);
    }
}
