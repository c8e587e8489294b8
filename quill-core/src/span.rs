//! Source locations.

use std::fmt;

/// Identifies one source unit (file) of a compilation.
///
/// Struct compatibility and private-definition visibility compare file
/// ids, so two units must never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<file {}>", self.0)
    }
}

/// Byte range plus 1-based line/column of its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Span {
            file,
            start,
            end,
            line: 1,
            column: start + 1,
        }
    }

    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Span used for definitions that do not come from any source file.
    pub fn builtin() -> Self {
        Span {
            file: FileId(u32::MAX),
            start: 0,
            end: 0,
            line: 0,
            column: 0,
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.file == FileId(u32::MAX)
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        if other.start < self.start {
            return other.to(self);
        }
        Span {
            end: self.end.max(other.end),
            ..self
        }
    }
}
