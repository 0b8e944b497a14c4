//! Source positions for diagnostics.

use std::fmt;

/// A line/column position within template source.
///
/// Lines start at 1. Columns start at 0 and reset to 0 on every newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// The position of the first character of a source string.
    pub fn start() -> Self {
        Position { line: 1, column: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
