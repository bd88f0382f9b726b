//! Text location tracking for parser diagnostics
//!
//! The only text this toolkit ever parses is the IR's own printed form,
//! so locations carry just a line and column, no filename.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in IR text (line and column are 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextLocation {
    pub line: u32,
    pub column: u32,
}

impl TextLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// The start of the text
    pub fn start() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Helper for tracking locations while scanning text
#[derive(Debug, Clone)]
pub struct LocationTracker {
    line: u32,
    column: u32,
}

impl LocationTracker {
    pub fn new() -> Self {
        Self { line: 1, column: 1 }
    }

    /// Get current location
    pub fn location(&self) -> TextLocation {
        TextLocation::new(self.line, self.column)
    }

    /// Advance by one character
    pub fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new()
    }
}
