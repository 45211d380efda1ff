//! Source position tracking for compiled instructions
//!
//! Every bytecode instruction is produced by a run of one or more adjacent
//! source operators. A span records the half-open byte range of that run
//! together with the 0-based line and column of its first character.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of the operator run that produced one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Byte offset of the first operator in the run
    pub begin: usize,
    /// One past the byte offset of the last operator in the run
    pub end: usize,
    /// 0-based line of the first operator
    pub line: usize,
    /// 0-based column of the first operator
    pub column: usize,
}

impl SourceSpan {
    pub fn new(begin: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            begin,
            end,
            line,
            column,
        }
    }

    /// Span covering a single byte.
    pub fn at(pos: usize, line: usize, column: usize) -> Self {
        Self::new(pos, pos + 1, line, column)
    }

    /// Span for an instruction with no source counterpart.
    pub fn synthetic() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Extend the run to cover up to `end` (exclusive). Start position and
    /// line/column stay pinned to the first operator.
    pub fn extend_to(&mut self, end: usize) {
        self.end = end;
    }

    /// Combine with a later span, keeping this span's start position.
    pub fn merge(&self, other: &SourceSpan) -> SourceSpan {
        SourceSpan::new(self.begin, other.end.max(self.end), self.line, self.column)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 1-based for human-facing messages
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}
