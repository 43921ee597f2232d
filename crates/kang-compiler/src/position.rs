//! `Position` and `Span`, shared by the tokenizer, lexer, and diagnostics
//! modules.
//!
//! `Position` is an opaque `(source name, line, column)` triple, 0-based;
//! it additionally carries a byte offset into the source so
//! `diagnostics::DiagnosticsPrinter` can hand `annotate-snippets` a byte
//! range without re-scanning the source to translate line/column back to an
//! offset. The offset is crate-private — it is an implementation detail of
//! diagnostic rendering, not part of the public contract.

use std::rc::Rc;

/// A 0-based `(source name, line, column)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub source_name: Rc<str>,
    pub line: u32,
    pub column: u32,
    pub(crate) offset: usize,
}

impl Position {
    pub fn start_of(source_name: Rc<str>) -> Self {
        Self { source_name, line: 0, column: 0, offset: 0 }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.source_name, self.line + 1, self.column + 1)
    }
}

/// A half-open `[start, end)` range over two `Position`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}
