//! Table builder, parsing driver, indentation lexer, and tokenizer
//! framework for the Kang front-end.
//!
//! Layers, in dependency order:
//!
//! - [`position`] / [`token`] — shared value types (`Position`, `Span`,
//!   `Token`) used by every later layer.
//! - [`diagnostics`] — an owned collection of severity-tagged messages with
//!   a rendering printer, passed by `&mut` reference rather than held in a
//!   global.
//! - [`tokenizer`] — the transactional [`tokenizer::Tokenizer`] wrapper
//!   any [`tokenizer::TokenSource`] can be driven through.
//! - [`lexer`] — [`lexer::IndentationLexer`], a concrete `TokenSource` that
//!   turns Kang source text into a token stream with synthesized
//!   `OPEN_BLOCK`/`CLOSE_BLOCK`/`END_OF_LINE` markers.
//! - [`tables`] — builds canonical LR(1) ACTION/GOTO tables from a
//!   [`kang_core::Grammar`].
//! - [`driver`] — drives a token stream against the tables, producing a
//!   parse tree with panic-mode `error`-token recovery.

pub mod diagnostics;
pub mod driver;
pub mod lexer;
pub mod position;
pub mod tables;
pub mod token;
pub mod tokenizer;

pub use diagnostics::{DiagnosticBuilder, Diagnostics, DiagnosticsPrinter, Severity};
pub use driver::{ParseError, ParseTree, Parser};
pub use lexer::{IndentationLexer, LexerError};
pub use position::{Position, Span};
pub use tables::{TableError, Tables};
pub use token::{Payload, Token};
pub use tokenizer::{TokenSource, Tokenizer};
