//! The `Token` value produced by the tokenizer framework and the
//! indentation lexer: opaque to the parser except for its token class,
//! optional lexeme, and start/end span. The indentation lexer additionally
//! attaches a typed payload to literal tokens.

use kang_core::TerminalId;

use crate::position::Span;

/// The typed payload a literal token may carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Integer(i64),
    Real(f64),
    /// Reserved for a concrete-grammar extension that scans character
    /// literals; this crate's lexer never constructs it.
    Character(char),
    /// Reserved for a concrete-grammar extension that scans string
    /// literals; this crate's lexer never constructs it.
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub class: TerminalId,
    pub lexeme: Option<String>,
    pub span: Span,
    pub payload: Option<Payload>,
}

impl Token {
    pub fn new(class: TerminalId, lexeme: Option<String>, span: Span) -> Self {
        Self { class, lexeme, span, payload: None }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn token_text(&self) -> Option<&str> {
        self.lexeme.as_deref()
    }
}
