//! Diagnostics infrastructure: an owned collection of formatted messages
//! categorized by severity, passed around by `&mut` reference rather than
//! held behind a process-wide global logger.

mod message;
mod printer;


pub use message::Severity;
pub use printer::DiagnosticsPrinter;

use message::{DiagnosticMessage, Fix, RelatedInfo};
use crate::position::Span;

/// Collection of diagnostic messages produced by the lexer or the table
/// builder. Owned by the caller that drives parsing/table construction;
/// never global.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: DiagnosticMessage,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    pub fn error(&mut self, msg: impl Into<String>, span: Span) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder { diagnostics: self, message: DiagnosticMessage::new(Severity::Error, span, msg) }
    }

    pub fn warning(&mut self, msg: impl Into<String>, span: Span) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder { diagnostics: self, message: DiagnosticMessage::new(Severity::Warning, span, msg) }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(DiagnosticMessage::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.messages.iter().any(DiagnosticMessage::is_warning)
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_warning()).count()
    }

    pub fn printer<'a>(&'a self, source: &'a str) -> DiagnosticsPrinter<'a> {
        DiagnosticsPrinter::new(&self.messages, source)
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn related_to(mut self, msg: impl Into<String>, span: Span) -> Self {
        self.message.related.push(RelatedInfo::new(span, msg));
        self
    }

    pub fn fix(mut self, description: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.message.fix = Some(Fix::new(replacement, description));
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
