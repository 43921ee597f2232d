//! The indentation lexer: whitespace/comment skipping, line continuation via
//! ellipsis, indentation-to-block synthesis, and
//! identifier/keyword/number/symbol recognition.
//!
//! String/character literal scanning is deliberately not implemented here:
//! their escape-sequence policy is language-specific and not load-bearing
//! for the indentation/layout algorithm; the [`crate::token::Payload`]
//! variants for them exist for a concrete-grammar extension to populate.

mod reader;


use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use kang_core::{Grammar, TerminalId};

pub use reader::CharReader;

use crate::diagnostics::Diagnostics;
use crate::position::{Position, Span};
use crate::token::{Payload, Token};
use crate::tokenizer::TokenSource;

/// The fixed reserved-word set.
const KEYWORDS: &[&str] = &[
    "abstract", "and", "assures", "at", "break", "case", "catch", "class", "constant", "continue", "default", "each", "else", "ensures",
    "exceptions", "explicit", "finalize", "for", "function", "get", "goto", "if", "implicit", "in", "initialize", "invariants", "is", "not",
    "of", "or", "out", "parameters", "private", "property", "protected", "public", "record", "repeat", "requires", "return", "returns",
    "self", "set", "shared", "switch", "throw", "to", "until", "variables", "while", "xor",
];

/// The fixed single-character symbol alphabet.
const SYMBOLS: &[char] =
    &['+', '-', '×', '÷', '^', '(', ')', '[', ']', '{', '}', '=', '≠', '<', '>', '≤', '≥', '.', ',', ':', '→', '←', '↑', '&'];

#[derive(Debug, Clone, thiserror::Error)]
pub enum LexerError {
    #[error("grammar does not declare the terminal {name:?} required by the indentation lexer")]
    MissingTerminal { name: String },
}

struct TerminalIds {
    identifier: TerminalId,
    integer: TerminalId,
    real: TerminalId,
    open_block: TerminalId,
    close_block: TerminalId,
    end_of_line: TerminalId,
    keywords: HashMap<&'static str, TerminalId>,
    symbols: HashMap<char, TerminalId>,
}

impl TerminalIds {
    fn resolve(grammar: &Grammar) -> Result<Self, LexerError> {
        let get = |name: &str| grammar.terminal_by_name(name).ok_or_else(|| LexerError::MissingTerminal { name: name.to_string() });

        let identifier = get("IDENTIFIER")?;
        let integer = get("INTEGER")?;
        let real = get("REAL")?;
        let open_block = get("OPEN_BLOCK")?;
        let close_block = get("CLOSE_BLOCK")?;
        let end_of_line = get("END_OF_LINE")?;

        let mut keywords = HashMap::with_capacity(KEYWORDS.len());
        for kw in KEYWORDS {
            keywords.insert(*kw, get(kw)?);
        }

        let mut symbols = HashMap::with_capacity(SYMBOLS.len());
        for sym in SYMBOLS {
            symbols.insert(*sym, get(&sym.to_string())?);
        }

        Ok(Self { identifier, integer, real, open_block, close_block, end_of_line, keywords, symbols })
    }
}

/// Concrete lexer for the Kang source language. Implements [`TokenSource`]
/// so it can be driven through [`crate::tokenizer::Tokenizer`].
pub struct IndentationLexer<'src, 'diag> {
    reader: CharReader<'src>,
    terminals: TerminalIds,
    diagnostics: &'diag mut Diagnostics,
    pending: VecDeque<Token>,
    /// True since the last emitted `END_OF_LINE` (or at the very start of
    /// input): the next real token still needs its indentation checked.
    is_first_token: bool,
    just_saw_ellipsis: bool,
    /// Indentation-stack of block columns, initialized with a single `0`.
    block_levels: Vec<u32>,
    line_has_token: bool,
    exhausted: bool,
}

impl<'src, 'diag> IndentationLexer<'src, 'diag> {
    pub fn new(
        grammar: &Grammar,
        source: &'src str,
        source_name: impl Into<Rc<str>>,
        diagnostics: &'diag mut Diagnostics,
    ) -> Result<Self, LexerError> {
        Ok(Self {
            reader: CharReader::new(source, source_name.into()),
            terminals: TerminalIds::resolve(grammar)?,
            diagnostics,
            pending: VecDeque::new(),
            is_first_token: true,
            just_saw_ellipsis: false,
            block_levels: vec![0],
            line_has_token: false,
            exhausted: false,
        })
    }

    /// Runs one step of lexing: may push zero tokens (a malformed number or
    /// character was discarded after reporting a diagnostic, and lexing
    /// continues), one token, or several (indentation changes and/or the
    /// final end-of-input drain can each emit more than one marker).
    fn produce(&mut self) {
        if !self.skip_between_tokens() {
            self.drain_at_eof();
            self.exhausted = true;
            return;
        }

        if self.is_first_token {
            self.is_first_token = false;
            self.handle_indentation();
        }

        self.scan_token();
    }

    /// Returns `true` if real token content is next, `false` at end of input.
    fn skip_between_tokens(&mut self) -> bool {
        loop {
            match self.reader.peek() {
                None => {
                    self.check_ellipsis_not_continued();
                    return false;
                }
                Some('\n') => self.consume_newline(),
                Some('…') => self.consume_ellipsis(),
                Some('-') if self.reader.peek_at(1) == Some('-') => self.consume_comment(),
                Some(c) if c.is_whitespace() => {
                    self.reader.advance();
                }
                Some(_) => {
                    self.check_ellipsis_not_continued();
                    return true;
                }
            }
        }
    }

    fn consume_newline(&mut self) {
        self.reader.advance();
        if self.line_has_token && !self.just_saw_ellipsis {
            self.emit_end_of_line();
            self.is_first_token = true;
        }
        self.just_saw_ellipsis = false;
        self.line_has_token = false;
    }

    fn consume_ellipsis(&mut self) {
        self.reader.advance();
        if self.just_saw_ellipsis {
            self.emit_diagnostic_at_point("ellipsis is not permitted twice on one logical line before a newline");
        } else {
            self.just_saw_ellipsis = true;
        }
    }

    fn consume_comment(&mut self) {
        self.reader.advance();
        self.reader.advance();
        while let Some(c) = self.reader.peek() {
            if c == '\n' {
                break;
            }
            self.reader.advance();
        }
    }

    fn check_ellipsis_not_continued(&mut self) {
        if self.just_saw_ellipsis {
            self.just_saw_ellipsis = false;
            self.emit_diagnostic_at_point("ellipsis must be immediately followed by a newline to continue the line");
        }
    }

    /// Compares the current column against the indentation stack's top,
    /// opening one block on an increase or closing every block the new
    /// column dedents past.
    fn handle_indentation(&mut self) {
        let column = self.reader.column();
        let top = *self.block_levels.last().expect("block_levels is never empty");
        if column > top {
            self.block_levels.push(column);
            self.emit_open_block();
        } else {
            while column < *self.block_levels.last().expect("block_levels is never empty") {
                self.block_levels.pop();
                self.emit_close_block();
            }
        }
    }

    fn drain_at_eof(&mut self) {
        if self.line_has_token {
            self.emit_end_of_line();
        }
        while self.block_levels.len() > 1 {
            self.block_levels.pop();
            self.emit_close_block();
        }
    }

    fn scan_token(&mut self) {
        self.line_has_token = true;
        let start = self.reader.position();
        let Some(c) = self.reader.peek() else { return };
        if c.is_alphabetic() {
            self.scan_identifier_or_keyword(start);
        } else if c.is_ascii_digit() {
            self.scan_number(start);
        } else {
            self.scan_symbol(start);
        }
    }

    fn scan_identifier_or_keyword(&mut self, start: Position) {
        let mut lexeme = String::new();
        while let Some(c) = self.reader.peek() {
            if c.is_alphanumeric() {
                lexeme.push(c);
                self.reader.advance();
            } else {
                break;
            }
        }
        let end = self.reader.position();
        let class = self.terminals.keywords.get(lexeme.as_str()).copied().unwrap_or(self.terminals.identifier);
        self.pending.push_back(Token::new(class, Some(lexeme), Span::new(start, end)));
    }

    fn scan_number(&mut self, start: Position) {
        let mut lexeme = String::new();
        while let Some(c) = self.reader.peek() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.reader.advance();
            } else {
                break;
            }
        }

        let mut is_real = false;
        if self.reader.peek() == Some('.') && self.reader.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_real = true;
            lexeme.push('.');
            self.reader.advance();
            while let Some(c) = self.reader.peek() {
                if c.is_ascii_digit() {
                    lexeme.push(c);
                    self.reader.advance();
                } else {
                    break;
                }
            }
        }

        let mut invalid = false;
        while let Some(c) = self.reader.peek() {
            if c.is_alphabetic() || c == '.' {
                invalid = true;
                lexeme.push(c);
                self.reader.advance();
            } else {
                break;
            }
        }

        let end = self.reader.position();
        let span = Span::new(start, end);
        if invalid {
            self.diagnostics.error(format!("invalid number literal {lexeme:?}"), span).emit();
            return;
        }

        let (class, payload) = if is_real {
            (self.terminals.real, lexeme.parse::<f64>().ok().map(Payload::Real))
        } else {
            (self.terminals.integer, lexeme.parse::<i64>().ok().map(Payload::Integer))
        };
        let mut token = Token::new(class, Some(lexeme), span);
        if let Some(payload) = payload {
            token = token.with_payload(payload);
        }
        self.pending.push_back(token);
    }

    fn scan_symbol(&mut self, start: Position) {
        let c = self.reader.peek().expect("scan_token only calls scan_symbol when a character is present");
        self.reader.advance();
        let end = self.reader.position();
        let span = Span::new(start, end);
        match self.terminals.symbols.get(&c).copied() {
            Some(class) => self.pending.push_back(Token::new(class, Some(c.to_string()), span)),
            None => {
                self.diagnostics.error(format!("invalid character {c:?}"), span).emit();
            }
        }
    }

    fn emit_open_block(&mut self) {
        let pos = self.reader.position();
        self.pending.push_back(Token::new(self.terminals.open_block, None, Span::new(pos.clone(), pos)));
    }

    fn emit_close_block(&mut self) {
        let pos = self.reader.position();
        self.pending.push_back(Token::new(self.terminals.close_block, None, Span::new(pos.clone(), pos)));
    }

    fn emit_end_of_line(&mut self) {
        let pos = self.reader.position();
        self.pending.push_back(Token::new(self.terminals.end_of_line, None, Span::new(pos.clone(), pos)));
    }

    fn emit_diagnostic_at_point(&mut self, message: &str) {
        let pos = self.reader.position();
        self.diagnostics.error(message.to_string(), Span::new(pos.clone(), pos)).emit();
    }
}

impl<'src, 'diag> TokenSource for IndentationLexer<'src, 'diag> {
    fn extract_token(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            if self.exhausted {
                return None;
            }
            self.produce();
        }
    }

    fn position(&self) -> Position {
        self.reader.position()
    }
}
