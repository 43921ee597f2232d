//! A sequential character reader with one-character (and two-character)
//! lookahead, tracking line/column as it goes.
//!
//! `peek`/`peek_at` act as pushback: nothing is consumed until `advance` is
//! called, so callers can look ahead without committing to it.

use std::rc::Rc;

use crate::position::Position;

pub struct CharReader<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    index: usize,
    line: u32,
    column: u32,
    source_name: Rc<str>,
}

impl<'a> CharReader<'a> {
    pub fn new(source: &'a str, source_name: Rc<str>) -> Self {
        Self { source, chars: source.char_indices().collect(), index: 0, line: 0, column: 0, source_name }
    }

    pub fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).map(|&(_, c)| c)
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    fn byte_offset(&self) -> usize {
        self.chars.get(self.index).map(|&(o, _)| o).unwrap_or(self.source.len())
    }

    pub fn position(&self) -> Position {
        Position { source_name: self.source_name.clone(), line: self.line, column: self.column, offset: self.byte_offset() }
    }

    /// Consumes and returns the current character, updating line/column:
    /// `\n` resets column to 0 and increments line; `\t` advances column to
    /// the next multiple of 8; any other character advances column by 1.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        match c {
            '\n' => {
                self.line += 1;
                self.column = 0;
            }
            '\t' => {
                self.column = (self.column / 8 + 1) * 8;
            }
            _ => {
                self.column += 1;
            }
        }
        Some(c)
    }
}
