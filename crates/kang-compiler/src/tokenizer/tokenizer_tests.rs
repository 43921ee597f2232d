use std::rc::Rc;

use kang_core::{GrammarDoc, TerminalDoc, VariableDoc};

use super::{TokenSource, Tokenizer};
use crate::position::{Position, Span};
use crate::token::Token;

struct FixedSource {
    remaining: Vec<Token>,
    position: Position,
}

impl TokenSource for FixedSource {
    fn extract_token(&mut self) -> Option<Token> {
        if self.remaining.is_empty() {
            None
        } else {
            Some(self.remaining.remove(0))
        }
    }

    fn position(&self) -> Position {
        self.position.clone()
    }
}

fn three_tokens() -> Tokenizer<FixedSource> {
    let doc = GrammarDoc {
        start: "S".to_string(),
        terminals: vec![TerminalDoc { name: "T".to_string(), discardable: false }],
        variables: vec![VariableDoc { name: "S".to_string(), rules: vec![vec![]], precedence_blocks: vec![] }],
    };
    let grammar = kang_core::load(&doc).unwrap();
    let class = grammar.terminal_by_name("T").unwrap();
    let name: Rc<str> = Rc::from("<test>");
    let pos = Position::start_of(name);
    let mk = |lexeme: &str| Token::new(class, Some(lexeme.to_string()), Span::new(pos.clone(), pos.clone()));

    Tokenizer::new(FixedSource { remaining: vec![mk("t1"), mk("t2"), mk("t3")], position: pos })
}

fn lexeme(token: &Option<Token>) -> Option<&str> {
    token.as_ref().and_then(Token::token_text)
}

#[test]
fn rollback_replays_tokens_in_original_order() {
    let mut tokenizer = three_tokens();

    tokenizer.begin_transaction();
    assert_eq!(lexeme(&tokenizer.get_token()), Some("t1"));
    assert_eq!(lexeme(&tokenizer.get_token()), Some("t2"));
    tokenizer.rollback_transaction();

    assert_eq!(lexeme(&tokenizer.get_token()), Some("t1"));
    assert_eq!(lexeme(&tokenizer.get_token()), Some("t2"));
    assert_eq!(lexeme(&tokenizer.get_token()), Some("t3"));
    assert_eq!(tokenizer.get_token(), None);
}

#[test]
fn commit_clears_the_buffer_once_the_outermost_transaction_closes() {
    let mut tokenizer = three_tokens();

    tokenizer.begin_transaction();
    tokenizer.get_token();
    tokenizer.commit_transaction();

    assert!(!tokenizer.is_transaction_in_progress());
    assert_eq!(tokenizer.transaction_depth(), 0);
    assert_eq!(lexeme(&tokenizer.get_token()), Some("t2"));
}

#[test]
fn transactions_nest_and_rollback_only_undoes_the_innermost() {
    let mut tokenizer = three_tokens();

    tokenizer.begin_transaction();
    tokenizer.get_token(); // t1
    tokenizer.begin_transaction();
    tokenizer.get_token(); // t2
    assert_eq!(tokenizer.transaction_depth(), 2);

    tokenizer.rollback_transaction(); // undo reading t2 only
    assert_eq!(tokenizer.transaction_depth(), 1);
    assert_eq!(lexeme(&tokenizer.get_token()), Some("t2"));

    tokenizer.rollback_transaction(); // undo everything back to the start
    assert_eq!(lexeme(&tokenizer.get_token()), Some("t1"));
}

#[test]
fn end_of_input_is_buffered_and_replayed_on_rollback() {
    let doc = GrammarDoc {
        start: "S".to_string(),
        terminals: vec![],
        variables: vec![VariableDoc { name: "S".to_string(), rules: vec![vec![]], precedence_blocks: vec![] }],
    };
    kang_core::load(&doc).unwrap();
    let name: Rc<str> = Rc::from("<test>");
    let pos = Position::start_of(name);
    let mut tokenizer = Tokenizer::new(FixedSource { remaining: vec![], position: pos });

    tokenizer.begin_transaction();
    assert_eq!(tokenizer.get_token(), None);
    tokenizer.rollback_transaction();
    assert_eq!(tokenizer.get_token(), None);
}

#[test]
fn reading_without_a_transaction_does_not_buffer() {
    let mut tokenizer = three_tokens();
    assert_eq!(lexeme(&tokenizer.get_token()), Some("t1"));
    assert!(!tokenizer.is_transaction_in_progress());
    // Nothing buffered: a later transaction starts clean from t2 onward.
    tokenizer.begin_transaction();
    assert_eq!(lexeme(&tokenizer.get_token()), Some("t2"));
    tokenizer.rollback_transaction();
    assert_eq!(lexeme(&tokenizer.get_token()), Some("t2"));
}
