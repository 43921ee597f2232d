//! The parsing driver (§4.3): runs the shift/reduce loop against a
//! [`Tables`], builds a [`ParseTree`], and implements Yacc-style panic-mode
//! error recovery using the grammar's `@error` terminal together with the
//! tokenizer's transaction rollback.


use kang_core::{Grammar, Reference, RuleId, TerminalId};

use crate::position::{Position, Span};
use crate::tables::{Action, LookaheadTerminal, Tables};
use crate::token::Token;
use crate::tokenizer::{TokenSource, Tokenizer};

#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("token class {0} is not known to the grammar these tables were built from")]
    UnknownToken(TerminalId),
}

/// A parse tree node. Every non-root node is owned by exactly one parent;
/// there is no parent back-pointer (§9's "circular references" design
/// note) — a caller that needs parent traversal builds an index over the
/// tree it already holds.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseTree {
    Terminal(Token),
    Variable { rule: RuleId, children: Vec<ParseTree>, fallback_position: Position },
    Error { token: Token, expected: Vec<TerminalId> },
}

impl ParseTree {
    /// Derived span: a leaf/error node's own token span; a variable node's
    /// span is the union of its children's spans, or `fallback_position`
    /// (collapsed to a point) when it has none.
    pub fn span(&self) -> Span {
        match self {
            ParseTree::Terminal(token) => token.span.clone(),
            ParseTree::Error { token, .. } => token.span.clone(),
            ParseTree::Variable { children, fallback_position, .. } => match (children.first(), children.last()) {
                (Some(first), Some(last)) => Span::new(first.span().start, last.span().end),
                _ => Span::new(fallback_position.clone(), fallback_position.clone()),
            },
        }
    }

    pub fn as_variable(&self) -> Option<(RuleId, &[ParseTree])> {
        match self {
            ParseTree::Variable { rule, children, .. } => Some((*rule, children.as_slice())),
            _ => None,
        }
    }
}

/// Drives a token stream against a [`Tables`] built from `grammar`,
/// producing a [`ParseTree`]. Borrows both rather than owning them (§5:
/// "a single Grammar and its Tables ... may be shared across parses running
/// on different threads") — construct one `Tables` via [`Tables::build`]
/// and reuse it across as many `Parser`s/parses as needed.
pub struct Parser<'g> {
    grammar: &'g Grammar,
    tables: &'g Tables,
    terminal_count: usize,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar, tables: &'g Tables) -> Self {
        Self { grammar, tables, terminal_count: grammar.terminals().count() }
    }

    fn is_known(&self, terminal: TerminalId) -> bool {
        terminal.index() < self.terminal_count
    }

    /// `ACTION[state]`'s domain minus `@error`, for an `Error` node's
    /// `expected_terminals`.
    fn expected_terminals(&self, state: usize) -> Vec<TerminalId> {
        let error_terminal = self.grammar.error_terminal();
        self.tables
            .actions_at(state)
            .filter_map(|(terminal, _)| match terminal {
                LookaheadTerminal::Terminal(id) if id != error_terminal => Some(id),
                _ => None,
            })
            .collect()
    }

    fn effective_terminal(&self, lookahead: &Option<Token>, error_mode: bool, in_transaction: bool) -> Result<LookaheadTerminal, ParseError> {
        if error_mode && !in_transaction {
            return Ok(LookaheadTerminal::Terminal(self.grammar.error_terminal()));
        }
        match lookahead {
            None => Ok(LookaheadTerminal::EndOfInput),
            Some(token) => {
                if !self.is_known(token.class) {
                    return Err(ParseError::UnknownToken(token.class));
                }
                Ok(LookaheadTerminal::Terminal(token.class))
            }
        }
    }

    /// For each RHS reference popped alongside a just-built child: discard
    /// children behind a `preserved = false` terminal reference, and splice
    /// a collapsible variable's (already-collapsed) children in place of
    /// its own node. Applying this once per reduction is enough —
    /// auxiliary variables nested inside other auxiliaries were already
    /// spliced when *they* reduced, so by induction no collapsible node
    /// ever survives to the root (§8 property 4).
    fn collapse_children(&self, references: &[Reference], children: Vec<ParseTree>) -> Vec<ParseTree> {
        let mut result = Vec::with_capacity(children.len());
        for (reference, child) in references.iter().zip(children) {
            match reference {
                Reference::Terminal { preserved, .. } => {
                    if *preserved {
                        result.push(child);
                    }
                }
                Reference::Variable(id) => {
                    if self.grammar.variable(*id).is_collapsible() {
                        match child {
                            ParseTree::Variable { children: grandchildren, .. } => result.extend(grandchildren),
                            other => result.push(other),
                        }
                    } else {
                        result.push(child);
                    }
                }
            }
        }
        result
    }

    /// Pops states/nodes until `ACTION[top, @error]` is defined. Returns
    /// `false` if the stack is exhausted first (unrecoverable).
    fn enter_recovery(&self, states: &mut Vec<usize>, nodes: &mut Vec<ParseTree>) -> bool {
        let error_terminal = LookaheadTerminal::Terminal(self.grammar.error_terminal());
        loop {
            let top = *states.last().expect("states is never empty: it starts with the initial state and is only popped alongside nodes");
            if self.tables.action(top, error_terminal).is_some() {
                return true;
            }
            if states.len() <= 1 {
                return false;
            }
            states.pop();
            nodes.pop();
        }
    }

    /// Unwinds to the last `Error` node, rolls the tokenizer back to the
    /// point it was shifted, discards one token, and reopens a transaction.
    /// Returns `false` if that discard hits end of input and `@end` is
    /// also unaccepted in the (unwound) top state — giving up.
    fn continue_recovery<S: TokenSource>(
        &self,
        states: &mut Vec<usize>,
        nodes: &mut Vec<ParseTree>,
        tokenizer: &mut Tokenizer<S>,
        lookahead: &mut Option<Token>,
    ) -> bool {
        while matches!(nodes.last(), Some(node) if !matches!(node, ParseTree::Error { .. })) {
            nodes.pop();
            states.pop();
        }

        tokenizer.rollback_transaction();
        let discarded = tokenizer.get_token();
        tokenizer.begin_transaction();
        *lookahead = tokenizer.get_token();

        if discarded.is_none() {
            let top = *states.last().expect("an Error node implies at least one state beneath it");
            if self.tables.action(top, LookaheadTerminal::EndOfInput).is_none() {
                return false;
            }
        }
        true
    }

    /// Runs the shift/reduce loop to completion. `Ok(None)` is the
    /// "no tree" outcome: recovery could not resync and the stack (or the
    /// input) was exhausted first.
    pub fn parse<S: TokenSource>(&self, tokenizer: &mut Tokenizer<S>) -> Result<Option<ParseTree>, ParseError> {
        let mut states = vec![self.tables.start_state()];
        let mut nodes: Vec<ParseTree> = Vec::new();
        let mut error_mode = false;
        let mut lookahead = tokenizer.get_token();

        loop {
            let top = *states.last().expect("states is never empty");
            let in_transaction = tokenizer.is_transaction_in_progress();
            let effective = self.effective_terminal(&lookahead, error_mode, in_transaction)?;

            let Some(action) = self.tables.action(top, effective) else {
                let recovered = if !error_mode {
                    self.enter_recovery(&mut states, &mut nodes)
                } else {
                    self.continue_recovery(&mut states, &mut nodes, tokenizer, &mut lookahead)
                };
                if !recovered {
                    return Ok(None);
                }
                error_mode = true;
                continue;
            };

            match action {
                Action::Shift(next) => {
                    if effective == LookaheadTerminal::Terminal(self.grammar.error_terminal()) {
                        let expected = self.expected_terminals(top);
                        let token = lookahead.clone().unwrap_or_else(|| {
                            let pos = tokenizer.position();
                            Token::new(self.grammar.error_terminal(), None, Span::new(pos.clone(), pos))
                        });
                        nodes.push(ParseTree::Error { token, expected });
                        states.push(next);
                        tokenizer.begin_transaction();
                    } else {
                        let token = lookahead.take().expect("a Shift proposed for a real terminal implies a lookahead token is present");
                        nodes.push(ParseTree::Terminal(token));
                        states.push(next);
                        lookahead = tokenizer.get_token();
                    }
                }
                Action::Reduce(rule_id) => {
                    let rule = self.grammar.rule(rule_id);
                    let arity = rule.rhs.len();
                    let children = nodes.split_off(nodes.len() - arity);
                    states.truncate(states.len() - arity);

                    let fallback_position = match &lookahead {
                        Some(token) => token.span.start.clone(),
                        None => tokenizer.position(),
                    };
                    let children = self.collapse_children(&rule.rhs, children);
                    let node = ParseTree::Variable { rule: rule_id, children, fallback_position };

                    if self.grammar.is_error_rule(rule_id) {
                        error_mode = false;
                        tokenizer.commit_transaction();
                    }

                    let new_top = *states.last().expect("states is never empty");
                    let goto_state = self
                        .tables
                        .goto(new_top, rule.lhs)
                        .expect("a correctly-built table always defines GOTO for a rule's own LHS at the state left after popping its rhs");
                    states.push(goto_state);
                    nodes.push(node);
                }
                Action::Accept => {
                    debug_assert_eq!(nodes.len(), 1, "Accept only fires once exactly one node — the start symbol — remains");
                    return Ok(nodes.pop());
                }
            }
        }
    }
}
