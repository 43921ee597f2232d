//! The grammar data model.
//!
//! Replaces a tree-sitter-style `Rule` enum describing *unexpanded*
//! extended constructs with a plain-BNF model over arena indices. Extended
//! constructs are a loader-time concern (see [`crate::doc`]/[`crate::loader`]);
//! by the time a `Grammar` exists, every rule is already `LHS -> References`.

use std::fmt;

use indexmap::IndexMap;

use crate::ids::{RuleId, TerminalId, VariableId};

/// A terminal symbol. `discardable` sets the default for references to this
/// terminal that don't specify their own `preserved` override (see
/// [`Reference::Terminal`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    pub name: String,
    pub discardable: bool,
}

/// A non-terminal. `parent_rule` is set only for auxiliary variables
/// synthesized by the loader while desugaring an extended construct; such
/// variables are *collapsible*: their node vanishes from the parse tree
/// at reduction time and their children splice into the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub rules: Vec<RuleId>,
    pub parent_rule: Option<RuleId>,
}

impl Variable {
    pub fn is_collapsible(&self) -> bool {
        self.parent_rule.is_some()
    }
}

/// Associativity of a rule's precedence, used to resolve shift/reduce
/// conflicts at table-build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    None,
    Left,
    Right,
}

impl Default for Associativity {
    fn default() -> Self {
        Associativity::None
    }
}

/// A rule's precedence: a `(set, level)` pair. Two rules only compare by
/// level if they share a `set`; rules outside a precedence set carry `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Precedence {
    pub set: u32,
    pub level: u32,
}

/// One element of a rule's right-hand side.
///
/// `Reference` never resolves itself: it is a plain value, and callers
/// resolve the `TerminalId`/`VariableId` it carries through whichever
/// `Grammar` they already hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Terminal { id: TerminalId, preserved: bool },
    Variable(VariableId),
}

impl Reference {
    pub fn is_error(&self, error_terminal: TerminalId) -> bool {
        matches!(self, Reference::Terminal { id, .. } if *id == error_terminal)
    }
}

/// A production. `precedence`/`associativity` are `None`/`Associativity::None`
/// for an ordinary rule; for a rule belonging to a collapsible variable they
/// are *baked in at desugar time*, copied down from the enclosing rule
/// (transitively through nested auxiliaries) rather than looked up through
/// `parent_rule` on every table-builder query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub lhs: VariableId,
    pub rhs: Vec<Reference>,
    pub precedence: Option<Precedence>,
    pub associativity: Associativity,
}

impl Rule {
    pub fn is_error_rule(&self, error_terminal: TerminalId) -> bool {
        self.rhs.iter().any(|r| r.is_error(error_terminal))
    }
}

/// The elaborated grammar: every terminal/variable/rule referenced anywhere
/// lives in one of this struct's three arenas, addressed by `TerminalId` /
/// `VariableId` / `RuleId`. Built once by [`crate::loader::load`] and frozen
/// thereafter.
#[derive(Debug, Clone)]
pub struct Grammar {
    terminal_names: IndexMap<String, TerminalId>,
    terminals: Vec<Terminal>,
    variable_names: IndexMap<String, VariableId>,
    variables: Vec<Variable>,
    rules: Vec<Rule>,
    start: VariableId,
    error_terminal: TerminalId,
}

/// Internal builder used only by [`crate::loader`]; keeps `Grammar`'s arenas
/// append-only and its invariants enforceable in one place.
pub(crate) struct GrammarBuilder {
    terminal_names: IndexMap<String, TerminalId>,
    terminals: Vec<Terminal>,
    variable_names: IndexMap<String, VariableId>,
    variables: Vec<Variable>,
    rules: Vec<Rule>,
}

impl GrammarBuilder {
    pub(crate) fn new() -> Self {
        Self {
            terminal_names: IndexMap::new(),
            terminals: Vec::new(),
            variable_names: IndexMap::new(),
            variables: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub(crate) fn terminal_id(&self, name: &str) -> Option<TerminalId> {
        self.terminal_names.get(name).copied()
    }

    pub(crate) fn variable_id(&self, name: &str) -> Option<VariableId> {
        self.variable_names.get(name).copied()
    }

    /// Registers a terminal. Returns `None` if the name is already taken
    /// (including `@error`, pre-registered by [`crate::loader::load`]).
    pub(crate) fn add_terminal(&mut self, name: String, discardable: bool) -> Option<TerminalId> {
        if self.terminal_names.contains_key(&name) {
            return None;
        }
        let id = TerminalId::from_index(self.terminals.len());
        self.terminals.push(Terminal { name: name.clone(), discardable });
        self.terminal_names.insert(name, id);
        Some(id)
    }

    /// Registers a variable with no rules yet (forward-reference friendly).
    /// Rules are attached afterwards via `reserve_rule`/`fill_rule`.
    pub(crate) fn add_variable(&mut self, name: String, parent_rule: Option<RuleId>) -> Option<VariableId> {
        if self.variable_names.contains_key(&name) {
            return None;
        }
        let id = VariableId::from_index(self.variables.len());
        self.variables.push(Variable { name: name.clone(), rules: Vec::new(), parent_rule });
        self.variable_names.insert(name, id);
        Some(id)
    }

    /// Reserves a rule slot for `lhs` before its right-hand side is known.
    /// The loader needs this to construct extended-construct auxiliaries
    /// whose `parent_rule` must name the rule that references them, even
    /// though that rule's own right-hand side is still being desugared —
    /// see `crate::loader` module docs.
    pub(crate) fn reserve_rule(&mut self, lhs: VariableId) -> RuleId {
        let id = RuleId::from_index(self.rules.len());
        self.rules.push(Rule { lhs, rhs: Vec::new(), precedence: None, associativity: Associativity::None });
        self.variables[lhs.index()].rules.push(id);
        id
    }

    /// Fills in a rule reserved via `reserve_rule`.
    pub(crate) fn fill_rule(&mut self, id: RuleId, rhs: Vec<Reference>, precedence: Option<Precedence>, associativity: Associativity) {
        let rule = &mut self.rules[id.index()];
        rule.rhs = rhs;
        rule.precedence = precedence;
        rule.associativity = associativity;
    }

    pub(crate) fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.index()]
    }

    pub(crate) fn terminal_discardable(&self, id: TerminalId) -> bool {
        self.terminals[id.index()].discardable
    }

    pub(crate) fn finish(self, start: VariableId, error_terminal: TerminalId) -> Grammar {
        Grammar {
            terminal_names: self.terminal_names,
            terminals: self.terminals,
            variable_names: self.variable_names,
            variables: self.variables,
            rules: self.rules,
            start,
            error_terminal,
        }
    }
}

impl Grammar {
    pub fn start(&self) -> VariableId {
        self.start
    }

    pub fn error_terminal(&self) -> TerminalId {
        self.error_terminal
    }

    pub fn terminal(&self, id: TerminalId) -> &Terminal {
        &self.terminals[id.index()]
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.index()]
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalId> {
        self.terminal_names.get(name).copied()
    }

    pub fn variable_by_name(&self, name: &str) -> Option<VariableId> {
        self.variable_names.get(name).copied()
    }

    pub fn terminals(&self) -> impl Iterator<Item = (TerminalId, &Terminal)> {
        self.terminals.iter().enumerate().map(|(i, t)| (TerminalId::from_index(i), t))
    }

    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables.iter().enumerate().map(|(i, v)| (VariableId::from_index(i), v))
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId::from_index(i), r))
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_error_rule(&self, id: RuleId) -> bool {
        self.rule(id).is_error_rule(self.error_terminal)
    }
}

/// Renders a rule as `lhs -> ref ref ref` for diagnostics.
pub struct DisplayRule<'g> {
    pub grammar: &'g Grammar,
    pub rule: RuleId,
}

impl fmt::Display for DisplayRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = self.grammar.rule(self.rule);
        write!(f, "{} ->", self.grammar.variable(rule.lhs).name)?;
        if rule.rhs.is_empty() {
            write!(f, " ε")?;
        }
        for reference in &rule.rhs {
            match reference {
                Reference::Terminal { id, .. } => write!(f, " {}", self.grammar.terminal(*id).name)?,
                Reference::Variable(id) => write!(f, " {}", self.grammar.variable(*id).name)?,
            }
        }
        Ok(())
    }
}

impl Grammar {
    pub fn display_rule(&self, rule: RuleId) -> DisplayRule<'_> {
        DisplayRule { grammar: self, rule }
    }
}
