//! Canonical LR(1) table builder (§4.2 of the core design).
//!
//! Augments the grammar with a fresh start item and an `@end` sentinel that
//! never enters `kang_core::Grammar`'s own terminal arena — both are
//! represented internally as special cases ([`ItemRule::Start`],
//! [`LookaheadTerminal::EndOfInput`]) rather than minted arena ids, since
//! `kang_core` only allows a `Grammar`'s own builder to allocate those.
//! Computes nullable/FIRST/FOLLOW, the canonical collection of LR(1) item
//! sets, and fills ACTION/GOTO, resolving shift/reduce and reduce/reduce
//! conflicts via precedence and associativity where declared.


use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use kang_core::{Grammar, Reference, RuleId, TerminalId, VariableId};

/// A terminal-or-end-of-input lookahead symbol. `@end` is never a real
/// grammar terminal (§3: "internally during table construction"), so it
/// needs its own variant rather than a `TerminalId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LookaheadTerminal {
    Terminal(TerminalId),
    EndOfInput,
}

/// One cell of an ACTION table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(usize),
    Reduce(RuleId),
    Accept,
}

/// One item of a conflicting state, rendered for diagnostics. `rule: None`
/// denotes the augmented `S' -> S` item, which has no `RuleId` of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictItem {
    pub rule: Option<RuleId>,
    pub position: usize,
    pub lookahead: LookaheadTerminal,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TableError {
    /// `shift_rule: None` means the conflicting shift is the augmented
    /// start rule accepting at `@end` — this can only arise from a
    /// pathologically ambiguous grammar where some other rule also wants
    /// to reduce on `@end`.
    #[error("shift/reduce conflict on rule {reduce_rule} in a state with {} items", state.len())]
    ShiftReduceConflict { shift_rule: Option<RuleId>, reduce_rule: RuleId, state: Vec<ConflictItem> },

    #[error("reduce/reduce conflict between rule {first_rule} and rule {second_rule} in a state with {} items", state.len())]
    ReduceReduceConflict { first_rule: RuleId, second_rule: RuleId, state: Vec<ConflictItem> },
}

/// `(rule, position, lookahead)`, `0 <= position <= rhs length`. Equality
/// and hashing are structural (derived), matching §3's `ParseItem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ParseItem {
    rule: ItemRule,
    position: usize,
    lookahead: LookaheadTerminal,
}

/// Which rule a [`ParseItem`] walks. `Start` is the augmented `S' -> S`
/// production that only ever exists inside the table builder — see module
/// docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum ItemRule {
    Start,
    Rule(RuleId),
}

impl ItemRule {
    /// Grammar symbol at `position`, or `None` past the end of the rhs.
    fn symbol_at(self, grammar: &Grammar, position: usize) -> Option<Reference> {
        match self {
            ItemRule::Start => (position == 0).then(|| Reference::Variable(grammar.start())),
            ItemRule::Rule(id) => grammar.rule(id).rhs.get(position).copied(),
        }
    }

    /// The symbols after `position` (exclusive), for scanning `FIRST(beta a)`.
    fn symbols_after<'g>(self, grammar: &'g Grammar, position: usize) -> &'g [Reference] {
        match self {
            ItemRule::Start => &[],
            ItemRule::Rule(id) => {
                let rhs = &grammar.rule(id).rhs;
                if position < rhs.len() { &rhs[position..] } else { &[] }
            }
        }
    }
}

impl ParseItem {
    fn symbol_after_dot(self, grammar: &Grammar) -> Option<Reference> {
        self.rule.symbol_at(grammar, self.position)
    }

    fn advanced(self) -> ParseItem {
        ParseItem { position: self.position + 1, ..self }
    }
}

/// An unordered set of items; equality is set equality (`BTreeSet`'s
/// `Hash`/`Eq` impls are exactly that, given `ParseItem: Ord + Hash`).
type State = BTreeSet<ParseItem>;

/// A grammar symbol, used only to enumerate goto targets — unlike
/// [`Reference`], it drops the `preserved` flag, which is irrelevant to
/// state-transition identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Symbol {
    Terminal(TerminalId),
    Variable(VariableId),
}

fn symbol_of(reference: Reference) -> Symbol {
    match reference {
        Reference::Terminal { id, .. } => Symbol::Terminal(id),
        Reference::Variable(id) => Symbol::Variable(id),
    }
}

/// The canonical LR(1) ACTION/GOTO tables built from a [`Grammar`]. Immutable
/// once built; §5 allows sharing one `Tables` across parses on different
/// threads.
#[derive(Debug)]
pub struct Tables {
    action: Vec<IndexMap<LookaheadTerminal, Action>>,
    goto: Vec<IndexMap<VariableId, usize>>,
    reason: Vec<IndexMap<LookaheadTerminal, Option<RuleId>>>,
    follow: HashMap<VariableId, BTreeSet<LookaheadTerminal>>,
}

impl Tables {
    pub fn build(grammar: &Grammar) -> Result<Tables, TableError> {
        let (nullable, first) = compute_nullable_first(grammar);
        let follow = compute_follow(grammar, &nullable, &first);

        let (states, transitions) = build_states(grammar, &nullable, &first);
        let (action, reason) = populate_actions(grammar, &states, &transitions)?;
        let goto = transitions
            .iter()
            .map(|row| row.iter().filter_map(|(&sym, &j)| match sym {
                Symbol::Variable(v) => Some((v, j)),
                Symbol::Terminal(_) => None,
            }).collect())
            .collect();

        Ok(Tables { action, goto, reason, follow })
    }

    /// The canonical collection's first state, always index 0 by
    /// construction (`closure({[S' -> .S, @end]})`).
    pub fn start_state(&self) -> usize {
        0
    }

    pub fn state_count(&self) -> usize {
        self.action.len()
    }

    pub fn action(&self, state: usize, terminal: LookaheadTerminal) -> Option<Action> {
        self.action[state].get(&terminal).copied()
    }

    pub fn actions_at(&self, state: usize) -> impl Iterator<Item = (LookaheadTerminal, Action)> + '_ {
        self.action[state].iter().map(|(&t, &a)| (t, a))
    }

    pub fn goto(&self, state: usize, variable: VariableId) -> Option<usize> {
        self.goto[state].get(&variable).copied()
    }

    /// Which rule introduced `ACTION[state, terminal]`, for conflict
    /// diagnosis on an already-built table (§5's "Supplemented behavior":
    /// exposed read-only post-build, not only while construction is
    /// failing). `Some(None)` denotes the augmented start rule.
    pub fn reason(&self, state: usize, terminal: LookaheadTerminal) -> Option<Option<RuleId>> {
        self.reason[state].get(&terminal).copied()
    }

    /// Retained for diagnostic completeness per §4.2 — not consulted by
    /// table construction itself.
    pub fn follow(&self, variable: VariableId) -> Option<&BTreeSet<LookaheadTerminal>> {
        self.follow.get(&variable)
    }
}

/// Iterative least fixed point over every rule of every variable, recomputed
/// to convergence. Terminals are never nullable; `FIRST(V)` folds each
/// rule's `FIRST(item_1) .. FIRST(item_i)` stopping at the first
/// non-nullable item.
fn compute_nullable_first(grammar: &Grammar) -> (BTreeSet<VariableId>, HashMap<VariableId, BTreeSet<TerminalId>>) {
    let mut nullable: BTreeSet<VariableId> = BTreeSet::new();
    let mut first: HashMap<VariableId, BTreeSet<TerminalId>> = grammar.variables().map(|(id, _)| (id, BTreeSet::new())).collect();

    loop {
        let mut changed = false;

        for (var_id, var) in grammar.variables() {
            for &rule_id in &var.rules {
                let rhs = &grammar.rule(rule_id).rhs;

                if !nullable.contains(&var_id) {
                    let all_nullable = rhs.iter().all(|r| matches!(r, Reference::Variable(v) if nullable.contains(v)));
                    if all_nullable {
                        nullable.insert(var_id);
                        changed = true;
                    }
                }

                let mut addition = BTreeSet::new();
                for reference in rhs {
                    match reference {
                        Reference::Terminal { id, .. } => {
                            addition.insert(*id);
                            break;
                        }
                        Reference::Variable(v) => {
                            addition.extend(first.get(v).into_iter().flatten());
                            if !nullable.contains(v) {
                                break;
                            }
                        }
                    }
                }

                let entry = first.get_mut(&var_id).expect("every variable has a FIRST entry seeded above");
                let before = entry.len();
                entry.extend(addition);
                if entry.len() != before {
                    changed = true;
                }
            }
        }

        if !changed {
            return (nullable, first);
        }
    }
}

/// FOLLOW, bootstrapped with `@end ∈ FOLLOW(S')` which (since `S' -> S` is
/// `S'`'s only rule) is just `@end ∈ FOLLOW(start)`. Not consulted by
/// canonical LR(1) construction; computed only so [`Tables::follow`] can
/// answer it.
fn compute_follow(
    grammar: &Grammar,
    nullable: &BTreeSet<VariableId>,
    first: &HashMap<VariableId, BTreeSet<TerminalId>>,
) -> HashMap<VariableId, BTreeSet<LookaheadTerminal>> {
    let mut follow: HashMap<VariableId, BTreeSet<LookaheadTerminal>> = grammar.variables().map(|(id, _)| (id, BTreeSet::new())).collect();
    follow.get_mut(&grammar.start()).expect("start variable is in the grammar's variable map").insert(LookaheadTerminal::EndOfInput);

    loop {
        let mut changed = false;

        for (_, var) in grammar.variables() {
            for &rule_id in &var.rules {
                let rule = grammar.rule(rule_id);
                for (i, reference) in rule.rhs.iter().enumerate() {
                    let Reference::Variable(b) = reference else { continue };
                    let beta = &rule.rhs[i + 1..];

                    let mut addition: BTreeSet<LookaheadTerminal> = BTreeSet::new();
                    let mut beta_nullable = true;
                    for item in beta {
                        match item {
                            Reference::Terminal { id, .. } => {
                                addition.insert(LookaheadTerminal::Terminal(*id));
                                beta_nullable = false;
                                break;
                            }
                            Reference::Variable(v) => {
                                addition.extend(first.get(v).into_iter().flatten().map(|&t| LookaheadTerminal::Terminal(t)));
                                if !nullable.contains(v) {
                                    beta_nullable = false;
                                    break;
                                }
                            }
                        }
                    }
                    if beta_nullable {
                        addition.extend(follow.get(&rule.lhs).into_iter().flatten().copied());
                    }

                    let entry = follow.get_mut(b).expect("every variable has a FOLLOW entry seeded above");
                    let before = entry.len();
                    entry.extend(addition);
                    if entry.len() != before {
                        changed = true;
                    }
                }
            }
        }

        if !changed {
            return follow;
        }
    }
}

/// `FIRST(beta a)`: scans `refs` left to right, stopping at the first
/// non-nullable symbol; if every symbol in `refs` is nullable (including
/// the empty sequence), folds in `trailing`.
fn first_of_sequence(
    nullable: &BTreeSet<VariableId>,
    first: &HashMap<VariableId, BTreeSet<TerminalId>>,
    refs: &[Reference],
    trailing: LookaheadTerminal,
) -> BTreeSet<LookaheadTerminal> {
    let mut result = BTreeSet::new();
    for reference in refs {
        match reference {
            Reference::Terminal { id, .. } => {
                result.insert(LookaheadTerminal::Terminal(*id));
                return result;
            }
            Reference::Variable(v) => {
                result.extend(first.get(v).into_iter().flatten().map(|&t| LookaheadTerminal::Terminal(t)));
                if !nullable.contains(v) {
                    return result;
                }
            }
        }
    }
    result.insert(trailing);
    result
}

/// `closure(I)`: for every `[A -> alpha . B beta, a] in I`, for every rule
/// `B -> gamma`, for every `b in FIRST(beta a)`, add `[B -> .gamma, b]`.
/// Fixed-point on set union.
fn closure(grammar: &Grammar, nullable: &BTreeSet<VariableId>, first: &HashMap<VariableId, BTreeSet<TerminalId>>, mut items: State) -> State {
    loop {
        let mut additions = Vec::new();
        for item in &items {
            let Some(Reference::Variable(b)) = item.symbol_after_dot(grammar) else { continue };
            let beta = item.rule.symbols_after(grammar, item.position + 1);
            let lookaheads = first_of_sequence(nullable, first, beta, item.lookahead);
            for &rule_id in &grammar.variable(b).rules {
                for &lookahead in &lookaheads {
                    let new_item = ParseItem { rule: ItemRule::Rule(rule_id), position: 0, lookahead };
                    if !items.contains(&new_item) {
                        additions.push(new_item);
                    }
                }
            }
        }
        if additions.is_empty() {
            return items;
        }
        items.extend(additions);
    }
}

/// `goto(I, X)`: closure of every item in `I` with `X` after the dot,
/// advanced past it. Empty (no item has `X` next) signals "no transition".
fn goto(grammar: &Grammar, nullable: &BTreeSet<VariableId>, first: &HashMap<VariableId, BTreeSet<TerminalId>>, state: &State, symbol: Symbol) -> State {
    let kernel: State = state
        .iter()
        .filter(|item| item.symbol_after_dot(grammar).map(symbol_of) == Some(symbol))
        .map(|item| item.advanced())
        .collect();
    if kernel.is_empty() {
        return kernel;
    }
    closure(grammar, nullable, first, kernel)
}

/// Discovers the full canonical collection by repeatedly computing `goto`
/// on every known state against every terminal and every variable, adding
/// any newly-seen non-empty result, until no state yields anything new.
fn build_states(
    grammar: &Grammar,
    nullable: &BTreeSet<VariableId>,
    first: &HashMap<VariableId, BTreeSet<TerminalId>>,
) -> (Vec<State>, Vec<HashMap<Symbol, usize>>) {
    let start_item = ParseItem { rule: ItemRule::Start, position: 0, lookahead: LookaheadTerminal::EndOfInput };
    let start_state = closure(grammar, nullable, first, State::from([start_item]));

    let mut states = vec![start_state.clone()];
    let mut transitions: Vec<HashMap<Symbol, usize>> = vec![HashMap::new()];
    let mut index: HashMap<State, usize> = HashMap::new();
    index.insert(start_state, 0);

    let all_terminals: Vec<TerminalId> = grammar.terminals().map(|(id, _)| id).collect();
    let all_variables: Vec<VariableId> = grammar.variables().map(|(id, _)| id).collect();

    let mut i = 0;
    while i < states.len() {
        let symbols = all_terminals.iter().copied().map(Symbol::Terminal).chain(all_variables.iter().copied().map(Symbol::Variable));

        for symbol in symbols {
            let target = goto(grammar, nullable, first, &states[i], symbol);
            if target.is_empty() {
                continue;
            }
            let j = if let Some(&existing) = index.get(&target) {
                existing
            } else {
                let j = states.len();
                index.insert(target.clone(), j);
                states.push(target);
                transitions.push(HashMap::new());
                j
            };
            transitions[i].insert(symbol, j);
        }

        i += 1;
    }

    (states, transitions)
}

fn precedence_of(grammar: &Grammar, rule: Option<RuleId>) -> (Option<kang_core::Precedence>, kang_core::Associativity) {
    match rule {
        None => (None, kang_core::Associativity::None),
        Some(id) => {
            let rule = grammar.rule(id);
            (rule.precedence, rule.associativity)
        }
    }
}

fn conflict_items(grammar: &Grammar, state: &State) -> Vec<ConflictItem> {
    state
        .iter()
        .map(|item| ConflictItem {
            rule: match item.rule {
                ItemRule::Start => None,
                ItemRule::Rule(id) => Some(id),
            },
            position: item.position,
            lookahead: item.lookahead,
        })
        .collect()
}

/// Proposes `action` (introduced by `rule`, `None` for the augmented start
/// rule) for `terminal` in `state`'s ACTION row, resolving against whatever
/// is already proposed there per §4.2's conflict table.
fn propose(
    grammar: &Grammar,
    state: &State,
    actions: &mut IndexMap<LookaheadTerminal, Action>,
    reasons: &mut IndexMap<LookaheadTerminal, Option<RuleId>>,
    terminal: LookaheadTerminal,
    action: Action,
    rule: Option<RuleId>,
) -> Result<(), TableError> {
    let Some(existing) = actions.get(&terminal).copied() else {
        actions.insert(terminal, action);
        reasons.insert(terminal, rule);
        return Ok(());
    };

    // Identical reduce, or identical shift, already present: no-op.
    if existing == action {
        return Ok(());
    }

    let existing_rule = reasons.get(&terminal).copied().flatten();

    let (shift_action, shift_rule, reduce_rule) = match (existing, action) {
        (Action::Reduce(r1), Action::Reduce(r2)) => {
            return Err(TableError::ReduceReduceConflict { first_rule: r1, second_rule: r2, state: conflict_items(grammar, state) });
        }
        (Action::Reduce(reduce_rule), shift_or_accept) => (shift_or_accept, rule, reduce_rule),
        (shift_or_accept, Action::Reduce(reduce_rule)) => (shift_or_accept, existing_rule, reduce_rule),
        (_, _) => {
            debug_assert!(false, "two distinct shift or accept actions proposed for one (state, terminal): goto is not a function");
            return Ok(());
        }
    };

    let (shift_precedence, shift_assoc) = precedence_of(grammar, shift_rule);
    let (reduce_precedence, _) = precedence_of(grammar, Some(reduce_rule));

    let shift_wins = match (shift_precedence, reduce_precedence) {
        (Some(sp), Some(rp)) if sp.set == rp.set => {
            if sp.level > rp.level {
                Some(true)
            } else if sp.level < rp.level {
                Some(false)
            } else {
                match shift_assoc {
                    kang_core::Associativity::Left => Some(false),
                    kang_core::Associativity::Right => Some(true),
                    kang_core::Associativity::None => None,
                }
            }
        }
        _ => None,
    };

    match shift_wins {
        Some(true) => {
            actions.insert(terminal, shift_action);
            reasons.insert(terminal, shift_rule);
            Ok(())
        }
        Some(false) => {
            actions.insert(terminal, Action::Reduce(reduce_rule));
            reasons.insert(terminal, Some(reduce_rule));
            Ok(())
        }
        None => Err(TableError::ShiftReduceConflict { shift_rule, reduce_rule, state: conflict_items(grammar, state) }),
    }
}

fn populate_actions(
    grammar: &Grammar,
    states: &[State],
    transitions: &[HashMap<Symbol, usize>],
) -> Result<(Vec<IndexMap<LookaheadTerminal, Action>>, Vec<IndexMap<LookaheadTerminal, Option<RuleId>>>), TableError> {
    let mut actions = vec![IndexMap::new(); states.len()];
    let mut reasons = vec![IndexMap::new(); states.len()];

    for (i, state) in states.iter().enumerate() {
        for item in state {
            match item.symbol_after_dot(grammar) {
                Some(Reference::Terminal { id, .. }) => {
                    if let Some(&j) = transitions[i].get(&Symbol::Terminal(id)) {
                        let rule = match item.rule {
                            ItemRule::Start => None,
                            ItemRule::Rule(r) => Some(r),
                        };
                        propose(grammar, state, &mut actions[i], &mut reasons[i], LookaheadTerminal::Terminal(id), Action::Shift(j), rule)?;
                    }
                }
                Some(Reference::Variable(_)) => {}
                None => match item.rule {
                    ItemRule::Start if item.lookahead == LookaheadTerminal::EndOfInput => {
                        propose(grammar, state, &mut actions[i], &mut reasons[i], LookaheadTerminal::EndOfInput, Action::Accept, None)?;
                    }
                    ItemRule::Start => {}
                    ItemRule::Rule(rule_id) => {
                        propose(grammar, state, &mut actions[i], &mut reasons[i], item.lookahead, Action::Reduce(rule_id), Some(rule_id))?;
                    }
                },
            }
        }
    }

    Ok((actions, reasons))
}
