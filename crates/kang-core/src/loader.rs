//! The grammar loader / desugarer.
//!
//! Lowers a [`crate::doc::GrammarDoc`] into a fully elaborated
//! [`crate::Grammar`] over plain BNF: every extended construct (`group`,
//! `optional`, `repeat`, `choice`, `error`) becomes a fresh auxiliary,
//! collapsible [`crate::Variable`] whose rules carry the
//! precedence/associativity of the rule they were desugared from.
//!
//! Auxiliary variables are never shared across the multiple rules a single
//! construct can expand into (e.g. a bounded `repeat`'s `n - m + 1` rules, or
//! an unbounded `repeat`'s base case repeated `m` times): each generated rule
//! gets its own fresh auxiliaries for whatever it nests, so that a
//! [`crate::Variable`]'s `parent_rule` back-reference is never ambiguous
//! between two distinct enclosing rules. The duplication this creates is
//! invisible by construction: collapsible variables vanish from the parse
//! tree at reduction time.

use crate::doc::{AssociativityDoc, ConstructDoc, GrammarDoc, PrecedenceEntryDoc, RuleDoc, VariableDoc};
use crate::error::GrammarError;
use crate::ids::{RuleId, TerminalId, VariableId};
use crate::types::{Associativity, Grammar, GrammarBuilder, Precedence, Reference};

const ERROR_TERMINAL_NAME: &str = "@error";

#[derive(Debug, Clone, Copy)]
struct PrecCtx {
    precedence: Option<Precedence>,
    associativity: Associativity,
}

impl PrecCtx {
    const NONE: PrecCtx = PrecCtx { precedence: None, associativity: Associativity::None };
}

struct Loader {
    builder: GrammarBuilder,
    error_terminal: TerminalId,
    next_aux: u32,
    next_precedence_set: u32,
}

impl Loader {
    fn fresh_aux_name(&mut self) -> String {
        let name = format!("$aux{}", self.next_aux);
        self.next_aux += 1;
        name
    }

    /// Desugars a rule's right-hand side (a sequence of extended
    /// constructs) into plain `Reference`s, creating fresh auxiliary
    /// variables/rules as needed. `parent_rule` is the rule id that this
    /// sequence is the (or part of the) right-hand side of — it becomes the
    /// `parent_rule` of any auxiliary variable created here.
    fn desugar_items(&mut self, items: &[ConstructDoc], ctx: PrecCtx, parent_rule: RuleId) -> Result<Vec<Reference>, GrammarError> {
        let mut refs = Vec::with_capacity(items.len());
        for item in items {
            refs.push(match item {
                ConstructDoc::Terminal { name, preserved } => {
                    let id = self
                        .builder
                        .terminal_id(name)
                        .ok_or_else(|| GrammarError::UnknownTerminalReference { name: name.clone() })?;
                    let preserved = preserved.unwrap_or(!self.builder.terminal_discardable(id));
                    Reference::Terminal { id, preserved }
                }
                ConstructDoc::Variable { name } => {
                    let id = self
                        .builder
                        .variable_id(name)
                        .ok_or_else(|| GrammarError::UnknownVariableReference { name: name.clone() })?;
                    Reference::Variable(id)
                }
                ConstructDoc::Group { items } => self.desugar_group(items, ctx, parent_rule)?,
                ConstructDoc::Optional { items } => self.desugar_optional(items, ctx, parent_rule)?,
                ConstructDoc::Repeat { min, max, items } => self.desugar_repeat(*min, *max, items, ctx, parent_rule)?,
                ConstructDoc::Choice { alternatives } => self.desugar_choice(alternatives, ctx, parent_rule)?,
                ConstructDoc::Error => Reference::Terminal { id: self.error_terminal, preserved: true },
            });
        }
        Ok(refs)
    }

    fn new_aux_variable(&mut self, parent_rule: RuleId) -> VariableId {
        let name = self.fresh_aux_name();
        self.builder
            .add_variable(name, Some(parent_rule))
            .expect("synthetic auxiliary names are unique by construction")
    }

    fn desugar_group(&mut self, items: &RuleDoc, ctx: PrecCtx, parent_rule: RuleId) -> Result<Reference, GrammarError> {
        let aux = self.new_aux_variable(parent_rule);
        let rule = self.builder.reserve_rule(aux);
        let rhs = self.desugar_items(items, ctx, rule)?;
        self.builder.fill_rule(rule, rhs, ctx.precedence, ctx.associativity);
        Ok(Reference::Variable(aux))
    }

    fn desugar_optional(&mut self, items: &RuleDoc, ctx: PrecCtx, parent_rule: RuleId) -> Result<Reference, GrammarError> {
        let aux = self.new_aux_variable(parent_rule);

        let present = self.builder.reserve_rule(aux);
        let rhs = self.desugar_items(items, ctx, present)?;
        self.builder.fill_rule(present, rhs, ctx.precedence, ctx.associativity);

        let empty = self.builder.reserve_rule(aux);
        self.builder.fill_rule(empty, Vec::new(), ctx.precedence, ctx.associativity);

        Ok(Reference::Variable(aux))
    }

    fn desugar_repeat(
        &mut self,
        min: u32,
        max: Option<u32>,
        items: &RuleDoc,
        ctx: PrecCtx,
        parent_rule: RuleId,
    ) -> Result<Reference, GrammarError> {
        if let Some(max) = max {
            if min > max {
                return Err(GrammarError::RepeatMinGreaterThanMax { min, max });
            }
        }

        let aux = self.new_aux_variable(parent_rule);

        match max {
            None => {
                // `A -> A items` (recursive extension) and `A -> items^m`
                // (base case, `items` desugared fresh `min` times over).
                let recursive = self.builder.reserve_rule(aux);
                let mut rhs = vec![Reference::Variable(aux)];
                rhs.extend(self.desugar_items(items, ctx, recursive)?);
                self.builder.fill_rule(recursive, rhs, ctx.precedence, ctx.associativity);

                let base = self.builder.reserve_rule(aux);
                let mut rhs = Vec::new();
                for _ in 0..min {
                    rhs.extend(self.desugar_items(items, ctx, base)?);
                }
                self.builder.fill_rule(base, rhs, ctx.precedence, ctx.associativity);
            }
            Some(max) => {
                for count in min..=max {
                    let rule = self.builder.reserve_rule(aux);
                    let mut rhs = Vec::new();
                    for _ in 0..count {
                        rhs.extend(self.desugar_items(items, ctx, rule)?);
                    }
                    self.builder.fill_rule(rule, rhs, ctx.precedence, ctx.associativity);
                }
            }
        }

        Ok(Reference::Variable(aux))
    }

    fn desugar_choice(&mut self, alternatives: &[RuleDoc], ctx: PrecCtx, parent_rule: RuleId) -> Result<Reference, GrammarError> {
        let aux = self.new_aux_variable(parent_rule);
        for alt in alternatives {
            let rule = self.builder.reserve_rule(aux);
            let rhs = self.desugar_items(alt, ctx, rule)?;
            self.builder.fill_rule(rule, rhs, ctx.precedence, ctx.associativity);
        }
        Ok(Reference::Variable(aux))
    }

    fn build_variable_rules(&mut self, doc: &VariableDoc) -> Result<(), GrammarError> {
        let var_id = self
            .builder
            .variable_id(&doc.name)
            .expect("all top-level variables are pre-registered before rules are built");

        for rule_doc in &doc.rules {
            let rule = self.builder.reserve_rule(var_id);
            let rhs = self.desugar_items(rule_doc, PrecCtx::NONE, rule)?;
            self.builder.fill_rule(rule, rhs, None, Associativity::None);
        }

        for block in &doc.precedence_blocks {
            let set = self.next_precedence_set;
            self.next_precedence_set += 1;
            for (level, entry) in block.iter().enumerate() {
                let level = level as u32;
                match entry {
                    PrecedenceEntryDoc::Rule { associativity, rule: rule_doc } => {
                        let assoc = convert_associativity(*associativity);
                        let ctx = PrecCtx { precedence: Some(Precedence { set, level }), associativity: assoc };
                        let rule = self.builder.reserve_rule(var_id);
                        let rhs = self.desugar_items(rule_doc, ctx, rule)?;
                        self.builder.fill_rule(rule, rhs, ctx.precedence, ctx.associativity);
                    }
                    PrecedenceEntryDoc::Group { associativity, rules } => {
                        let assoc = convert_associativity(*associativity);
                        let ctx = PrecCtx { precedence: Some(Precedence { set, level }), associativity: assoc };
                        for rule_doc in rules {
                            let rule = self.builder.reserve_rule(var_id);
                            let rhs = self.desugar_items(rule_doc, ctx, rule)?;
                            self.builder.fill_rule(rule, rhs, ctx.precedence, ctx.associativity);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

fn convert_associativity(doc: AssociativityDoc) -> Associativity {
    match doc {
        AssociativityDoc::None => Associativity::None,
        AssociativityDoc::Left => Associativity::Left,
        AssociativityDoc::Right => Associativity::Right,
    }
}

/// Loads and desugars a [`GrammarDoc`] into a [`Grammar`]. See module docs
/// for the desugaring strategy.
pub fn load(doc: &GrammarDoc) -> Result<Grammar, GrammarError> {
    if doc.variables.is_empty() {
        return Err(GrammarError::NoVariables);
    }

    let mut builder = GrammarBuilder::new();

    let error_terminal = builder
        .add_terminal(ERROR_TERMINAL_NAME.to_string(), false)
        .expect("@error is the first terminal registered into an empty builder");

    for terminal in &doc.terminals {
        if terminal.name == ERROR_TERMINAL_NAME {
            return Err(GrammarError::ReservedTerminalName { name: terminal.name.clone() });
        }
        if builder.add_terminal(terminal.name.clone(), terminal.discardable).is_none() {
            return Err(GrammarError::DuplicateTerminal { name: terminal.name.clone() });
        }
    }

    // All top-level variables are registered before any rule is built, so
    // forward references within rule bodies resolve.
    for variable in &doc.variables {
        if builder.add_variable(variable.name.clone(), None).is_none() {
            return Err(GrammarError::DuplicateVariable { name: variable.name.clone() });
        }
    }

    let start = builder
        .variable_id(&doc.start)
        .ok_or_else(|| GrammarError::UnknownStartVariable { name: doc.start.clone() })?;

    let mut loader = Loader { builder, error_terminal, next_aux: 0, next_precedence_set: 0 };
    for variable in &doc.variables {
        loader.build_variable_rules(variable)?;
    }

    Ok(loader.builder.finish(start, error_terminal))
}
