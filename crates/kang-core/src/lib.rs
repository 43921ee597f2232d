//! Grammar data model and grammar-description loader for the Kang
//! indentation-sensitive language front-end.
//!
//! Two layers:
//!
//! - [`doc`] — the declarative grammar-description format (terminals,
//!   variables, and their extended-construct right-hand sides: `terminal`,
//!   `variable`, `group`, `optional`, `repeat`, `choice`, `error`, and
//!   `ordered-by-precedence` blocks).
//! - [`types`] / [`loader`] — the elaborated [`Grammar`], built by
//!   [`load`] desugaring every extended construct into plain productions
//!   over fresh auxiliary, collapsible variables.
//!
//! This crate has no knowledge of parsing: it produces a `Grammar` value and
//! stops there. Table construction and parsing live in `kang-compiler`.

mod doc;
mod error;
mod ids;
mod loader;
mod types;

#[cfg(test)]
mod loader_tests;
#[cfg(test)]
mod types_tests;

pub use doc::{AssociativityDoc, ConstructDoc, GrammarDoc, PrecedenceEntryDoc, RuleDoc, TerminalDoc, VariableDoc};
pub use error::GrammarError;
pub use ids::{RuleId, TerminalId, VariableId};
pub use loader::load;
pub use types::{Associativity, DisplayRule, Grammar, Precedence, Reference, Rule, Terminal, Variable};
