//! The declarative grammar-description format: an externally-tagged
//! `serde::Deserialize` enum with a `kind` tag, mirroring tree-sitter's
//! `grammar.json` `Rule` enum. The loader ([`crate::loader`]) lowers this
//! into a [`crate::Grammar`].

use serde::Deserialize;

/// Top-level grammar description document.
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarDoc {
    /// Name of the start variable; must be declared in `variables`.
    pub start: String,
    #[serde(default)]
    pub terminals: Vec<TerminalDoc>,
    pub variables: Vec<VariableDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerminalDoc {
    pub name: String,
    #[serde(default)]
    pub discardable: bool,
}

/// One non-terminal's definition. `rules` holds plain (non-precedence-ordered)
/// productions; `precedence_blocks` holds zero or more `ordered-by-precedence`
/// blocks — each inner `Vec` is one block, and entries within a block
/// are ordered by ascending precedence level.
#[derive(Debug, Clone, Deserialize)]
pub struct VariableDoc {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleDoc>,
    #[serde(default)]
    pub precedence_blocks: Vec<Vec<PrecedenceEntryDoc>>,
}

/// A rule's right-hand side: a sequence of constructs, desugared left to
/// right by [`crate::loader`].
pub type RuleDoc = Vec<ConstructDoc>;

/// One entry of an `ordered-by-precedence` block. A bare `Rule` entry
/// carries its own associativity; a `Group` entry shares one associativity
/// (and therefore one precedence level) across several alternative rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrecedenceEntryDoc {
    Rule {
        #[serde(default)]
        associativity: AssociativityDoc,
        rule: RuleDoc,
    },
    Group {
        #[serde(default)]
        associativity: AssociativityDoc,
        rules: Vec<RuleDoc>,
    },
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociativityDoc {
    #[default]
    None,
    Left,
    Right,
}

impl GrammarDoc {
    /// Parses a grammar description from its JSON surface syntax.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

/// One element of a rule's right-hand side, in the extended-construct surface
/// language. Lowered into plain [`crate::Reference`]s (and, for the
/// recursive constructs, fresh auxiliary [`crate::Variable`]s) by the loader.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstructDoc {
    /// `terminal T (preserved=yes|no)`. `preserved: None` defers to the
    /// terminal's own `discardable` flag.
    Terminal {
        name: String,
        #[serde(default)]
        preserved: Option<bool>,
    },
    /// `variable V`.
    Variable { name: String },
    /// `group { items }`.
    Group { items: RuleDoc },
    /// `optional { items }`.
    Optional { items: RuleDoc },
    /// `repeat min=m (max=n)? { items }`. `max: None` is the unbounded form.
    Repeat {
        min: u32,
        #[serde(default)]
        max: Option<u32>,
        items: RuleDoc,
    },
    /// `choice { alt1 alt2 ... }`.
    Choice { alternatives: Vec<RuleDoc> },
    /// `error`.
    Error,
}
