//! Loader error taxonomy. Every way a grammar description can fail to
//! elaborate gets its own `thiserror` variant rather than a bare string,
//! each carrying the specific reason with an `#[error("...")]` message.

#[derive(Debug, Clone, thiserror::Error)]
pub enum GrammarError {
    #[error("duplicate terminal name {name:?}")]
    DuplicateTerminal { name: String },

    #[error("duplicate variable name {name:?}")]
    DuplicateVariable { name: String },

    #[error("start variable {name:?} is not declared among the grammar's variables")]
    UnknownStartVariable { name: String },

    #[error("reference to unknown terminal {name:?}")]
    UnknownTerminalReference { name: String },

    #[error("reference to unknown variable {name:?}")]
    UnknownVariableReference { name: String },

    #[error("reference to reserved terminal name {name:?}; it is registered automatically")]
    ReservedTerminalName { name: String },

    #[error("repeat construct has min={min} > max={max}")]
    RepeatMinGreaterThanMax { min: u32, max: u32 },

    #[error("grammar declares no variables")]
    NoVariables,

    #[error("malformed grammar document: {reason}")]
    Malformed { reason: String },
}
