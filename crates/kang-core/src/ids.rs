//! Arena index types for the grammar model.
//!
//! Ids index into flat arenas owned by [`crate::Grammar`]; no back-reference
//! to the enclosing grammar is stored. Callers always resolve through the
//! `Grammar` value they already hold.

use std::fmt;

macro_rules! arena_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Construct from a raw arena index. Only the crate's own arenas should call this.
            #[inline]
            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            /// Raw arena index, for indexing into the owning `Vec`.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

arena_id!(TerminalId, "Index of a [`crate::Terminal`] within a [`crate::Grammar`].");
arena_id!(VariableId, "Index of a [`crate::Variable`] within a [`crate::Grammar`].");
arena_id!(RuleId, "Index of a [`crate::Rule`] within a [`crate::Grammar`].");
