//! Immutable literal pool values.

use crate::ids::{LexicalScopeId, Name};
use garnet_ast::RegexpOptions;
use num_bigint::BigInt;
use std::sync::Arc;

/// Runtime modules the translator refers to directly instead of through a
/// constant lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreModule {
    /// Internal helper namespace (`when_splat`, `privately` plumbing).
    Internal,
    /// Holder of `at_exit` for `END { }` blocks.
    KernelOperations,
}

impl CoreModule {
    pub fn name(self) -> &'static str {
        match self {
            CoreModule::Internal => "Garnet::Internal",
            CoreModule::KernelOperations => "Garnet::KernelOperations",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Symbol(Name),
    /// A frozen string shared by every evaluation.
    FrozenString(Arc<str>),
    Bignum(Arc<BigInt>),
    Regexp { source: Arc<str>, options: RegexpOptions },
    Encoding(Arc<str>),
    /// The root `Object` class.
    ObjectClass,
    CoreModule(CoreModule),
    LexicalScope(LexicalScopeId),
    /// Marker for an omitted optional argument in core sources.
    NotProvided,
}
