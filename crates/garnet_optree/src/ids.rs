//! Identifiers embedded in operation nodes.

use garnet_core::intern::InternedString;
use std::fmt;

/// Method, variable and constant names.
pub type Name = InternedString;

/// Tags a `return` with the method or lambda invocation it leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReturnId(pub u32);

/// Tags a `break` with the loop or block call site it leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakId(pub u32);

/// One entry of the lexical scope chain used for unqualified constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LexicalScopeId(pub u32);

impl LexicalScopeId {
    /// The top-level scope, whose module is `Object`.
    pub const ROOT: LexicalScopeId = LexicalScopeId(0);
}

impl fmt::Display for ReturnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "return#{}", self.0)
    }
}

impl fmt::Display for BreakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "break#{}", self.0)
    }
}

/// A resolved local variable: the declaring frame is `depth` frames out
/// from the frame executing the read or write, and `index` is the slot's
/// position in that frame's local table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalSlot {
    pub name: Name,
    pub index: u32,
    pub depth: u32,
}

impl LocalSlot {
    /// Whether access goes through an enclosing declaration frame.
    pub fn is_declaration(&self) -> bool {
        self.depth > 0
    }
}
