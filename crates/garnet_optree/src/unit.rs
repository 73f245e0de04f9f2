//! Executable units: the callable bodies the execution engine runs.

use crate::ids::{BreakId, LexicalScopeId, LocalSlot, Name, ReturnId};
use crate::node::OpNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    TopLevel,
    Method,
    Proc,
    Lambda,
    ModuleBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcKind {
    Proc,
    Lambda,
}

/// The parameter shape of a method, block or lambda.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Arity {
    /// Leading required parameters.
    pub required: u32,
    pub optional: u32,
    pub rest: bool,
    /// Required parameters after the rest parameter.
    pub post: u32,
    /// Keyword parameter names, required ones first.
    pub keywords: Vec<Name>,
    pub required_keywords: u32,
    pub keyword_rest: bool,
    pub block: bool,
}

impl Arity {
    pub const NO_ARGUMENTS: Arity = Arity {
        required: 0,
        optional: 0,
        rest: false,
        post: 0,
        keywords: Vec::new(),
        required_keywords: 0,
        keyword_rest: false,
        block: false,
    };

    /// Number of positional arguments that must be passed.
    pub fn required_positional(&self) -> u32 {
        self.required + self.post
    }

    /// The value `Proc#arity` and `Method#arity` report: the required count,
    /// or its one's complement when optional arguments are accepted.
    pub fn arity_number(&self) -> i32 {
        let mut required = self.required_positional() as i32;
        if self.required_keywords > 0 {
            required += 1;
        }
        let optional_keywords = self.keywords.len() as u32 > self.required_keywords;
        if self.optional > 0
            || self.rest
            || ((optional_keywords || self.keyword_rest) && self.required_keywords == 0)
        {
            -(required + 1)
        } else {
            required
        }
    }
}

/// A self-contained callable body.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutableUnit {
    /// Backtrace name: `<main>`, `foo`, `block in foo`, `<class:Foo>`.
    pub name: String,
    pub kind: UnitKind,
    pub arity: Arity,
    /// Slot names of the unit's frame, in slot order.
    pub locals: Vec<Name>,
    /// False for `for` bodies, whose locals live in the enclosing frame.
    pub own_scope: bool,
    pub return_id: Option<ReturnId>,
    pub break_id: Option<BreakId>,
    pub block_depth: u32,
    pub lexical_scope: LexicalScopeId,
    /// Some read or write reaches into an enclosing frame.
    pub needs_declaration_frame: bool,
    pub body: OpNode,
}

impl ExecutableUnit {
    pub fn is_block(&self) -> bool {
        matches!(self.kind, UnitKind::Proc | UnitKind::Lambda)
    }
}

/// A literal block or lambda at its creation site.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDefinition {
    pub kind: ProcKind,
    pub unit: ExecutableUnit,
    pub break_id: BreakId,
    /// Set while the call the block was passed to is running.
    pub frame_on_stack_marker: Option<LocalSlot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arity(required: u32, optional: u32, rest: bool, post: u32) -> Arity {
        Arity {
            required,
            optional,
            rest,
            post,
            ..Arity::NO_ARGUMENTS
        }
    }

    #[test]
    fn test_arity_number_fixed() {
        assert_eq!(Arity::NO_ARGUMENTS.arity_number(), 0);
        assert_eq!(arity(2, 0, false, 0).arity_number(), 2);
        assert_eq!(arity(1, 0, false, 1).arity_number(), 2);
    }

    #[test]
    fn test_arity_number_variable() {
        assert_eq!(arity(1, 1, false, 0).arity_number(), -2);
        assert_eq!(arity(0, 0, true, 0).arity_number(), -1);
        assert_eq!(arity(2, 0, true, 1).arity_number(), -4);
    }

    #[test]
    fn test_arity_required_keywords_count_once() {
        let mut a = arity(1, 0, false, 0);
        a.required_keywords = 2;
        a.keywords = Vec::new();
        assert_eq!(a.arity_number(), 2);
    }
}
