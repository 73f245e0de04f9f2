//! One scope-tracking frame.

use garnet_optree::{BreakId, LocalSlot, Name, ReturnId};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl FrameId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    TopLevel,
    Method,
    Block,
    Lambda,
    ModuleBody,
}

/// Slot names holding a method's parameters, as `super` without
/// arguments forwards them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodParameters {
    pub pre: Vec<Name>,
    pub optional: Vec<Name>,
    pub rest: Option<Name>,
    pub post: Vec<Name>,
    pub keywords: Vec<Name>,
    pub keyword_rest: Option<Name>,
    pub block: Option<Name>,
}

#[derive(Debug)]
pub struct Frame {
    pub id: FrameId,
    pub parent: Option<FrameId>,
    pub kind: FrameKind,
    locals: IndexMap<Name, u32>,
    /// Assignments to undeclared names create the local here. False only
    /// for `for` bodies.
    pub own_scope: bool,
    /// Assignments always declare in this frame, never an ancestor.
    pub never_assign_in_parent_scope: bool,
    /// Target of `break` in this body, if any.
    pub break_id: Option<BreakId>,
    /// Target of `return`: the enclosing method's for procs.
    pub return_id: Option<ReturnId>,
    pub flip_flop_states: Vec<LocalSlot>,
    pub block_depth: u32,
    /// The name of the enclosing method, for block backtrace names.
    pub method_name: Option<String>,
    pub needs_declaration_frame: bool,
    pub parameters: Option<MethodParameters>,
}

impl Frame {
    pub(crate) fn new(id: FrameId, parent: Option<FrameId>, kind: FrameKind) -> Self {
        Self {
            id,
            parent,
            kind,
            locals: IndexMap::new(),
            own_scope: true,
            never_assign_in_parent_scope: !matches!(kind, FrameKind::Block | FrameKind::Lambda),
            break_id: None,
            return_id: None,
            flip_flop_states: Vec::new(),
            block_depth: 0,
            method_name: None,
            needs_declaration_frame: false,
            parameters: None,
        }
    }

    #[inline]
    pub fn is_block(&self) -> bool {
        matches!(self.kind, FrameKind::Block | FrameKind::Lambda)
    }

    #[inline]
    pub fn is_module_body(&self) -> bool {
        self.kind == FrameKind::ModuleBody
    }

    /// Declare `name`, returning its slot index. Repeat declarations return
    /// the existing slot.
    pub fn declare(&mut self, name: Name) -> u32 {
        let next = self.locals.len() as u32;
        *self.locals.entry(name).or_insert(next)
    }

    pub fn find(&self, name: Name) -> Option<u32> {
        self.locals.get(&name).copied()
    }

    /// Declared names in slot order.
    pub fn local_names(&self) -> Vec<Name> {
        self.locals.keys().copied().collect()
    }

    pub fn local_count(&self) -> usize {
        self.locals.len()
    }
}
