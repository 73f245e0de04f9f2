//! The per-unit scope tracker.

use crate::frame::{Frame, FrameId, FrameKind};
use garnet_core::intern::StringInterner;
use garnet_optree::{BreakId, LexicalScopeId, LocalSlot, Name, ReturnId};
use tracing::trace;

/// Scope state for one compilation unit.
///
/// Frames are stored flat and point at their parent by id, so a child
/// translator can hold a frame id while the environment stays mutably
/// borrowable.
pub struct ParseEnvironment {
    interner: StringInterner,
    frames: Vec<Frame>,
    /// Parent of each lexical scope; index 0 is the top-level scope.
    lexical_scopes: Vec<Option<LexicalScopeId>>,
    current_lexical_scope: LexicalScopeId,
    dynamic_constant_lookup: bool,
    next_temp: u32,
    next_return_id: u32,
    next_break_id: u32,
}

impl ParseEnvironment {
    /// Create an environment with a top-level frame.
    pub fn new(interner: StringInterner) -> Self {
        let mut env = Self {
            interner,
            frames: Vec::new(),
            lexical_scopes: vec![None],
            current_lexical_scope: LexicalScopeId::ROOT,
            dynamic_constant_lookup: false,
            next_temp: 0,
            next_return_id: 0,
            next_break_id: 0,
        };
        let root = env.push_frame(None, FrameKind::TopLevel);
        let return_id = env.allocate_return_id();
        env.frame_mut(root).return_id = Some(return_id);
        env
    }

    #[inline]
    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    #[inline]
    pub fn root(&self) -> FrameId {
        FrameId(0)
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Create a frame nested in `parent`. Blocks inherit the parent's block
    /// depth plus one.
    pub fn push_frame(&mut self, parent: Option<FrameId>, kind: FrameKind) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        let mut frame = Frame::new(id, parent, kind);
        if let Some(parent) = parent {
            let parent = self.frame(parent);
            if frame.is_block() {
                frame.block_depth = parent.block_depth + 1;
                frame.method_name = parent.method_name.clone();
            }
        }
        trace!(frame = id.0, kind = ?kind, parent = ?parent.map(|p| p.0), "new environment");
        self.frames.push(frame);
        id
    }

    #[inline]
    pub fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.index()]
    }

    #[inline]
    pub fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        &mut self.frames[id.index()]
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The frame `depth` levels out from `from`, stopping at the outermost.
    pub fn ancestor(&self, from: FrameId, depth: u32) -> FrameId {
        let mut current = from;
        for _ in 0..depth {
            match self.frame(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// The nearest frame, starting at `from`, where new locals are declared.
    pub fn nearest_own_scope(&self, from: FrameId) -> FrameId {
        let mut current = from;
        while !self.frame(current).own_scope {
            match self.frame(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// The nearest enclosing frame that is not a block.
    pub fn method_frame(&self, from: FrameId) -> FrameId {
        let mut current = from;
        while self.frame(current).is_block() {
            match self.frame(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    // ========================================================================
    // Locals
    // ========================================================================

    /// Declare `name` in `frame`. Idempotent.
    pub fn declare_local(&mut self, frame: FrameId, name: Name) -> LocalSlot {
        let index = self.frame_mut(frame).declare(name);
        LocalSlot {
            name,
            index,
            depth: 0,
        }
    }

    /// Look `name` up in `frame` only.
    pub fn find_local_in_frame(&self, frame: FrameId, name: Name) -> Option<LocalSlot> {
        self.frame(frame).find(name).map(|index| LocalSlot {
            name,
            index,
            depth: 0,
        })
    }

    /// Resolve `name` from `from` outward through enclosing block frames,
    /// stopping after the first frame that is not a block. A slot found in
    /// an enclosing frame marks every frame crossed as needing access to its
    /// declaration frame.
    pub fn resolve_local(&mut self, from: FrameId, name: Name) -> Option<LocalSlot> {
        let mut current = from;
        let mut depth = 0;
        loop {
            if let Some(index) = self.frame(current).find(name) {
                if depth > 0 {
                    let mut crossed = from;
                    while crossed != current {
                        let frame = self.frame_mut(crossed);
                        frame.needs_declaration_frame = true;
                        match frame.parent {
                            Some(parent) => crossed = parent,
                            None => break,
                        }
                    }
                }
                return Some(LocalSlot { name, index, depth });
            }
            let frame = self.frame(current);
            if !frame.is_block() {
                return None;
            }
            match frame.parent {
                Some(parent) => {
                    current = parent;
                    depth += 1;
                }
                None => return None,
            }
        }
    }

    /// Allocate a compiler temporary in `frame`. Names start with `%`, which
    /// no Ruby identifier can, and carry a unit-wide counter.
    pub fn allocate_local_temp(&mut self, frame: FrameId, prefix: &str) -> LocalSlot {
        let name = self.allocate_temp_name(prefix);
        self.declare_local(frame, name)
    }

    /// Allocate a temporary name without declaring it anywhere.
    pub fn allocate_temp_name(&mut self, prefix: &str) -> Name {
        let name = format!("%{}_{}", prefix, self.next_temp);
        self.next_temp += 1;
        self.interner.intern(&name)
    }

    /// Allocate a flip-flop state slot in `frame`; the unit initialises it
    /// on entry.
    pub fn allocate_flip_flop_state(&mut self, frame: FrameId) -> LocalSlot {
        let slot = self.allocate_local_temp(frame, "flipflop");
        self.frame_mut(frame).flip_flop_states.push(slot);
        slot
    }

    // ========================================================================
    // Non-local exit ids
    // ========================================================================

    pub fn allocate_return_id(&mut self) -> ReturnId {
        let id = ReturnId(self.next_return_id);
        self.next_return_id += 1;
        id
    }

    pub fn allocate_break_id(&mut self) -> BreakId {
        let id = BreakId(self.next_break_id);
        self.next_break_id += 1;
        id
    }

    // ========================================================================
    // Lexical scopes
    // ========================================================================

    #[inline]
    pub fn current_lexical_scope(&self) -> LexicalScopeId {
        self.current_lexical_scope
    }

    pub fn lexical_scope_parent(&self, scope: LexicalScopeId) -> Option<LexicalScopeId> {
        self.lexical_scopes.get(scope.0 as usize).copied().flatten()
    }

    /// Enter a new lexical scope nested in the current one, returning the
    /// scope to hand back to [`pop_lexical_scope`](Self::pop_lexical_scope).
    pub fn push_lexical_scope(&mut self) -> LexicalScopeId {
        let previous = self.current_lexical_scope;
        let scope = LexicalScopeId(self.lexical_scopes.len() as u32);
        self.lexical_scopes.push(Some(previous));
        self.current_lexical_scope = scope;
        previous
    }

    pub fn pop_lexical_scope(&mut self, previous: LexicalScopeId) {
        self.current_lexical_scope = previous;
    }

    // ========================================================================
    // Dynamic constant lookup
    // ========================================================================

    #[inline]
    pub fn is_dynamic_constant_lookup(&self) -> bool {
        self.dynamic_constant_lookup
    }

    /// Set the flag, returning the previous value for the caller to restore.
    pub fn set_dynamic_constant_lookup(&mut self, dynamic: bool) -> bool {
        std::mem::replace(&mut self.dynamic_constant_lookup, dynamic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> ParseEnvironment {
        ParseEnvironment::new(StringInterner::new())
    }

    #[test]
    fn test_root_frame_has_return_id() {
        let env = env();
        let root = env.frame(env.root());
        assert_eq!(root.kind, FrameKind::TopLevel);
        assert_eq!(root.return_id, Some(ReturnId(0)));
    }

    #[test]
    fn test_declare_is_idempotent() {
        let mut env = env();
        let root = env.root();
        let x = env.interner().intern("x");
        let a = env.declare_local(root, x);
        let b = env.declare_local(root, x);
        assert_eq!(a, b);
        assert_eq!(env.frame(root).local_count(), 1);
    }

    #[test]
    fn test_lexical_scope_push_pop() {
        let mut env = env();
        let previous = env.push_lexical_scope();
        let inner = env.current_lexical_scope();
        assert_ne!(inner, previous);
        assert_eq!(env.lexical_scope_parent(inner), Some(LexicalScopeId::ROOT));
        env.pop_lexical_scope(previous);
        assert_eq!(env.current_lexical_scope(), LexicalScopeId::ROOT);
    }

    #[test]
    fn test_dynamic_constant_lookup_restore() {
        let mut env = env();
        let previous = env.set_dynamic_constant_lookup(true);
        assert!(!previous);
        assert!(env.is_dynamic_constant_lookup());
        env.set_dynamic_constant_lookup(previous);
        assert!(!env.is_dynamic_constant_lookup());
    }
}
