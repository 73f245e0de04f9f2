//! Arena allocation for parse trees.
//!
//! The external parser allocates every parse node, name and child list from
//! one bump arena; the whole tree is freed at once when the unit is done.

use bumpalo::Bump;

/// Bump arena owning one compilation unit's parse tree.
#[derive(Default)]
pub struct ParseArena {
    bump: Bump,
}

impl ParseArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn bump(&self) -> &Bump {
        &self.bump
    }

    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}
