//! garnet_core: Core utilities shared by every stage of the garnet translator.
//!
//! Provides symbol interning, source spans and line maps, and the bump arena
//! that parse trees are allocated from.

pub mod arena;
pub mod intern;
pub mod text;

pub use arena::ParseArena;
pub use intern::{InternedString, StringInterner};
pub use text::{LineMap, TextSpan};

/// Set alias using the fast non-cryptographic hasher.
pub type FxHashSet<T> = rustc_hash::FxHashSet<T>;
