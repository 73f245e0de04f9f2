//! garnet_ast: The parse tree handed over by the external Ruby parser.
//!
//! The tree is immutable and arena allocated: every child is an `&'a`
//! reference into the unit's [`garnet_core::ParseArena`], every name an
//! `&'a str` in the same arena.

pub mod generated;
pub mod node;
pub mod types;

pub use node::*;
pub use types::{NodeFlags, RegexpOptions};
