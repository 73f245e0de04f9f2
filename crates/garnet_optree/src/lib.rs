//! garnet_optree: The operation tree produced by the translator.
//!
//! Nodes are passive data. Each owns its children; the only sharing is
//! read-only literal pool values behind `Arc`. Every node may carry a source
//! span, assigned at most once, and a newline flag marking stepping and
//! coverage points.

pub mod ids;
pub mod literal;
pub mod node;
pub mod unit;
mod walk;

pub use ids::{BreakId, LexicalScopeId, LocalSlot, Name, ReturnId};
pub use literal::{CoreModule, Literal};
pub use node::*;
pub use unit::{Arity, BlockDefinition, ExecutableUnit, ProcKind, UnitKind};
