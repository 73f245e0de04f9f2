//! garnet_scope: Compile-time scope tracking.
//!
//! A [`ParseEnvironment`] holds everything one compilation unit needs while
//! it is translated: a tree of [`Frame`]s (one per method, block, module or
//! top-level body), the lexical scope chain for unqualified constants, and
//! the unit-wide counters for temporaries and non-local exit ids.

mod environment;
mod frame;

pub use environment::ParseEnvironment;
pub use frame::{Frame, FrameId, FrameKind, MethodParameters};
