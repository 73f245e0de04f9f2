//! garnet_translator: Ruby parse tree to operation tree translation.
//!
//! Walks one parsed unit with a [`BodyTranslator`] per lexical body and
//! produces the [`ExecutableUnit`](garnet_optree::ExecutableUnit) tree the
//! execution engine runs. Syntax the grammar accepts but Ruby rejects
//! (`break` at the top level, say) is reported here.

mod assign;
mod calls;
mod context;
mod control;
mod definitions;
mod literals;
mod params;
mod rescue;
mod translator;

pub use context::{TranslatorFlags, UnitContext};
pub use definitions::{block_name, translate_program};
pub use literals::named_captures;
pub use params::arity_of;
pub use translator::BodyTranslator;

/// The local a method stores its incoming block in, read by `yield` and
/// implicit `super`.
pub(crate) const METHOD_BLOCK_NAME: &str = "%method_block_arg";
