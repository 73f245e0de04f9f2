//! garnet_scanner: Heredoc scanning support for the external lexer.
//!
//! The lexer proper lives outside this workspace. What lives here is the
//! part of string scanning whose rules decide the shape of the literal nodes
//! the translator sees: heredoc terminator matching, escape processing,
//! interpolation boundaries and squiggly-heredoc dedenting.

mod escape;
mod heredoc;

pub use escape::{read_escape, EscapeError};
pub use heredoc::{
    dedent_squiggly, heredoc_indent_of, HeredocBody, HeredocError, HeredocPart, HeredocTerm,
    StrFuncFlags, TAB_WIDTH,
};
