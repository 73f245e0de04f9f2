//! garnet_diagnostics: Diagnostic messages and translation errors.
//!
//! Every message the translator can report lives in the [`messages`] table
//! with a stable code. A fatal [`TranslateError`] aborts the unit being
//! translated and converts into a [`Diagnostic`] for the host's error
//! reporting.

mod error;

pub use error::{ErrorKind, TranslateError, TranslateResult};

use garnet_core::text::TextSpan;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Informational; translation continues.
    Note,
    /// Aborts the unit.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Note => "note",
            Severity::Error => "error",
        })
    }
}

/// A message template from the [`messages`] table. `{0}`, `{1}` and so on
/// are replaced by the arguments given when it is reported.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub severity: Severity,
    pub template: &'static str,
}

impl DiagnosticMessage {
    const fn error(code: u32, template: &'static str) -> Self {
        Self { code, severity: Severity::Error, template }
    }

    const fn note(code: u32, template: &'static str) -> Self {
        Self { code, severity: Severity::Note, template }
    }

    /// The template with its placeholders filled in.
    pub fn render(&self, args: &[&str]) -> String {
        format_message(self.template, args)
    }
}

/// Fill `{n}` placeholders in order of the argument list.
pub fn format_message(template: &str, args: &[&str]) -> String {
    args.iter().enumerate().fold(template.to_string(), |text, (i, arg)| {
        text.replace(&format!("{{{}}}", i), arg)
    })
}

/// A reported message, optionally tied to a file and byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: u32,
    pub severity: Severity,
    pub text: String,
    pub file: Option<String>,
    pub span: Option<TextSpan>,
}

impl Diagnostic {
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            code: message.code,
            severity: message.severity,
            text: message.render(args),
            file: None,
            span: None,
        }
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at(mut self, span: TextSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.span) {
            (Some(file), Some(span)) => write!(f, "{}@{}: ", file, span.start)?,
            (Some(file), None) => write!(f, "{}: ", file)?,
            _ => {}
        }
        write!(f, "{} GR{}: {}", self.severity, self.code, self.text)
    }
}

/// Diagnostics gathered from a batch of units.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Order by file, then by offset; located entries before unlocated ones
    /// in the same file.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| match (a.span, b.span) {
                    (Some(x), Some(y)) => x.start.cmp(&y.start),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        });
    }
}

pub mod messages {
    use super::DiagnosticMessage;

    // ========================================================================
    // Control-flow keywords used outside a valid construct (1000-1099)
    // ========================================================================
    pub const INVALID_BREAK: DiagnosticMessage = DiagnosticMessage::error(1001, "Invalid break");
    pub const INVALID_NEXT: DiagnosticMessage = DiagnosticMessage::error(1002, "Invalid next");
    pub const INVALID_REDO: DiagnosticMessage = DiagnosticMessage::error(1003, "Invalid redo");
    pub const INVALID_RETRY: DiagnosticMessage = DiagnosticMessage::error(1004, "Invalid retry");

    // Internal forms (1010-1019)
    pub const _0_IS_ONLY_AVAILABLE_IN_CORE_SOURCES: DiagnosticMessage = DiagnosticMessage::error(1010, "'{0}' is only available in core library sources");
    pub const _0_EXPECTS_A_BLOCK: DiagnosticMessage = DiagnosticMessage::error(1011, "'{0}' expects a literal block");

    // ========================================================================
    // Unsupported parse tree shapes (2000-2099)
    // ========================================================================
    pub const UNSUPPORTED_NODE_0: DiagnosticMessage = DiagnosticMessage::error(2001, "Unsupported node in expression position: {0}");
    pub const UNSUPPORTED_MULTIPLE_ASSIGNMENT: DiagnosticMessage = DiagnosticMessage::error(2002, "Unsupported multiple assignment shape");
    pub const CANNOT_ASSIGN_TO_0: DiagnosticMessage = DiagnosticMessage::error(2003, "Cannot assign to {0}");
    pub const UNSUPPORTED_METHOD_NAME_NODE_0: DiagnosticMessage = DiagnosticMessage::error(2004, "Unsupported method name node: {0}");
    pub const UNSUPPORTED_RESCUE_LIST_0: DiagnosticMessage = DiagnosticMessage::error(2005, "Unsupported rescue exception list: {0}");

    // ========================================================================
    // Argument shapes (3000-3099)
    // ========================================================================
    pub const UNKNOWN_ARGUMENT_NODE_0: DiagnosticMessage = DiagnosticMessage::error(3001, "Unknown argument node type: {0}");
    pub const UNKNOWN_INDEX_ARGUMENT_NODE_0: DiagnosticMessage = DiagnosticMessage::error(3002, "Unknown index argument node type: {0}");

    // ========================================================================
    // Scanner (4000-4099)
    // ========================================================================
    pub const CANT_FIND_STRING_0_ANYWHERE_BEFORE_EOF: DiagnosticMessage = DiagnosticMessage::error(4001, "can't find string \"{0}\" anywhere before EOF");
    pub const INVALID_ESCAPE_0: DiagnosticMessage = DiagnosticMessage::error(4002, "invalid escape sequence: {0}");
    pub const UNTERMINATED_INTERPOLATION: DiagnosticMessage = DiagnosticMessage::error(4003, "unterminated string interpolation");
    pub const INVALID_HEREDOC_OPENER_0: DiagnosticMessage = DiagnosticMessage::error(4004, "invalid heredoc opener: {0}");

    // ========================================================================
    // Informational (9000-9099)
    // ========================================================================
    pub const DYNAMIC_CONSTANT_LOOKUP_AT_0: DiagnosticMessage = DiagnosticMessage::note(9001, "dynamic constant lookup at {0}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        assert_eq!(messages::CANNOT_ASSIGN_TO_0.render(&["self"]), "Cannot assign to self");
        assert_eq!(format_message("{1} before {0}", &["a", "b"]), "b before a");
    }

    #[test]
    fn test_located_display() {
        let diag = Diagnostic::new(&messages::INVALID_NEXT, &[]).in_file("main.rb").at(TextSpan::new(10, 4));
        assert_eq!(diag.to_string(), "main.rb@10: error GR1002: Invalid next");
        let bare = Diagnostic::new(&messages::UNSUPPORTED_MULTIPLE_ASSIGNMENT, &[]);
        assert_eq!(bare.to_string(), "error GR2002: Unsupported multiple assignment shape");
    }

    #[test]
    fn test_note_is_not_error() {
        let diag = Diagnostic::new(&messages::DYNAMIC_CONSTANT_LOOKUP_AT_0, &["3"]);
        assert!(!diag.is_error());
        assert_eq!(diag.text, "dynamic constant lookup at 3");
    }

    #[test]
    fn test_collection_sorts_by_file_then_offset() {
        let mut collection = DiagnosticCollection::new();
        collection.add(Diagnostic::new(&messages::INVALID_REDO, &[]).in_file("b.rb").at(TextSpan::new(10, 1)));
        collection.add(Diagnostic::new(&messages::INVALID_HEREDOC_OPENER_0, &["<<"]).in_file("a.rb"));
        collection.add(Diagnostic::new(&messages::INVALID_RETRY, &[]).in_file("a.rb").at(TextSpan::new(5, 1)));
        collection.sort();
        assert!(collection.has_errors());
        let codes: Vec<u32> = collection.diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![1004, 4004, 1003]);
    }
}
