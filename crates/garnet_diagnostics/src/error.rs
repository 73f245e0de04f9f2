//! The fatal translation error.
//!
//! There is no recovery inside a unit: the first error aborts translation and
//! the host decides how to surface it (normally as a Ruby `SyntaxError`).

use crate::{Diagnostic, DiagnosticMessage};
use garnet_core::text::TextSpan;
use std::fmt;

pub type TranslateResult<T> = Result<T, TranslateError>;

/// The error categories reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `break`, `next`, `redo` or `retry` outside a construct that accepts it.
    ControlFlowSyntax,
    /// A parse node shape the translator has no rule for.
    UnsupportedShape,
    /// An argument list the translator cannot classify.
    ArgumentShape,
    /// A `Garnet`/`GarnetPrimitive` form used where it is not allowed.
    InternalFormMisuse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ControlFlowSyntax => write!(f, "syntax-use-of-control-flow-keyword"),
            ErrorKind::UnsupportedShape => write!(f, "unsupported-ast-shape"),
            ErrorKind::ArgumentShape => write!(f, "argument-shape-mismatch"),
            ErrorKind::InternalFormMisuse => write!(f, "misuse-of-internal-form"),
        }
    }
}

#[derive(thiserror::Error, miette::Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("{message}")]
    #[diagnostic(code(garnet::syntax))]
    Syntax {
        code: u32,
        message: String,
        span: TextSpan,
    },
    #[error("{message}")]
    #[diagnostic(
        code(garnet::unsupported),
        help("the parser produced a tree shape the translator has no rule for")
    )]
    UnsupportedShape {
        code: u32,
        message: String,
        span: TextSpan,
    },
    #[error("{message}")]
    #[diagnostic(code(garnet::argument_shape))]
    ArgumentShape {
        code: u32,
        message: String,
        span: TextSpan,
    },
    #[error("{message}")]
    #[diagnostic(code(garnet::internal_form))]
    InternalForm {
        code: u32,
        message: String,
        span: TextSpan,
    },
}

impl TranslateError {
    pub fn syntax(message: &DiagnosticMessage, args: &[&str], span: TextSpan) -> Self {
        TranslateError::Syntax {
            code: message.code,
            message: message.render(args),
            span,
        }
    }

    pub fn unsupported(message: &DiagnosticMessage, args: &[&str], span: TextSpan) -> Self {
        TranslateError::UnsupportedShape {
            code: message.code,
            message: message.render(args),
            span,
        }
    }

    pub fn argument_shape(message: &DiagnosticMessage, args: &[&str], span: TextSpan) -> Self {
        TranslateError::ArgumentShape {
            code: message.code,
            message: message.render(args),
            span,
        }
    }

    pub fn internal_form(message: &DiagnosticMessage, args: &[&str], span: TextSpan) -> Self {
        TranslateError::InternalForm {
            code: message.code,
            message: message.render(args),
            span,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslateError::Syntax { .. } => ErrorKind::ControlFlowSyntax,
            TranslateError::UnsupportedShape { .. } => ErrorKind::UnsupportedShape,
            TranslateError::ArgumentShape { .. } => ErrorKind::ArgumentShape,
            TranslateError::InternalForm { .. } => ErrorKind::InternalFormMisuse,
        }
    }

    pub fn span(&self) -> TextSpan {
        match self {
            TranslateError::Syntax { span, .. }
            | TranslateError::UnsupportedShape { span, .. }
            | TranslateError::ArgumentShape { span, .. }
            | TranslateError::InternalForm { span, .. } => *span,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            TranslateError::Syntax { code, .. }
            | TranslateError::UnsupportedShape { code, .. }
            | TranslateError::ArgumentShape { code, .. }
            | TranslateError::InternalForm { code, .. } => *code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TranslateError::Syntax { message, .. }
            | TranslateError::UnsupportedShape { message, .. }
            | TranslateError::ArgumentShape { message, .. }
            | TranslateError::InternalForm { message, .. } => message,
        }
    }

    /// Convert into a located diagnostic for the host's reporting sink.
    pub fn to_diagnostic(&self, file: &str) -> Diagnostic {
        Diagnostic {
            code: self.code(),
            severity: crate::Severity::Error,
            text: self.message().to_string(),
            file: Some(file.to_string()),
            span: Some(self.span()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages;

    #[test]
    fn test_kind_and_code() {
        let err = TranslateError::syntax(&messages::INVALID_RETRY, &[], TextSpan::new(3, 5));
        assert_eq!(err.kind(), ErrorKind::ControlFlowSyntax);
        assert_eq!(err.code(), 1004);
        assert_eq!(err.to_string(), "Invalid retry");
        assert_eq!(err.span(), TextSpan::new(3, 5));
    }

    #[test]
    fn test_to_diagnostic_keeps_location() {
        let err = TranslateError::argument_shape(
            &messages::UNKNOWN_ARGUMENT_NODE_0,
            &["Hash"],
            TextSpan::new(0, 2),
        );
        let diag = err.to_diagnostic("lib/a.rb");
        assert!(diag.is_error());
        assert_eq!(diag.file.as_deref(), Some("lib/a.rb"));
        assert_eq!(diag.text, "Unknown argument node type: Hash");
        assert_eq!(err.kind().to_string(), "argument-shape-mismatch");
    }

    #[test]
    fn test_internal_form_kind() {
        let err = TranslateError::internal_form(
            &messages::_0_EXPECTS_A_BLOCK,
            &["Garnet.privately"],
            TextSpan::new(4, 7),
        );
        assert_eq!(err.kind(), ErrorKind::InternalFormMisuse);
        assert_eq!(err.code(), 1011);
        assert_eq!(err.span(), TextSpan::new(4, 7));
        assert_eq!(err.to_string(), "'Garnet.privately' expects a literal block");
    }
}
