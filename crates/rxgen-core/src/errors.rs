//! Error types for the model compiler.

use crate::diagnostics::{codes, Diagnostic, DiagnosticCode};
use crate::types::{SourceLocation, Span};
use thiserror::Error;

/// Problems found while extracting descriptors from a declaration.
///
/// These never abort a compilation: the analyzer turns each one into a
/// [`Diagnostic`] and keeps going with the remaining declarations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalyzeError {
    #[error("failed to parse declarations: {message}")]
    Parse { message: String, span: Span },

    #[error("invalid attribute `#[{attribute}]`: {message}")]
    InvalidAttribute {
        attribute: String,
        message: String,
        span: Span,
    },

    #[error("{message}")]
    InvalidModelShape { message: String, span: Span },

    #[error("struct `{name}` uses `#[{attribute}]` but is not marked #[model]")]
    MissingModelAttribute {
        name: String,
        attribute: String,
        span: Span,
    },

    #[error("field `{field}` carries conflicting attributes `#[{first}]` and `#[{second}]`")]
    ConflictingAttributes {
        field: String,
        first: String,
        second: String,
        span: Span,
    },
}

impl AnalyzeError {
    /// Registry entry this error is reported under.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::Parse { .. } => codes::PARSE_FAILURE,
            // A malformed attribute argument is a structural defect of the declaration.
            Self::InvalidAttribute { .. } | Self::InvalidModelShape { .. } => {
                codes::INVALID_MODEL_SHAPE
            }
            Self::MissingModelAttribute { .. } => codes::MISSING_MODEL_ATTRIBUTE,
            Self::ConflictingAttributes { .. } => codes::CONFLICTING_ATTRIBUTES,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Parse { span, .. }
            | Self::InvalidAttribute { span, .. }
            | Self::InvalidModelShape { span, .. }
            | Self::MissingModelAttribute { span, .. }
            | Self::ConflictingAttributes { span, .. } => *span,
        }
    }

    /// Convert into a diagnostic anchored in `file`.
    pub fn into_diagnostic(self, file: &str) -> Diagnostic {
        let location = SourceLocation::new(file, self.span());
        let help = match &self {
            Self::MissingModelAttribute { .. } => Some("add #[model] to the struct"),
            Self::ConflictingAttributes { .. } => Some("keep exactly one member attribute"),
            _ => None,
        };
        let diagnostic = Diagnostic::new(self.code(), self.to_string(), location);
        match help {
            Some(help) => diagnostic.with_help(help),
            None => diagnostic,
        }
    }
}
