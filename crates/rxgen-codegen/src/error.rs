//! Error types for code generation.

use thiserror::Error;

/// Result type alias for codegen operations.
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Errors that can occur during code generation.
///
/// Problems in user declarations are diagnostics, not errors; these only
/// arise when a descriptor cannot be turned back into Rust syntax or a
/// template fails.
#[derive(Error, Debug)]
pub enum CodegenError {
    /// A rendered type from a descriptor does not parse.
    #[error("invalid type `{ty}` on `{owner}`: {message}")]
    InvalidType {
        owner: String,
        ty: String,
        message: String,
    },

    /// An identifier, path or expression from a descriptor does not parse.
    #[error("invalid {kind} `{text}`: {message}")]
    InvalidSyntax {
        kind: &'static str,
        text: String,
        message: String,
    },

    /// The emitted items do not form a valid file.
    #[error("generated code for `{unit}` does not parse: {message}")]
    Unparsable { unit: String, message: String },

    /// A model referenced from generated code is missing.
    #[error("model `{0}` is not declared")]
    UnknownModel(String),

    /// A hand-written method the emitter needs is missing.
    #[error("method `{method}` not found on `{model}`")]
    MissingMethod { model: String, method: String },

    /// Template rendering error.
    #[error("Template error: {0}")]
    TemplateError(#[from] handlebars::RenderError),

    /// Invalid template.
    #[error("Invalid template: {0}")]
    InvalidTemplate(#[from] handlebars::TemplateError),
}
