//! Diagnostics and the registry of stable diagnostic codes.
//!
//! Codes are a compatibility surface: tooling filters on them, so a code is
//! never renumbered or reused for a different failure category.

use crate::types::SourceLocation;
use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
            Self::Info => f.write_str("info"),
        }
    }
}

/// A registered diagnostic category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DiagnosticCode {
    pub id: &'static str,
    pub severity: Severity,
    pub title: &'static str,
}

impl DiagnosticCode {
    const fn new(id: &'static str, severity: Severity, title: &'static str) -> Self {
        Self {
            id,
            severity,
            title,
        }
    }
}

/// The diagnostic registry.
pub mod codes {
    use super::{DiagnosticCode, Severity};

    pub const PARSE_FAILURE: DiagnosticCode =
        DiagnosticCode::new("RX001", Severity::Error, "declaration file failed to parse");
    pub const MISSING_MODEL_ATTRIBUTE: DiagnosticCode = DiagnosticCode::new(
        "RX002",
        Severity::Error,
        "member attributes on a struct without #[model]",
    );
    pub const INVALID_MODEL_SHAPE: DiagnosticCode = DiagnosticCode::new(
        "RX003",
        Severity::Error,
        "#[model] must be placed on a non-generic struct with named fields",
    );
    pub const PUBLIC_OBSERVABLE_FIELD: DiagnosticCode = DiagnosticCode::new(
        "RX004",
        Severity::Error,
        "observable field must not be pub; generated accessors own its visibility",
    );
    pub const NON_PUBLIC_CONSTRUCTOR: DiagnosticCode = DiagnosticCode::new(
        "RX005",
        Severity::Error,
        "non-public model with injected constructor parameters",
    );
    pub const CONFLICTING_ATTRIBUTES: DiagnosticCode =
        DiagnosticCode::new("RX006", Severity::Error, "conflicting member attributes");
    pub const CIRCULAR_MODEL_REFERENCE: DiagnosticCode =
        DiagnosticCode::new("RX010", Severity::Error, "circular model reference");
    pub const UNKNOWN_MODEL_REFERENCE: DiagnosticCode =
        DiagnosticCode::new("RX011", Severity::Error, "reference to an undeclared model");
    pub const DERIVED_MODEL_REFERENCE: DiagnosticCode = DiagnosticCode::new(
        "RX012",
        Severity::Error,
        "derived model used as an injectable dependency",
    );
    pub const UNKNOWN_BASE_MODEL: DiagnosticCode =
        DiagnosticCode::new("RX013", Severity::Error, "base model is not declared");
    pub const DEPENDENCY_NOT_GENERATED: DiagnosticCode = DiagnosticCode::new(
        "RX014",
        Severity::Error,
        "declared dependency was blocked and not generated",
    );
    pub const CIRCULAR_TRIGGER_REFERENCE: DiagnosticCode = DiagnosticCode::new(
        "RX020",
        Severity::Error,
        "circular trigger reference: command writes a property that triggers it",
    );
    pub const MISSING_METHOD: DiagnosticCode =
        DiagnosticCode::new("RX021", Severity::Error, "referenced method not found");
    pub const INVALID_COMMAND_SIGNATURE: DiagnosticCode =
        DiagnosticCode::new("RX022", Severity::Error, "invalid command signature");
    pub const WRONG_RETURN_TYPE: DiagnosticCode =
        DiagnosticCode::new("RX023", Severity::Error, "command return type mismatch");
    pub const INVALID_TRIGGER_SIGNATURE: DiagnosticCode =
        DiagnosticCode::new("RX024", Severity::Error, "invalid trigger method signature");
    pub const UNKNOWN_TRIGGER_PROPERTY: DiagnosticCode = DiagnosticCode::new(
        "RX025",
        Severity::Error,
        "command trigger names an unknown property",
    );
    pub const UNKNOWN_OBSERVED_PROPERTY: DiagnosticCode = DiagnosticCode::new(
        "RX026",
        Severity::Error,
        "component observes an unknown property",
    );
    pub const UNUSED_MODEL_REFERENCE: DiagnosticCode = DiagnosticCode::new(
        "RX030",
        Severity::Warning,
        "referenced model has no properties used",
    );
    pub const UNREACHABLE_TRIGGER: DiagnosticCode =
        DiagnosticCode::new("RX031", Severity::Warning, "trigger can never be invoked");
    pub const SCOPE_MISMATCH: DiagnosticCode = DiagnosticCode::new(
        "RX032",
        Severity::Warning,
        "shorter-lived model injected into a longer-lived model",
    );
    pub const MISSING_SCOPE: DiagnosticCode =
        DiagnosticCode::new("RX033", Severity::Warning, "model scope not declared");
    pub const INIT_ONLY_NON_COLLECTION: DiagnosticCode = DiagnosticCode::new(
        "RX034",
        Severity::Warning,
        "init-only property is not an observable collection",
    );
    pub const PRIVATE_MODEL_NOT_REGISTERED: DiagnosticCode = DiagnosticCode::new(
        "RX035",
        Severity::Info,
        "private model is not registered with the container",
    );
    pub const INTERNAL_ERROR: DiagnosticCode =
        DiagnosticCode::new("RX099", Severity::Error, "internal code-generation error");

    /// Every registered code, in numeric order.
    pub const ALL: &[DiagnosticCode] = &[
        PARSE_FAILURE,
        MISSING_MODEL_ATTRIBUTE,
        INVALID_MODEL_SHAPE,
        PUBLIC_OBSERVABLE_FIELD,
        NON_PUBLIC_CONSTRUCTOR,
        CONFLICTING_ATTRIBUTES,
        CIRCULAR_MODEL_REFERENCE,
        UNKNOWN_MODEL_REFERENCE,
        DERIVED_MODEL_REFERENCE,
        UNKNOWN_BASE_MODEL,
        DEPENDENCY_NOT_GENERATED,
        CIRCULAR_TRIGGER_REFERENCE,
        MISSING_METHOD,
        INVALID_COMMAND_SIGNATURE,
        WRONG_RETURN_TYPE,
        INVALID_TRIGGER_SIGNATURE,
        UNKNOWN_TRIGGER_PROPERTY,
        UNKNOWN_OBSERVED_PROPERTY,
        UNUSED_MODEL_REFERENCE,
        UNREACHABLE_TRIGGER,
        SCOPE_MISMATCH,
        MISSING_SCOPE,
        INIT_ONLY_NON_COLLECTION,
        PRIVATE_MODEL_NOT_REGISTERED,
        INTERNAL_ERROR,
    ];

    /// Look up a code by its identifier.
    pub fn lookup(id: &str) -> Option<&'static DiagnosticCode> {
        ALL.iter().find(|c| c.id == id)
    }
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
    /// Suggested fix.
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            code: code.id,
            severity: code.severity,
            message: message.into(),
            location,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        write!(f, "  --> {}", self.location)?;
        if let Some(help) = &self.help {
            write!(f, "\n  = help: {}", help)?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticBag {
    items: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Diagnostics carrying the given code.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sort by location then code so output is stable across runs.
    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.code.cmp(b.code))
                .then_with(|| a.message.cmp(&b.message))
        });
        self.items.dedup();
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Span;

    #[test]
    fn test_codes_are_unique_and_sorted() {
        let ids: Vec<_> = codes::ALL.iter().map(|c| c.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_lookup() {
        let code = codes::lookup("RX010").unwrap();
        assert_eq!(code.severity, Severity::Error);
        assert!(codes::lookup("RX999").is_none());
    }

    #[test]
    fn test_display_is_rustc_like() {
        let diag = Diagnostic::new(
            codes::MISSING_SCOPE,
            "model `Settings` has no declared scope",
            SourceLocation::new("models/settings.rs", Span::new(3, 0)),
        )
        .with_help("add `scope = \"singleton\"` to #[model]");

        let text = diag.to_string();
        assert!(text.starts_with("warning[RX033]: model `Settings`"));
        assert!(text.contains("--> models/settings.rs:3:1"));
        assert!(text.contains("= help: add"));
    }

    #[test]
    fn test_bag_sort_is_stable() {
        let mut bag = DiagnosticBag::new();
        bag.push(Diagnostic::new(
            codes::MISSING_SCOPE,
            "b",
            SourceLocation::new("b.rs", Span::new(1, 0)),
        ));
        bag.push(Diagnostic::new(
            codes::PARSE_FAILURE,
            "a",
            SourceLocation::new("a.rs", Span::new(9, 0)),
        ));
        bag.push(Diagnostic::new(
            codes::PARSE_FAILURE,
            "a",
            SourceLocation::new("a.rs", Span::new(9, 0)),
        ));
        bag.sort();

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.iter().next().unwrap().location.file, "a.rs");
        assert!(bag.has_errors());
        assert_eq!(bag.warning_count(), 1);
    }
}
