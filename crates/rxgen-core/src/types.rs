//! Core value types for the model compiler.

use convert_case::{Case, Casing};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

/// Prefix of every qualified property name published by a model.
pub const MODEL_PREFIX: &str = "Model";

/// Type names whose mutations publish notifications on their own.
pub const OBSERVABLE_COLLECTIONS: &[&str] = &["ObservableList"];

/// Source position of a declaration (1-based line, 0-based column).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A span anchored to the file it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceLocation {
    pub file: String,
    pub span: Span,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, span: Span) -> Self {
        Self {
            file: file.into(),
            span,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.span.line, self.span.column + 1)
    }
}

/// Container lifetime of a model instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Scope {
    #[default]
    Singleton,
    Scoped,
    Transient,
}

impl Scope {
    /// Parse a scope keyword (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "singleton" => Some(Self::Singleton),
            "scoped" => Some(Self::Scoped),
            "transient" => Some(Self::Transient),
            _ => None,
        }
    }

    /// Relative lifetime: a larger rank lives longer.
    pub fn rank(self) -> u8 {
        match self {
            Self::Singleton => 2,
            Self::Scoped => 1,
            Self::Transient => 0,
        }
    }

    /// Whether an instance of this scope outlives one of `other`.
    pub fn outlives(self, other: Scope) -> bool {
        self.rank() > other.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Scoped => "scoped",
            Self::Transient => "transient",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared visibility of a model or component struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Visibility {
    Public,
    Crate,
    Restricted,
    Private,
}

impl Visibility {
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}

/// Hierarchical change-notification key (`Model.Prop` or `Model.Ref.Prop`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Name of a property declared on the model itself.
    pub fn local(property: &str) -> Self {
        Self(format!("{}.{}", MODEL_PREFIX, pascal(property)))
    }

    /// Name of a property reached through one model reference.
    pub fn through(reference: &str, property: &str) -> Self {
        Self(format!(
            "{}.{}.{}",
            MODEL_PREFIX,
            pascal(reference),
            pascal(property)
        ))
    }

    /// Build from a property path.
    pub fn from_path(path: &PropertyPath) -> Self {
        match &path.reference {
            Some(reference) => Self::through(reference, &path.property),
            None => Self::local(&path.property),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of dotted segments, including the prefix.
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QualifiedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A property addressed locally (`status`) or through a reference (`customer.name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyPath {
    pub reference: Option<String>,
    pub property: String,
}

impl PropertyPath {
    pub fn local(property: impl Into<String>) -> Self {
        Self {
            reference: None,
            property: property.into(),
        }
    }

    pub fn through(reference: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            property: property.into(),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "{}.{}", reference, self.property),
            None => f.write_str(&self.property),
        }
    }
}

/// A chain of member accesses rooted at `self` (`self.customer().name()` is `[customer, name]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberPath(pub SmallVec<[String; 4]>);

impl MemberPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "self.{}", self.0.join("."))
    }
}

/// Static read/write summary of a method body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessSet {
    /// Member chains read anywhere in the body.
    pub reads: BTreeSet<MemberPath>,
    /// Member chains written: assignment targets, `set_*` calls, collection mutators.
    pub writes: BTreeSet<MemberPath>,
    /// Methods invoked directly on `self`.
    pub calls: BTreeSet<String>,
}

impl AccessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another access set into this one.
    pub fn merge(&mut self, other: &AccessSet) {
        self.reads.extend(other.reads.iter().cloned());
        self.writes.extend(other.writes.iter().cloned());
        self.calls.extend(other.calls.iter().cloned());
    }

    /// Local members written by the body (setter calls, assignments, collection mutations).
    pub fn written_members(&self) -> BTreeSet<String> {
        let mut written = BTreeSet::new();
        for path in &self.writes {
            match path.0.as_slice() {
                [single] => {
                    let name = single.strip_prefix("set_").unwrap_or(single);
                    written.insert(name.to_string());
                }
                [first, ..] => {
                    written.insert(first.clone());
                }
                [] => {}
            }
        }
        written
    }

    /// Properties written through a reference (`self.customer().set_name(..)`).
    pub fn reference_writes(&self) -> BTreeSet<PropertyPath> {
        self.writes
            .iter()
            .filter_map(|path| match path.0.as_slice() {
                [reference, setter] => setter
                    .strip_prefix("set_")
                    .map(|property| PropertyPath::through(reference.clone(), property)),
                _ => None,
            })
            .collect()
    }

    /// Members of `receiver` read through it (`self.receiver.x()` yields `x`).
    pub fn reads_through(&self, receiver: &str) -> BTreeSet<String> {
        self.reads
            .iter()
            .filter(|path| path.len() >= 2 && path.first() == Some(receiver))
            .filter_map(|path| path.get(1).map(str::to_string))
            .collect()
    }

    /// Members read directly on `self`.
    pub fn direct_reads(&self) -> BTreeSet<String> {
        self.reads
            .iter()
            .filter_map(|path| path.first().map(str::to_string))
            .collect()
    }
}

/// Convert a snake_case identifier to the PascalCase form used in qualified names.
pub fn pascal(ident: &str) -> String {
    ident.to_case(Case::Pascal)
}

/// Normalize a rendered type for comparison (drops whitespace).
pub fn normalize_type(ty: &str) -> String {
    ty.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Last path segment of a rendered type, without generic arguments (`Arc<dyn Logger>` is `Arc`).
pub fn type_head(ty: &str) -> String {
    let normalized = normalize_type(ty);
    let head = normalized.split('<').next().unwrap_or_default();
    head.rsplit("::").next().unwrap_or_default().to_string()
}

/// Whether a rendered type names an observable collection.
pub fn is_observable_collection(ty: &str) -> bool {
    let head = type_head(ty);
    OBSERVABLE_COLLECTIONS.contains(&head.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_names() {
        assert_eq!(QualifiedName::local("value").as_str(), "Model.Value");
        assert_eq!(
            QualifiedName::through("customer", "display_name").as_str(),
            "Model.Customer.DisplayName"
        );
        assert_eq!(QualifiedName::local("save_command").as_str(), "Model.SaveCommand");
        assert_eq!(QualifiedName::through("ref_b", "x").depth(), 3);
    }

    #[test]
    fn test_scope_ordering() {
        assert!(Scope::Singleton.outlives(Scope::Scoped));
        assert!(Scope::Scoped.outlives(Scope::Transient));
        assert!(!Scope::Transient.outlives(Scope::Singleton));
        assert!(!Scope::Scoped.outlives(Scope::Scoped));
        assert_eq!(Scope::parse("Scoped"), Some(Scope::Scoped));
        assert_eq!(Scope::parse("forever"), None);
    }

    #[test]
    fn test_scope_defaults_to_singleton() {
        assert_eq!(Scope::default(), Scope::Singleton);
    }

    #[test]
    fn test_written_members() {
        let mut access = AccessSet::new();
        access.writes.insert(MemberPath::new(["set_status"]));
        access.writes.insert(MemberPath::new(["total"]));
        access.writes.insert(MemberPath::new(["lines", "push"]));
        access.writes.insert(MemberPath::new(["customer", "set_name"]));

        let written = access.written_members();
        assert!(written.contains("status"));
        assert!(written.contains("total"));
        assert!(written.contains("lines"));

        let through = access.reference_writes();
        assert!(through.contains(&PropertyPath::through("customer", "name")));
    }

    #[test]
    fn test_reads_through() {
        let mut access = AccessSet::new();
        access.reads.insert(MemberPath::new(["customer", "name"]));
        access.reads.insert(MemberPath::new(["customer"]));
        access.reads.insert(MemberPath::new(["status"]));

        let through = access.reads_through("customer");
        assert_eq!(through.len(), 1);
        assert!(through.contains("name"));
        assert!(access.direct_reads().contains("status"));
    }

    #[test]
    fn test_type_helpers() {
        assert_eq!(type_head("std :: sync :: Arc < dyn Logger >"), "Arc");
        assert!(is_observable_collection("ObservableList < Line >"));
        assert!(!is_observable_collection("Vec < Line >"));
        assert_eq!(normalize_type("Option < u32 >"), "Option<u32>");
    }
}
