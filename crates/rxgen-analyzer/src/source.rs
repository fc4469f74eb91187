//! Declaration sources and their parsed syntax trees.

use rxgen_core::{AnalyzeError, Span};
use syn::spanned::Spanned;

/// One declaration file as handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path used in diagnostics and to name the generated unit.
    pub path: String,
    /// Module path the generated unit is included at.
    pub module: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, module: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            module: module.into(),
            text: text.into(),
        }
    }

    /// File name without directories or extension (`src/models/order.rs` is `order`).
    pub fn stem(&self) -> &str {
        let name = self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path);
        name.strip_suffix(".rs").unwrap_or(name)
    }
}

/// A declaration file together with its syntax tree.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub file: SourceFile,
    pub syntax: syn::File,
}

/// Parse a declaration file.
pub fn parse_source(source: &SourceFile) -> Result<ParsedSource, AnalyzeError> {
    let syntax = syn::parse_file(&source.text).map_err(|err| AnalyzeError::Parse {
        message: err.to_string(),
        span: span_of(&err.span()),
    })?;
    Ok(ParsedSource {
        file: source.clone(),
        syntax,
    })
}

/// Start position of a syntax node.
pub fn span_of<T: Spanned + ?Sized>(node: &T) -> Span {
    let start = node.span().start();
    Span::new(start.line as u32, start.column as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_is_located() {
        let source = SourceFile::new("bad.rs", "crate::bad", "pub struct Broken {\n    value: ,\n}\n");
        let err = parse_source(&source).unwrap_err();
        assert!(matches!(err, AnalyzeError::Parse { .. }));
        assert_eq!(err.span().line, 2);
    }

    #[test]
    fn test_stem() {
        let source = SourceFile::new("src/models/order.rs", "crate::models::order", "");
        assert_eq!(source.stem(), "order");
    }
}
