//! Symbol analysis for rxgen model declarations.
//!
//! Declaration files are ordinary Rust source. This crate parses them with
//! `syn`, classifies every member of `#[model]` and `#[component]` structs,
//! summarizes hand-written method bodies into read/write sets, and produces
//! the plain descriptor records consumed by the later stages.
//!
//! Malformed declarations never abort the analysis: they become diagnostics
//! and the affected unit is marked blocked.

mod analyzer;
mod attrs;
mod body;
mod members;
mod source;
mod usage;

pub use analyzer::{Analysis, Analyzer, AnalyzerOptions, RESERVED_FIELDS};
pub use attrs::{is_generator_attribute, GENERATOR_ATTRIBUTES};
pub use body::analyze_block;
pub use source::{parse_source, span_of, ParsedSource, SourceFile};
pub use usage::parse_property_paths;

use rxgen_core::{BlockSet, DiagnosticBag, Unit};

/// Parse and analyze a set of declaration files with default options.
pub fn analyze(sources: &[SourceFile]) -> Analysis {
    analyze_with(sources, AnalyzerOptions::default())
}

/// Parse and analyze a set of declaration files.
///
/// A file that fails to parse is reported and blocked; the remaining files
/// are still analyzed.
pub fn analyze_with(sources: &[SourceFile], options: AnalyzerOptions) -> Analysis {
    let mut diagnostics = DiagnosticBag::new();
    let mut blocked = BlockSet::new();
    let mut parsed = Vec::new();
    for source in sources {
        match parse_source(source) {
            Ok(p) => parsed.push(p),
            Err(err) => {
                diagnostics.push(err.into_diagnostic(&source.path));
                blocked.block(Unit::File(source.path.clone()));
            }
        }
    }

    let mut analysis = Analyzer::new(&parsed, options).analyze();
    analysis.diagnostics.extend(diagnostics);
    analysis.blocked.merge(&blocked);
    analysis
}
