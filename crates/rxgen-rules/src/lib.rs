//! Diagnostic engine for rxgen model declarations.
//!
//! A fixed, ordered set of rules runs over the descriptors and the
//! dependency graph. Each violation produces one diagnostic; error-level
//! violations also block emission for the affected unit only.

pub mod checks;
mod engine;
mod rule;

pub use engine::{DiagnosticEngine, Report, RuleContext};
pub use rule::Rule;
