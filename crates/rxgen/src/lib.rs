//! rxgen: compiles `#[model]` declarations into reactive Rust models.
//!
//! The pipeline is split across the workspace:
//!
//! | Stage | Crate |
//! |-------|-------|
//! | Analyzing | `rxgen-analyzer` |
//! | Graph building, resolving | `rxgen-resolver` |
//! | Validating | `rxgen-rules` |
//! | Emitting | `rxgen-codegen` |
//!
//! This crate drives those stages over a set of declaration files and
//! hands the generated units to a build script or the `rxgen` CLI.
//!
//! # Quick Start
//!
//! ```ignore
//! use rxgen::{generate, GeneratorConfig, SourceFile};
//!
//! let sources = vec![SourceFile::new("src/order.rs", "crate::order", text)];
//! let output = generate(&sources, &GeneratorConfig::default())?;
//! for file in &output.files {
//!     println!("{}: {} bytes", file.path, file.contents.len());
//! }
//! ```

pub mod builder;
pub mod config;
pub mod driver;
pub mod error;

pub use builder::Builder;
pub use config::GeneratorConfig;
pub use driver::{Driver, GenerationOutput, Stage};
pub use error::{ConfigError, Result, RxgenError};

pub use rxgen_analyzer::SourceFile;
pub use rxgen_codegen::GeneratedFile;
pub use rxgen_core::{codes, Diagnostic, DiagnosticBag, Severity};

/// Run the whole pipeline once.
pub fn generate(sources: &[SourceFile], config: &GeneratorConfig) -> Result<GenerationOutput> {
    Driver::new(config.clone()).run(sources)
}
