//! Code template emitters for rxgen.
//!
//! Given analyzed descriptors, resolved property-usage sets and the set of
//! blocked units, this crate emits:
//! - One translation unit per declaration file, with every `#[model]` struct
//!   replaced by its observable implementation
//! - Re-render filtering for `#[component]` structs
//! - A registration unit with the container extension trait and the
//!   singleton initializer
//!
//! Emission is deterministic: identical inputs give byte-identical output.

mod error;
pub mod generators;
mod syntax;
pub mod templates;

pub use error::{CodegenError, Result};
pub use generators::{CodegenOptions, GeneratedFile, Generator, ModelContext};
pub use templates::TemplateEngine;
