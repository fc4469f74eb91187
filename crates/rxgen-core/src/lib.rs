//! Core types shared by every stage of the rxgen model compiler.
//!
//! This crate provides:
//! - Descriptor records produced by the analyzer (models, properties, commands, references)
//! - Value types (scopes, qualified property names, access sets, spans)
//! - The diagnostic registry with its stable codes
//! - Error types
//! - Generation units and the set of units blocked from emission

pub mod ast;
pub mod diagnostics;
pub mod errors;
pub mod types;
pub mod units;

pub use ast::*;
pub use diagnostics::*;
pub use errors::*;
pub use types::*;
pub use units::*;
