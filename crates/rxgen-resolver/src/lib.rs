//! Dependency graph and property-usage resolution for rxgen models.
//!
//! This crate resolves:
//! - The dependency graph between models, members and components
//! - Cycles among model references, base chains and command triggers
//! - The qualified property names each consuming unit observes

mod graph;
mod usage;

pub use graph::{Cycle, DependencyEdge, DependencyGraph, EdgeKind, NodeId};
pub use usage::{
    CommandUsage, ComponentUsage, ModelUsage, PropertyUsageResolver, ReferenceUsage, Resolution,
};
