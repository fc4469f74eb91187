//! Generation units and emission blocking.
//!
//! An error-level diagnostic suppresses emission only for the unit it is
//! attached to; sibling units in the same compilation still generate.

use std::collections::BTreeSet;
use std::fmt;

/// The granularity at which emission can be suppressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unit {
    /// A whole declaration file.
    File(String),
    /// A model and everything generated for it.
    Model(String),
    /// A single property or command of a model.
    Member { model: String, member: String },
    /// A component's generated filter.
    Component(String),
}

impl Unit {
    pub fn member(model: impl Into<String>, member: impl Into<String>) -> Self {
        Self::Member {
            model: model.into(),
            member: member.into(),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file `{}`", path),
            Self::Model(name) => write!(f, "model `{}`", name),
            Self::Member { model, member } => write!(f, "member `{}::{}`", model, member),
            Self::Component(name) => write!(f, "component `{}`", name),
        }
    }
}

/// Units whose emission is suppressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    units: BTreeSet<Unit>,
}

impl BlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&mut self, unit: Unit) {
        self.units.insert(unit);
    }

    pub fn merge(&mut self, other: &BlockSet) {
        self.units.extend(other.units.iter().cloned());
    }

    pub fn is_file_blocked(&self, path: &str) -> bool {
        self.units.contains(&Unit::File(path.to_string()))
    }

    pub fn is_model_blocked(&self, name: &str) -> bool {
        self.units.contains(&Unit::Model(name.to_string()))
    }

    /// A member is blocked on its own or through its model.
    pub fn is_member_blocked(&self, model: &str, member: &str) -> bool {
        self.is_model_blocked(model) || self.units.contains(&Unit::member(model, member))
    }

    pub fn is_component_blocked(&self, name: &str) -> bool {
        self.units.contains(&Unit::Component(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
