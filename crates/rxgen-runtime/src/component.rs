//! Re-render filtering for components.

use crate::core::intersects;

/// Decides whether a change set concerns a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFilter {
    observed: &'static [&'static str],
}

impl RenderFilter {
    pub const fn new(observed: &'static [&'static str]) -> Self {
        Self { observed }
    }

    pub fn observed(&self) -> &'static [&'static str] {
        self.observed
    }

    /// A component re-renders when any changed name is one it observes.
    pub fn should_render(&self, changed: &[&str]) -> bool {
        intersects(self.observed, changed)
    }
}
