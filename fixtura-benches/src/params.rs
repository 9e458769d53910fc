//! Benchmark parameter types, rendered as Criterion parameter labels.

use std::fmt;

/// Shape of a synthetic schema.
#[derive(Clone, Copy, Debug)]
pub struct ShapeParams {
    /// Levels in the struct chain.
    pub depth: usize,
    /// Scalar members per struct.
    pub breadth: usize,
}

impl fmt::Display for ShapeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "depth={},breadth={}", self.depth, self.breadth)
    }
}

/// Parameters for a selector-matching run.
#[derive(Clone, Copy, Debug)]
pub struct SelectorParams {
    /// Declared selectors.
    pub selectors: usize,
    /// Scopes attached to each selector.
    pub scopes: usize,
}

impl fmt::Display for SelectorParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "selectors={},scopes={}", self.selectors, self.scopes)
    }
}
