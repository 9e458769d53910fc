//! Ancestor path tracking and cycle detection.
//!
//! The orchestrator pushes a segment before visiting a node's children and
//! pops it afterwards, so the path always mirrors the active branch of the
//! depth-first traversal.

use std::fmt;

use crate::schema::{Node, NodeMeta, TypeExpr};

/// One expanded ancestor.
#[derive(Clone, Debug, PartialEq)]
pub struct PathSegment {
    meta: NodeMeta,
    container: bool,
}

impl PathSegment {
    /// Returns the ancestor's identity.
    #[must_use]
    pub const fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    /// Returns `true` when the ancestor is a sequence, set or map.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        self.container
    }
}

/// Chain of expanded ancestors from the root to the current node's parent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AncestorPath {
    segments: Vec<PathSegment>,
}

impl AncestorPath {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, node: &Node) {
        self.segments.push(PathSegment {
            meta: node.meta().clone(),
            container: node.is_container(),
        });
    }

    pub(crate) fn pop(&mut self) {
        self.segments.pop();
    }

    /// Returns the segments from the root outwards.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the number of expanded ancestors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` at the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterates from the innermost ancestor towards the root.
    pub fn outward(&self) -> impl Iterator<Item = &NodeMeta> {
        self.segments.iter().rev().map(|segment| &segment.meta)
    }

    /// Returns `true` when expanding `candidate` would re-enter a type that is
    /// already being expanded through object-to-object edges only.
    ///
    /// The walk goes from the innermost ancestor outwards and stops at the
    /// first container: element multiplicity is bounded separately, so a type
    /// reached again through a sequence or map is not a cycle.
    #[must_use]
    pub fn would_cycle(&self, candidate: &TypeExpr) -> bool {
        for segment in self.segments.iter().rev() {
            if segment.container {
                return false;
            }
            if segment.meta.ty() == candidate {
                return true;
            }
        }
        false
    }

    /// Renders the path extended by `node`, e.g. `Person.address.city`.
    #[must_use]
    pub fn render_with(&self, node: &NodeMeta) -> String {
        format!("{self}{node}")
    }
}

impl fmt::Display for AncestorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{}", segment.meta)?;
        }
        Ok(())
    }
}
