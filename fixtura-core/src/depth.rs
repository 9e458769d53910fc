//! Depth bound and truncation policy.

use std::sync::Arc;

use tracing::debug;

use crate::{error::FixturaError, schema::NodeMeta};

/// What happens when a node lies beyond the configured maximum depth.
///
/// # Examples
/// ```
/// use fixtura_core::TruncationPolicy;
///
/// assert_eq!(TruncationPolicy::default(), TruncationPolicy::Ignore);
/// assert_eq!("fail".parse::<TruncationPolicy>(), Ok(TruncationPolicy::Fail));
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum TruncationPolicy {
    /// Leave the subtree unexpanded and report a summary warning.
    #[default]
    Ignore,
    /// Abort the creation call with [`FixturaError::MaxDepthReached`].
    Fail,
}

impl std::str::FromStr for TruncationPolicy {
    type Err = Arc<str>;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "fail" => Ok(Self::Fail),
            other => Err(Arc::from(format!("unknown truncation policy `{other}`"))),
        }
    }
}

/// Applies the depth bound for one creation call and counts truncations.
#[derive(Debug)]
pub(crate) struct DepthController {
    max_depth: usize,
    policy: TruncationPolicy,
    truncated: usize,
    first: Option<String>,
}

impl DepthController {
    pub(crate) const fn new(max_depth: usize, policy: TruncationPolicy) -> Self {
        Self {
            max_depth,
            policy,
            truncated: 0,
            first: None,
        }
    }

    /// Returns `true` when `node` lies within the depth bound.
    pub(crate) const fn should_expand(&self, node: &NodeMeta) -> bool {
        node.depth() <= self.max_depth
    }

    /// Records that a node was truncated by depth, failing under
    /// [`TruncationPolicy::Fail`].
    ///
    /// `render` produces the node's rendered path; it is only invoked for the
    /// first truncation and for the error.
    pub(crate) fn truncate(
        &mut self,
        node: &NodeMeta,
        render: impl FnOnce() -> String,
    ) -> Result<(), FixturaError> {
        self.truncated += 1;
        match self.policy {
            TruncationPolicy::Fail => Err(FixturaError::MaxDepthReached {
                max_depth: self.max_depth,
                path: Arc::from(render()),
            }),
            TruncationPolicy::Ignore => {
                if self.first.is_none() {
                    self.first = Some(render());
                }
                debug!(ty = %node.ty(), depth = node.depth(), "node truncated by depth");
                Ok(())
            }
        }
    }

    /// Returns the number of truncated nodes and the path of the first one.
    pub(crate) fn summary(&self) -> Option<(usize, &str)> {
        self.first
            .as_deref()
            .map(|first| (self.truncated, first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ScalarKind, Schema, StructDef, TypeExpr, resolve::TypeGraph};

    use rstest::rstest;

    fn nested() -> Schema {
        Schema::new()
            .with(StructDef::new("Root").field("a", TypeExpr::named("A")))
            .with(StructDef::new("A").field("b", ScalarKind::I32))
    }

    #[rstest]
    #[case(0, [true, false, false])]
    #[case(1, [true, true, false])]
    #[case(2, [true, true, true])]
    fn expansion_follows_the_bound(#[case] max_depth: usize, #[case] expected: [bool; 3]) {
        let schema = nested();
        let graph = TypeGraph::new(&schema);
        let root = graph.root(&TypeExpr::named("Root"));
        let a = graph.children_of(&root).remove(0);
        let b = graph.children_of(&a).remove(0);
        let controller = DepthController::new(max_depth, TruncationPolicy::Ignore);
        let actual = [root.meta(), a.meta(), b.meta()].map(|meta| controller.should_expand(meta));
        assert_eq!(actual, expected);
    }

    #[test]
    fn ignore_policy_counts_and_remembers_the_first_path() {
        let schema = nested();
        let graph = TypeGraph::new(&schema);
        let root = graph.root(&TypeExpr::named("Root"));
        let a = graph.children_of(&root).remove(0);
        let mut controller = DepthController::new(0, TruncationPolicy::Ignore);
        assert!(controller.summary().is_none());
        controller
            .truncate(a.meta(), || "Root.a".to_owned())
            .expect("ignore policy never fails");
        controller
            .truncate(a.meta(), || "second".to_owned())
            .expect("ignore policy never fails");
        assert_eq!(controller.summary(), Some((2, "Root.a")));
    }

    #[test]
    fn fail_policy_reports_the_path() {
        let schema = nested();
        let graph = TypeGraph::new(&schema);
        let root = graph.root(&TypeExpr::named("Root"));
        let a = graph.children_of(&root).remove(0);
        let mut controller = DepthController::new(0, TruncationPolicy::Fail);
        let err = controller
            .truncate(a.meta(), || "Root.a".to_owned())
            .expect_err("fail policy must abort");
        assert_eq!(
            err,
            FixturaError::MaxDepthReached {
                max_depth: 0,
                path: Arc::from("Root.a"),
            }
        );
    }
}
