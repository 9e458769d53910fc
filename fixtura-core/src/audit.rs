//! Unused-selector audit.
//!
//! After a successful traversal every declared selector that never matched a
//! node is collected into one [`UnusedSelectorReport`]; the report groups the
//! selectors by declaring API and names each declaration site.

use std::{fmt, sync::Arc};

use tracing::{instrument, warn};

use crate::{
    error::{FixturaError, SourceLocation},
    schema::TypeExpr,
    select::{ApiCategory, declaration::Declaration, matcher::MatchRecord},
};

/// A selector that never matched during a creation call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnusedSelector {
    category: ApiCategory,
    description: Arc<str>,
    location: SourceLocation,
}

impl UnusedSelector {
    /// Declaring API of the selector.
    #[must_use]
    pub const fn category(&self) -> ApiCategory {
        self.category
    }

    /// Textual description of the selector.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declaration site.
    #[must_use]
    pub const fn location(&self) -> SourceLocation {
        self.location
    }
}

/// Every unused selector of one creation call.
///
/// The rendered message looks like:
///
/// ```text
/// 2 unused selectors detected while creating `Person`:
///  -> ignore():
///     1: types(Address) at tests/audit.rs:15
///  -> set():
///     2: field(Person, "nickname") at tests/audit.rs:14
/// ```
///
/// Categories appear in a fixed order; within a category selectors keep their
/// declaration order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnusedSelectorReport {
    root: Arc<str>,
    selectors: Vec<UnusedSelector>,
}

impl UnusedSelectorReport {
    /// Type whose creation produced the report.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Number of unused selectors.
    #[must_use]
    pub fn count(&self) -> usize {
        self.selectors.len()
    }

    /// Unused selectors grouped by category.
    #[must_use]
    pub fn selectors(&self) -> &[UnusedSelector] {
        &self.selectors
    }
}

impl fmt::Display for UnusedSelectorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.selectors.len() == 1 {
            "selector"
        } else {
            "selectors"
        };
        write!(
            f,
            "{} unused {noun} detected while creating `{}`:",
            self.selectors.len(),
            self.root
        )?;
        let mut current = None;
        for (index, selector) in self.selectors.iter().enumerate() {
            if current != Some(selector.category) {
                current = Some(selector.category);
                write!(f, "\n -> {}():", selector.category)?;
            }
            write!(
                f,
                "\n    {}: {} at {}",
                index + 1,
                selector.description,
                selector.location
            )?;
        }
        Ok(())
    }
}

/// Fails with [`FixturaError::UnusedSelectors`] when any selector in
/// `record` is unused.
#[instrument(
    name = "fixture.audit",
    skip_all,
    fields(root = %root, declared = declarations.len()),
)]
pub(crate) fn audit(
    root: &TypeExpr,
    declarations: &[Declaration],
    record: &MatchRecord,
) -> Result<(), FixturaError> {
    let mut selectors: Vec<UnusedSelector> = record
        .unused(declarations)
        .into_iter()
        .map(|(declaration, selector)| UnusedSelector {
            category: declaration.category(),
            description: Arc::from(selector.to_string()),
            location: declaration.location(),
        })
        .collect();
    if selectors.is_empty() {
        return Ok(());
    }
    selectors.sort_by_key(UnusedSelector::category);
    warn!(unused = selectors.len(), "unused selectors detected");
    Err(FixturaError::UnusedSelectors(UnusedSelectorReport {
        root: Arc::from(root.to_string()),
        selectors,
    }))
}
