//! Customisations declared on a fixture builder.

use std::{fmt, sync::Arc};

use crate::{
    error::SourceLocation,
    generators::Gen,
    random::Random,
    schema::TypeExpr,
    value::Value,
};

use super::Selection;

/// The declaring API a customisation came from; unused selectors are grouped
/// by category in audit reports.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ApiCategory {
    /// `ignore`
    Ignore,
    /// `set`
    Set,
    /// `supply`
    Supply,
    /// `generate`
    Generate,
    /// `on_complete`
    OnComplete,
    /// `with_nullable`
    WithNullable,
    /// `subtype`
    Subtype,
}

impl ApiCategory {
    /// Returns the category's label as used in diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Set => "set",
            Self::Supply => "supply",
            Self::Generate => "generate",
            Self::OnComplete => "onComplete",
            Self::WithNullable => "withNullable",
            Self::Subtype => "subtype",
        }
    }

    pub(crate) const fn domain(self) -> Domain {
        match self {
            Self::Ignore | Self::Set | Self::Supply | Self::Generate => Domain::Value,
            Self::OnComplete => Domain::Completion,
            Self::WithNullable => Domain::Nullable,
            Self::Subtype => Domain::Subtype,
        }
    }
}

impl fmt::Display for ApiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Categories that compete with each other for the same node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Domain {
    Value,
    Completion,
    Nullable,
    Subtype,
}

pub(crate) type SupplyFn = Arc<dyn Fn(&mut Random) -> Value + Send + Sync>;
pub(crate) type CompleteFn = Arc<dyn Fn(&mut Value) + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Action {
    Ignore,
    Set(Value),
    Supply(SupplyFn),
    Generate(Gen),
    OnComplete(CompleteFn),
    WithNullable,
    Subtype(TypeExpr),
}

impl Action {
    pub(crate) const fn category(&self) -> ApiCategory {
        match self {
            Self::Ignore => ApiCategory::Ignore,
            Self::Set(_) => ApiCategory::Set,
            Self::Supply(_) => ApiCategory::Supply,
            Self::Generate(_) => ApiCategory::Generate,
            Self::OnComplete(_) => ApiCategory::OnComplete,
            Self::WithNullable => ApiCategory::WithNullable,
            Self::Subtype(_) => ApiCategory::Subtype,
        }
    }
}

/// A selection bound to an action, with its declaration order and site.
#[derive(Clone)]
pub(crate) struct Declaration {
    order: usize,
    selection: Selection,
    action: Action,
    location: SourceLocation,
}

impl Declaration {
    pub(crate) const fn new(
        order: usize,
        selection: Selection,
        action: Action,
        location: SourceLocation,
    ) -> Self {
        Self {
            order,
            selection,
            action,
            location,
        }
    }

    #[cfg(test)]
    pub(crate) const fn order(&self) -> usize {
        self.order
    }

    pub(crate) const fn selection(&self) -> &Selection {
        &self.selection
    }

    pub(crate) const fn action(&self) -> &Action {
        &self.action
    }

    pub(crate) const fn location(&self) -> SourceLocation {
        self.location
    }

    pub(crate) const fn category(&self) -> ApiCategory {
        self.action.category()
    }

    pub(crate) const fn domain(&self) -> Domain {
        self.category().domain()
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("order", &self.order)
            .field("category", &self.category())
            .field("selection", &format_args!("{}", self.selection))
            .field("location", &format_args!("{}", self.location))
            .finish()
    }
}
