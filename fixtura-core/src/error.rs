//! Error types for the fixtura core library.
//!
//! Defines the fatal error kinds a creation call can surface, the stable
//! machine-readable codes attached to them, and a convenient result alias.

use std::{fmt, panic::Location, sync::Arc};

use thiserror::Error;

use crate::{audit::UnusedSelectorReport, describe::ValueError};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? $( ( $($tuple:tt)* ) )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? $( ( $($tuple)* ) )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Source position of a fixture declaration, rendered as `file:line`.
///
/// Captured with [`std::panic::Location`] by the `#[track_caller]` declaring
/// methods of [`crate::FixtureBuilder`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SourceLocation {
    file: &'static str,
    line: u32,
    column: u32,
}

impl SourceLocation {
    /// Builds a location from its raw parts.
    #[must_use]
    pub const fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// Captures the location of the caller of the enclosing `#[track_caller]`
    /// function.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }

    /// Returns the source file path.
    #[must_use]
    pub const fn file(&self) -> &'static str {
        self.file
    }

    /// Returns the 1-based line number.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Returns the 1-based column number.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Error type produced when declaring or creating fixtures.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum FixturaError {
    /// A selector or customisation was malformed at its declaration site.
    #[error("invalid declaration at {location}: {reason}")]
    Usage {
        /// Human-readable description of the problem.
        reason: Arc<str>,
        /// Call site of the offending declaration.
        location: SourceLocation,
    },
    /// A settings layer contained inconsistent values.
    #[error("invalid settings: {reason}")]
    InvalidSettings {
        /// Human-readable description of the problem.
        reason: Arc<str>,
    },
    /// The schema describing the target type is inconsistent.
    #[error("invalid schema: {reason}")]
    InvalidSchema {
        /// Human-readable description of the problem.
        reason: Arc<str>,
    },
    /// The requested root type is not registered in the schema.
    #[error("type `{name}` is not registered in the schema")]
    UnknownType {
        /// Name that failed to resolve.
        name: Arc<str>,
    },
    /// One or more declared selectors never matched a node.
    #[error("{0}")]
    UnusedSelectors(UnusedSelectorReport),
    /// The `fail` truncation policy is active and a node exceeded the depth bound.
    #[error("maximum depth {max_depth} reached while populating `{path}`")]
    MaxDepthReached {
        /// Configured maximum depth.
        max_depth: usize,
        /// Rendered ancestor path of the first truncated node.
        path: Arc<str>,
    },
    /// An instantiation strategy reported a hard failure.
    #[error("instantiation of `{type_name}` aborted by strategy `{strategy}`: {reason}")]
    Instantiation {
        /// Type that was being instantiated.
        type_name: Arc<str>,
        /// Name of the strategy that failed.
        strategy: &'static str,
        /// Reason reported by the strategy.
        reason: Arc<str>,
    },
    /// The populated value could not be converted into the requested Rust type.
    #[error("populated value could not be converted: {0}")]
    Conversion(#[from] ValueError),
}

define_error_codes! {
    /// Stable codes describing [`FixturaError`] variants.
    enum FixturaErrorCode for FixturaError {
        /// A selector or customisation was malformed at its declaration site.
        Usage => Usage { .. } => "FIXTURA_USAGE",
        /// A settings layer contained inconsistent values.
        InvalidSettings => InvalidSettings { .. } => "FIXTURA_INVALID_SETTINGS",
        /// The schema describing the target type is inconsistent.
        InvalidSchema => InvalidSchema { .. } => "FIXTURA_INVALID_SCHEMA",
        /// The requested root type is not registered in the schema.
        UnknownType => UnknownType { .. } => "FIXTURA_UNKNOWN_TYPE",
        /// One or more declared selectors never matched a node.
        UnusedSelectors => UnusedSelectors(..) => "FIXTURA_UNUSED_SELECTORS",
        /// A node exceeded the depth bound under the `fail` policy.
        MaxDepthReached => MaxDepthReached { .. } => "FIXTURA_MAX_DEPTH_REACHED",
        /// An instantiation strategy reported a hard failure.
        Instantiation => Instantiation { .. } => "FIXTURA_INSTANTIATION_FAILED",
        /// The populated value could not be converted.
        Conversion => Conversion(..) => "FIXTURA_CONVERSION_FAILED",
    }
}

impl FixturaError {
    pub(crate) fn usage(reason: impl Into<Arc<str>>, location: SourceLocation) -> Self {
        Self::Usage {
            reason: reason.into(),
            location,
        }
    }

    pub(crate) fn invalid_settings(reason: impl Into<Arc<str>>) -> Self {
        Self::InvalidSettings {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_schema(reason: impl Into<Arc<str>>) -> Self {
        Self::InvalidSchema {
            reason: reason.into(),
        }
    }

    /// Returns the unused-selector report when this error is an audit failure.
    #[must_use]
    pub const fn unused_selectors(&self) -> Option<&UnusedSelectorReport> {
        match self {
            Self::UnusedSelectors(report) => Some(report),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, FixturaError>;

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::usage(
        FixturaError::usage("empty member name", SourceLocation::new("a.rs", 3, 1)),
        "FIXTURA_USAGE"
    )]
    #[case::depth(
        FixturaError::MaxDepthReached { max_depth: 2, path: Arc::from("Root.a.b.c") },
        "FIXTURA_MAX_DEPTH_REACHED"
    )]
    #[case::settings(FixturaError::invalid_settings("min > max"), "FIXTURA_INVALID_SETTINGS")]
    fn codes_are_stable(#[case] error: FixturaError, #[case] expected: &str) {
        assert_eq!(error.code().as_str(), expected);
        assert_eq!(error.code().to_string(), expected);
    }

    #[test]
    fn usage_error_renders_declaration_site() {
        let err = FixturaError::usage("empty member name", SourceLocation::new("tests/a.rs", 12, 9));
        assert_eq!(
            err.to_string(),
            "invalid declaration at tests/a.rs:12: empty member name"
        );
    }

    #[test]
    fn caller_captures_this_file() {
        let location = SourceLocation::caller();
        assert!(location.file().ends_with("error.rs"));
        assert!(location.line() > 0);
    }
}
