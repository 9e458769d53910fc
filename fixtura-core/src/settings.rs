//! Cascading generation settings.
//!
//! A [`Settings`] value is a sparse layer: every key is optional. Layers are
//! resolved into an immutable [`SettingsSnapshot`] once per creation call, in
//! this order of precedence: explicit builder overrides, the call-scoped layer
//! passed to `with_settings`, the process-wide layer installed with
//! [`Settings::install_global`], and finally the built-in defaults.

use std::{
    ops::RangeInclusive,
    sync::{PoisonError, RwLock},
};

use tracing::info;

use crate::{depth::TruncationPolicy, error::FixturaError, random::Random};

/// Whether unused selectors fail the creation call.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Every declared selector must match at least one node.
    #[default]
    Strict,
    /// Unused selectors are tolerated.
    Lenient,
}

static GLOBAL: RwLock<Option<Settings>> = RwLock::new(None);

macro_rules! settings_keys {
    ($($(#[$meta:meta])* $key:ident: $ty:ty),+ $(,)?) => {
        /// A sparse layer of generation settings.
        ///
        /// # Examples
        /// ```
        /// use fixtura_core::{Settings, TruncationPolicy};
        ///
        /// let layer = Settings::new().max_depth(3).max_depth_policy(TruncationPolicy::Fail);
        /// let snapshot = layer.resolve().expect("settings are valid");
        /// assert_eq!(snapshot.max_depth(), 3);
        /// assert_eq!(snapshot.collection_size(), &(2..=6));
        /// ```
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct Settings {
            $($key: Option<$ty>,)+
        }

        impl Settings {
            $(
                $(#[$meta])*
                #[must_use]
                pub fn $key(mut self, value: $ty) -> Self {
                    self.$key = Some(value);
                    self
                }
            )+

            /// Returns a layer where keys set in `self` win over `fallback`.
            #[must_use]
            pub fn over(&self, fallback: &Self) -> Self {
                Self {
                    $($key: self.$key.clone().or_else(|| fallback.$key.clone()),)+
                }
            }
        }
    };
}

settings_keys! {
    /// Maximum traversal depth; the root is depth 0.
    max_depth: usize,
    /// Behaviour when a node exceeds the maximum depth.
    max_depth_policy: TruncationPolicy,
    /// Size bounds for sequences and sets.
    collection_size: RangeInclusive<usize>,
    /// Size bounds for maps.
    map_size: RangeInclusive<usize>,
    /// Length bounds for generated strings.
    string_length: RangeInclusive<usize>,
    /// Bounds for generated integers, clamped to each integer type.
    int_range: RangeInclusive<i64>,
    /// Bounds for generated floats.
    float_range: RangeInclusive<f64>,
    /// Probability that a nullable node is left `Null`.
    nullable_probability: f64,
    /// Whether `Option` members may be generated as `None`.
    nullable_options: bool,
    /// Seed for the call's random source.
    seed: u64,
    /// Strict or lenient selector auditing.
    mode: Mode,
}

impl Settings {
    /// Creates an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `self` as the process-wide layer after validating it.
    ///
    /// # Errors
    /// Returns [`FixturaError::InvalidSettings`] when the layer is
    /// inconsistent; the previous global layer is kept.
    pub fn install_global(self) -> Result<(), FixturaError> {
        self.resolve()?;
        let mut guard = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(self);
        Ok(())
    }

    /// Removes the process-wide layer.
    pub fn clear_global() {
        let mut guard = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    /// Returns a copy of the process-wide layer, or an empty layer.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    /// Resolves this layer over the built-in defaults.
    ///
    /// # Errors
    /// Returns [`FixturaError::InvalidSettings`] for inverted ranges, empty
    /// string lengths, or probabilities outside `[0, 1]`.
    pub fn resolve(&self) -> Result<SettingsSnapshot, FixturaError> {
        let snapshot = SettingsSnapshot {
            max_depth: self.max_depth.unwrap_or(8),
            max_depth_policy: self.max_depth_policy.unwrap_or_default(),
            collection_size: self.collection_size.clone().unwrap_or(2..=6),
            map_size: self.map_size.clone().unwrap_or(2..=6),
            string_length: self.string_length.clone().unwrap_or(3..=10),
            int_range: self.int_range.clone().unwrap_or(1..=10_000),
            float_range: self.float_range.clone().unwrap_or(1.0..=10_000.0),
            nullable_probability: self.nullable_probability.unwrap_or(1.0 / 6.0),
            nullable_options: self.nullable_options.unwrap_or(false),
            seed: self.seed,
            mode: self.mode.unwrap_or_default(),
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Fully-resolved, immutable settings for one creation call.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsSnapshot {
    max_depth: usize,
    max_depth_policy: TruncationPolicy,
    collection_size: RangeInclusive<usize>,
    map_size: RangeInclusive<usize>,
    string_length: RangeInclusive<usize>,
    int_range: RangeInclusive<i64>,
    float_range: RangeInclusive<f64>,
    nullable_probability: f64,
    nullable_options: bool,
    seed: Option<u64>,
    mode: Mode,
}

impl SettingsSnapshot {
    /// Resolves explicit overrides, the call-scoped layer and the global layer
    /// into one snapshot.
    pub(crate) fn cascade(explicit: &Settings, call: &Settings) -> Result<Self, FixturaError> {
        explicit.over(&call.over(&Settings::global())).resolve()
    }

    fn validate(&self) -> Result<(), FixturaError> {
        ensure_ordered("collection_size", &self.collection_size)?;
        ensure_ordered("map_size", &self.map_size)?;
        ensure_ordered("string_length", &self.string_length)?;
        ensure_ordered("int_range", &self.int_range)?;
        if !(self.float_range.start().is_finite() && self.float_range.end().is_finite()) {
            return Err(FixturaError::invalid_settings("float_range bounds must be finite"));
        }
        ensure_ordered("float_range", &self.float_range)?;
        if !(0.0..=1.0).contains(&self.nullable_probability) {
            return Err(FixturaError::invalid_settings(format!(
                "nullable_probability {} lies outside [0, 1]",
                self.nullable_probability
            )));
        }
        Ok(())
    }

    /// Maximum traversal depth.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Truncation policy for nodes beyond the maximum depth.
    #[must_use]
    pub const fn max_depth_policy(&self) -> TruncationPolicy {
        self.max_depth_policy
    }

    /// Size bounds for sequences and sets.
    #[must_use]
    pub const fn collection_size(&self) -> &RangeInclusive<usize> {
        &self.collection_size
    }

    /// Size bounds for maps.
    #[must_use]
    pub const fn map_size(&self) -> &RangeInclusive<usize> {
        &self.map_size
    }

    /// Length bounds for generated strings.
    #[must_use]
    pub const fn string_length(&self) -> &RangeInclusive<usize> {
        &self.string_length
    }

    /// Bounds for generated integers.
    #[must_use]
    pub const fn int_range(&self) -> &RangeInclusive<i64> {
        &self.int_range
    }

    /// Bounds for generated floats.
    #[must_use]
    pub const fn float_range(&self) -> &RangeInclusive<f64> {
        &self.float_range
    }

    /// Probability that a nullable node is left `Null`.
    #[must_use]
    pub const fn nullable_probability(&self) -> f64 {
        self.nullable_probability
    }

    /// Whether `Option` members may be generated as `None`.
    #[must_use]
    pub const fn nullable_options(&self) -> bool {
        self.nullable_options
    }

    /// Explicitly configured seed, if any.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Strict or lenient selector auditing.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Creates the call's random source, drawing and logging a seed when none
    /// is configured.
    pub(crate) fn random(&self) -> Random {
        let seed = self.seed.unwrap_or_else(|| {
            let seed = Random::entropy_seed();
            info!(seed, "no seed configured; drew one from entropy");
            seed
        });
        Random::from_seed(seed)
    }
}

fn ensure_ordered<T: PartialOrd + std::fmt::Debug>(
    key: &str,
    range: &RangeInclusive<T>,
) -> Result<(), FixturaError> {
    if range.start() > range.end() {
        return Err(FixturaError::invalid_settings(format!(
            "{key} has inverted bounds {range:?}"
        )));
    }
    Ok(())
}
