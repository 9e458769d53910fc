//! Value generators: built-in defaults and the `generate` specs.

use std::{ops::RangeInclusive, sync::Arc};

use crate::{
    random::Random,
    schema::{NodeKind, ScalarKind, ScalarShape},
    settings::SettingsSnapshot,
    value::Value,
};

/// A generator spec passed to [`crate::FixtureBuilder::generate`].
///
/// Scalar specs replace the node's value outright. [`CollectionSpec`] only
/// changes how many elements a container receives; the elements themselves
/// are still populated normally.
///
/// # Examples
/// ```
/// use fixtura_core::Gen;
///
/// let spec = Gen::strings().prefix("user-").length(4..=4);
/// assert_eq!(Gen::from(spec).name(), "strings");
/// assert_eq!(Gen::collection().size(3).resolve(&(2..=6)), 3..=3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Gen {
    /// Signed integers within a range.
    Ints(RangeInclusive<i64>),
    /// Unsigned integers within a range.
    UInts(RangeInclusive<u64>),
    /// Floats within a range.
    Floats(RangeInclusive<f64>),
    /// Alphanumeric strings.
    Strings(StringSpec),
    /// One of the listed values.
    OneOf(Vec<Value>),
    /// Booleans.
    Bools,
    /// Characters within a range.
    Chars(RangeInclusive<char>),
    /// Container size.
    Collection(CollectionSpec),
}

impl Gen {
    /// Signed integers drawn from `range`.
    #[must_use]
    pub const fn ints(range: RangeInclusive<i64>) -> Self {
        Self::Ints(range)
    }

    /// Unsigned integers drawn from `range`.
    #[must_use]
    pub const fn uints(range: RangeInclusive<u64>) -> Self {
        Self::UInts(range)
    }

    /// Floats drawn from `range`.
    #[must_use]
    pub const fn floats(range: RangeInclusive<f64>) -> Self {
        Self::Floats(range)
    }

    /// Starts a string spec.
    #[must_use]
    pub fn strings() -> StringSpec {
        StringSpec::default()
    }

    /// One of `values`, chosen uniformly.
    #[must_use]
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Booleans.
    #[must_use]
    pub const fn bools() -> Self {
        Self::Bools
    }

    /// Characters drawn from `range`.
    #[must_use]
    pub const fn chars(range: RangeInclusive<char>) -> Self {
        Self::Chars(range)
    }

    /// Starts a container size spec.
    #[must_use]
    pub fn collection() -> CollectionSpec {
        CollectionSpec::default()
    }

    /// Short name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ints(_) => "ints",
            Self::UInts(_) => "uints",
            Self::Floats(_) => "floats",
            Self::Strings(_) => "strings",
            Self::OneOf(_) => "one_of",
            Self::Bools => "bools",
            Self::Chars(_) => "chars",
            Self::Collection(_) => "collection",
        }
    }

    /// Returns `true` when the spec replaces the node's whole subtree.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        !matches!(self, Self::Collection(_))
    }

    /// Checks the spec for empty ranges and choices.
    pub(crate) fn validate(&self) -> Result<(), Arc<str>> {
        let problem = match self {
            Self::Ints(range) => range.is_empty().then_some("integer range is empty"),
            Self::UInts(range) => range.is_empty().then_some("integer range is empty"),
            Self::Floats(range) => (!(range.start().is_finite() && range.end().is_finite())
                || range.start() > range.end())
            .then_some("float range must be finite and ordered"),
            Self::Strings(spec) => spec
                .length
                .as_ref()
                .is_some_and(RangeInclusive::is_empty)
                .then_some("string length range is empty"),
            Self::OneOf(values) => values.is_empty().then_some("one_of needs at least one value"),
            Self::Bools => None,
            Self::Chars(range) => range.is_empty().then_some("character range is empty"),
            Self::Collection(spec) => match (spec.min_size, spec.max_size) {
                (Some(min), Some(max)) if min > max => Some("collection min_size exceeds max_size"),
                _ => None,
            },
        };
        problem.map_or(Ok(()), |reason| Err(Arc::from(format!("{}: {reason}", self.name()))))
    }

    /// Produces a leaf value for a node of `kind`.
    pub(crate) fn produce(
        &self,
        kind: &NodeKind,
        settings: &SettingsSnapshot,
        random: &mut Random,
    ) -> Result<Value, Arc<str>> {
        let primitive = match kind {
            NodeKind::Scalar(ScalarShape::Primitive(primitive)) => Some(*primitive),
            _ => None,
        };
        match (self, primitive) {
            (Self::OneOf(values), _) => Ok(random.pick(values).cloned().unwrap_or(Value::Null)),
            (Self::Ints(range), Some(primitive)) if primitive.integer_bounds().is_some() => {
                let (lo, hi) = (i128::from(*range.start()), i128::from(*range.end()));
                draw_bounded(primitive, lo, hi, random).ok_or_else(|| {
                    out_of_bounds(self.name(), primitive)
                })
            }
            (Self::UInts(range), Some(primitive)) if primitive.integer_bounds().is_some() => {
                let (lo, hi) = (i128::from(*range.start()), i128::from(*range.end()));
                draw_bounded(primitive, lo, hi, random).ok_or_else(|| {
                    out_of_bounds(self.name(), primitive)
                })
            }
            (Self::Floats(range), Some(ScalarKind::F32 | ScalarKind::F64)) => {
                Ok(Value::Float(random.float_in(range.clone())))
            }
            (Self::Strings(spec), Some(ScalarKind::String)) => {
                Ok(Value::Str(spec.produce(settings, random)))
            }
            (Self::Bools, Some(ScalarKind::Bool)) => Ok(Value::Bool(random.chance(0.5))),
            (Self::Chars(range), Some(ScalarKind::Char)) => {
                Ok(Value::Char(random.char_in(range.clone())))
            }
            _ => Err(Arc::from(format!(
                "generator `{}` cannot populate {}",
                self.name(),
                describe_kind(kind)
            ))),
        }
    }
}

fn out_of_bounds(generator: &str, primitive: ScalarKind) -> Arc<str> {
    Arc::from(format!(
        "generator `{generator}` range lies outside the bounds of `{}`",
        primitive.name()
    ))
}

fn describe_kind(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Struct { name, .. } => format!("struct `{name}`"),
        NodeKind::Sequence { .. } => "a sequence".to_owned(),
        NodeKind::Map { .. } => "a map".to_owned(),
        NodeKind::Scalar(ScalarShape::Primitive(primitive)) => format!("`{}`", primitive.name()),
        NodeKind::Scalar(ScalarShape::Enum(_)) => "an enum".to_owned(),
        NodeKind::Unresolved { reason } => format!("an unresolved node ({reason})"),
    }
}

impl From<StringSpec> for Gen {
    fn from(spec: StringSpec) -> Self {
        Self::Strings(spec)
    }
}

impl From<CollectionSpec> for Gen {
    fn from(spec: CollectionSpec) -> Self {
        Self::Collection(spec)
    }
}

/// Alphanumeric string spec with optional affixes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StringSpec {
    prefix: Option<String>,
    suffix: Option<String>,
    length: Option<RangeInclusive<usize>>,
}

impl StringSpec {
    /// Prepends `prefix` to every string.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Appends `suffix` to every string.
    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Bounds the length of the random part.
    #[must_use]
    pub fn length(mut self, length: RangeInclusive<usize>) -> Self {
        self.length = Some(length);
        self
    }

    fn produce(&self, settings: &SettingsSnapshot, random: &mut Random) -> String {
        let length = self
            .length
            .clone()
            .unwrap_or_else(|| settings.string_length().clone());
        let mut text = self.prefix.clone().unwrap_or_default();
        text.push_str(&random.alphanumeric(length));
        if let Some(suffix) = &self.suffix {
            text.push_str(suffix);
        }
        text
    }
}

/// Container size spec.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CollectionSpec {
    min_size: Option<usize>,
    max_size: Option<usize>,
}

impl CollectionSpec {
    /// Fixes the exact number of elements.
    #[must_use]
    pub const fn size(mut self, size: usize) -> Self {
        self.min_size = Some(size);
        self.max_size = Some(size);
        self
    }

    /// Sets the minimum number of elements.
    #[must_use]
    pub const fn min_size(mut self, size: usize) -> Self {
        self.min_size = Some(size);
        self
    }

    /// Sets the maximum number of elements.
    #[must_use]
    pub const fn max_size(mut self, size: usize) -> Self {
        self.max_size = Some(size);
        self
    }

    /// Resolves the size bounds against the configured `default`.
    ///
    /// A lone minimum above the default range raises the maximum with it, and
    /// a lone maximum below the default range lowers the minimum.
    #[must_use]
    pub fn resolve(&self, default: &RangeInclusive<usize>) -> RangeInclusive<usize> {
        match (self.min_size, self.max_size) {
            (Some(min), Some(max)) => min..=max,
            (Some(min), None) => min..=min.max(*default.end()),
            (None, Some(max)) => (*default.start()).min(max)..=max,
            (None, None) => default.clone(),
        }
    }
}

/// Produces a default value for a scalar shape.
pub(crate) fn default_scalar(
    shape: &ScalarShape,
    settings: &SettingsSnapshot,
    random: &mut Random,
) -> Value {
    match shape {
        ScalarShape::Enum(variants) => random
            .pick(variants)
            .map_or(Value::Null, |variant| Value::Enum(Arc::clone(variant))),
        ScalarShape::Primitive(ScalarKind::Bool) => Value::Bool(random.chance(0.5)),
        ScalarShape::Primitive(ScalarKind::Char) => Value::Char(random.char_in('a'..='z')),
        ScalarShape::Primitive(ScalarKind::String) => {
            Value::Str(random.alphanumeric(settings.string_length().clone()))
        }
        ScalarShape::Primitive(kind @ (ScalarKind::F32 | ScalarKind::F64)) => {
            let range = settings.float_range();
            let (lo, hi) = if *kind == ScalarKind::F32 {
                let limit = f64::from(f32::MAX);
                (range.start().clamp(-limit, limit), range.end().clamp(-limit, limit))
            } else {
                (*range.start(), *range.end())
            };
            Value::Float(random.float_in(lo..=hi))
        }
        ScalarShape::Primitive(kind) => {
            let range = settings.int_range();
            let (lo, hi) = (i128::from(*range.start()), i128::from(*range.end()));
            draw_bounded(*kind, lo, hi, random)
                .or_else(|| {
                    let bound = nearest_bound(*kind, hi)?;
                    draw_bounded(*kind, bound, bound, random)
                })
                .unwrap_or(Value::Null)
        }
    }
}

fn nearest_bound(kind: ScalarKind, hi: i128) -> Option<i128> {
    let (min, max) = kind.integer_bounds()?;
    Some(hi.clamp(min, max))
}

/// Draws an integer of `kind` from `lo..=hi` intersected with the type's
/// bounds; `None` when the intersection is empty.
fn draw_bounded(kind: ScalarKind, lo: i128, hi: i128, random: &mut Random) -> Option<Value> {
    let (min, max) = kind.integer_bounds()?;
    let (lo, hi) = (lo.max(min), hi.min(max));
    if lo > hi {
        return None;
    }
    if kind.is_unsigned() {
        let lo = u64::try_from(lo).ok()?;
        let hi = u64::try_from(hi).ok()?;
        Some(Value::UInt(random.uint_in(lo..=hi)))
    } else {
        let lo = i64::try_from(lo).ok()?;
        let hi = i64::try_from(hi).ok()?;
        Some(Value::Int(random.int_in(lo..=hi)))
    }
}

/// Draws a container size.
pub(crate) fn container_size(
    keyed: bool,
    spec: Option<&CollectionSpec>,
    settings: &SettingsSnapshot,
    random: &mut Random,
) -> usize {
    let default = if keyed {
        settings.map_size()
    } else {
        settings.collection_size()
    };
    let range = spec.map_or_else(|| default.clone(), |spec| spec.resolve(default));
    random.usize_in(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    use rstest::rstest;

    fn settings() -> SettingsSnapshot {
        Settings::new().resolve().expect("defaults are valid")
    }

    fn scalar(kind: ScalarKind) -> NodeKind {
        NodeKind::Scalar(ScalarShape::Primitive(kind))
    }

    #[rstest]
    #[case(Gen::ints(5..=1), "ints: integer range is empty")]
    #[case(Gen::one_of(Vec::<i32>::new()), "one_of: one_of needs at least one value")]
    #[case(Gen::from(Gen::strings().length(3..=1)), "strings: string length range is empty")]
    #[case(
        Gen::from(Gen::collection().min_size(4).max_size(2)),
        "collection: collection min_size exceeds max_size"
    )]
    fn invalid_specs_are_reported(#[case] spec: Gen, #[case] expected: &str) {
        assert_eq!(&*spec.validate().expect_err("spec is invalid"), expected);
    }

    #[test]
    fn ints_are_clamped_to_the_target_type() {
        let mut random = Random::from_seed(3);
        for _ in 0..32 {
            let value = Gen::ints(-5..=300)
                .produce(&scalar(ScalarKind::U8), &settings(), &mut random)
                .expect("range overlaps u8");
            assert!(matches!(value, Value::UInt(0..=255)), "{value:?}");
        }
        let err = Gen::ints(-5..=-1)
            .produce(&scalar(ScalarKind::U8), &settings(), &mut random)
            .expect_err("range is disjoint from u8");
        assert!(err.contains("outside the bounds of `u8`"));
    }

    #[test]
    fn mismatched_generators_are_rejected() {
        let mut random = Random::from_seed(3);
        let err = Gen::bools()
            .produce(&scalar(ScalarKind::String), &settings(), &mut random)
            .expect_err("bools cannot populate strings");
        assert_eq!(&*err, "generator `bools` cannot populate `String`");
    }

    #[test]
    fn strings_honour_affixes_and_length() {
        let mut random = Random::from_seed(11);
        let spec = Gen::from(Gen::strings().prefix("id-").suffix("!").length(4..=4));
        let value = spec
            .produce(&scalar(ScalarKind::String), &settings(), &mut random)
            .expect("strings populate String");
        let text = value.as_str().expect("a string value");
        assert!(text.starts_with("id-") && text.ends_with('!'));
        assert_eq!(text.len(), 8);
    }

    #[rstest]
    #[case(Gen::collection().min_size(9), 9..=9)]
    #[case(Gen::collection().max_size(1), 1..=1)]
    #[case(Gen::collection().min_size(3), 3..=6)]
    #[case(Gen::collection(), 2..=6)]
    fn collection_bounds_resolve_against_defaults(
        #[case] spec: CollectionSpec,
        #[case] expected: RangeInclusive<usize>,
    ) {
        assert_eq!(spec.resolve(&(2..=6)), expected);
    }

    #[test]
    fn default_integers_stay_within_type_and_settings() {
        let snapshot = Settings::new()
            .int_range(100..=1_000)
            .resolve()
            .expect("valid settings");
        let mut random = Random::from_seed(5);
        for _ in 0..32 {
            let wide = default_scalar(&ScalarShape::Primitive(ScalarKind::I32), &snapshot, &mut random);
            assert!(matches!(wide, Value::Int(100..=1_000)), "{wide:?}");
            let narrow = default_scalar(&ScalarShape::Primitive(ScalarKind::I8), &snapshot, &mut random);
            assert!(matches!(narrow, Value::Int(100..=127)), "{narrow:?}");
        }
    }

    #[test]
    fn enums_pick_a_declared_variant() {
        let variants: Arc<[Arc<str>]> = vec![Arc::from("Red"), Arc::from("Blue")].into();
        let mut random = Random::from_seed(5);
        let value = default_scalar(&ScalarShape::Enum(variants), &settings(), &mut random);
        assert!(matches!(value.as_variant(), Some("Red" | "Blue")));
    }
}
