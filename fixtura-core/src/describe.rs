//! Bridge between Rust types and the engine's structural model.
//!
//! [`Describe`] lets a Rust type register itself in a [`Schema`] and name its
//! [`TypeExpr`]; [`FromValue`] converts a populated [`Value`] back into the
//! Rust type. `Null` converts to the type's zero value, so truncated members
//! land as `0`, `false`, `""`, empty containers or `None`.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    hash::{BuildHasher, Hash},
    sync::Arc,
};

use thiserror::Error;

use crate::{
    schema::{ScalarKind, Schema, TypeExpr},
    value::{Record, Value},
};

/// Error raised when a [`Value`] cannot be converted into a Rust type.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ValueError {
    /// The value's shape does not match the target type.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Description of the expected shape.
        expected: &'static str,
        /// Variant name of the value actually found.
        found: &'static str,
    },
    /// A numeric value does not fit the target type.
    #[error("value {value} is out of range for {target}")]
    OutOfRange {
        /// Rendered offending value.
        value: String,
        /// Target type name.
        target: &'static str,
    },
    /// An enum variant name is not known to the target type.
    #[error("unknown variant `{variant}` for enum `{enum_name}`")]
    UnknownVariant {
        /// Target enum name.
        enum_name: &'static str,
        /// Variant name found in the value.
        variant: Arc<str>,
    },
    /// A struct member failed to convert.
    #[error("member `{member}` of `{record}`: {source}")]
    Member {
        /// Record type name.
        record: Arc<str>,
        /// Member name.
        member: &'static str,
        /// Underlying conversion error.
        #[source]
        source: Box<ValueError>,
    },
}

/// Describes a Rust type to the engine.
///
/// # Examples
/// ```
/// use fixtura_core::{Describe, Schema, TypeExpr};
///
/// struct Tree;
///
/// impl Describe for Tree {
///     fn describe(schema: &mut Schema) -> TypeExpr {
///         schema.describe_struct("Tree", |s| {
///             s.field::<String>("label").field::<Vec<Tree>>("children")
///         })
///     }
/// }
///
/// let mut schema = Schema::new();
/// assert_eq!(Tree::describe(&mut schema), TypeExpr::named("Tree"));
/// assert!(schema.contains("Tree"));
/// ```
pub trait Describe {
    /// Registers any named types this type depends on and returns its
    /// expression.
    fn describe(schema: &mut Schema) -> TypeExpr;
}

/// Converts a populated [`Value`] into a Rust type.
pub trait FromValue: Sized {
    /// Performs the conversion.
    ///
    /// # Errors
    /// Returns [`ValueError`] when the value's shape or range does not fit.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl Value {
    /// Unwraps a [`Value::Struct`] for hand-written [`FromValue`] impls.
    ///
    /// # Errors
    /// Returns [`ValueError::TypeMismatch`] for any other variant, including
    /// `Null`.
    pub fn into_record(self) -> Result<Record, ValueError> {
        match self {
            Self::Struct(record) => Ok(record),
            other => Err(mismatch("struct", &other)),
        }
    }
}

impl Record {
    /// Removes `member` and converts it, attaching the member name to errors.
    ///
    /// # Errors
    /// Returns [`ValueError::Member`] wrapping the conversion failure.
    pub fn extract<T: FromValue>(&mut self, member: &'static str) -> Result<T, ValueError> {
        T::from_value(self.take(member)).map_err(|source| ValueError::Member {
            record: Arc::from(self.type_name()),
            member,
            source: Box::new(source),
        })
    }
}

fn mismatch(expected: &'static str, found: &Value) -> ValueError {
    ValueError::TypeMismatch {
        expected,
        found: found.kind_name(),
    }
}

macro_rules! describe_scalar {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe(_: &mut Schema) -> TypeExpr {
                    TypeExpr::Scalar(ScalarKind::$kind)
                }
            }
        )+
    };
}

describe_scalar! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
}

impl<T: Describe> Describe for Option<T> {
    fn describe(schema: &mut Schema) -> TypeExpr {
        TypeExpr::optional(T::describe(schema))
    }
}

impl<T: Describe> Describe for Box<T> {
    fn describe(schema: &mut Schema) -> TypeExpr {
        T::describe(schema)
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe(schema: &mut Schema) -> TypeExpr {
        TypeExpr::seq(T::describe(schema))
    }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn describe(schema: &mut Schema) -> TypeExpr {
        TypeExpr::set(T::describe(schema))
    }
}

impl<T: Describe, S> Describe for HashSet<T, S> {
    fn describe(schema: &mut Schema) -> TypeExpr {
        TypeExpr::set(T::describe(schema))
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn describe(schema: &mut Schema) -> TypeExpr {
        let key = K::describe(schema);
        TypeExpr::map(key, V::describe(schema))
    }
}

impl<K: Describe, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe(schema: &mut Schema) -> TypeExpr {
        let key = K::describe(schema);
        TypeExpr::map(key, V::describe(schema))
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(flag) => Ok(flag),
            other => Err(mismatch("bool", &other)),
        }
    }
}

macro_rules! from_value_integer {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let out_of_range = |rendered: String| ValueError::OutOfRange {
                        value: rendered,
                        target: stringify!($ty),
                    };
                    match value {
                        Value::Null => Ok(0),
                        Value::Int(raw) => Self::try_from(raw).map_err(|_| out_of_range(raw.to_string())),
                        Value::UInt(raw) => Self::try_from(raw).map_err(|_| out_of_range(raw.to_string())),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )+
    };
}

from_value_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(0.0),
            Value::Float(raw) => Ok(raw),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(0.0),
            #[expect(
                clippy::cast_possible_truncation,
                reason = "generated floats are drawn from f32-representable bounds"
            )]
            Value::Float(raw) => Ok(raw as f32),
            other => Err(mismatch("f32", &other)),
        }
    }
}

impl FromValue for char {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok('\0'),
            Value::Char(ch) => Ok(ch),
            other => Err(mismatch("char", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Str(text) => Ok(text),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Box<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        T::from_value(value).map(Box::new)
    }
}

fn elements(value: Value, expected: &'static str) -> Result<Vec<Value>, ValueError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Seq(elements) | Value::Set(elements) => Ok(elements),
        other => Err(mismatch(expected, &other)),
    }
}

fn entries(value: Value) -> Result<Vec<(Value, Value)>, ValueError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Map(entries) => Ok(entries),
        other => Err(mismatch("map", &other)),
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, "sequence")?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, "set")?.into_iter().map(T::from_value).collect()
    }
}

impl<T, S> FromValue for HashSet<T, S>
where
    T: FromValue + Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, "set")?.into_iter().map(T::from_value).collect()
    }
}

impl<K: FromValue + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        entries(value)?
            .into_iter()
            .map(|(key, value)| Ok((K::from_value(key)?, V::from_value(value)?)))
            .collect()
    }
}

impl<K, V, S> FromValue for HashMap<K, V, S>
where
    K: FromValue + Eq + Hash,
    V: FromValue,
    S: BuildHasher + Default,
{
    fn from_value(value: Value) -> Result<Self, ValueError> {
        entries(value)?
            .into_iter()
            .map(|(key, value)| Ok((K::from_value(key)?, V::from_value(value)?)))
            .collect()
    }
}
