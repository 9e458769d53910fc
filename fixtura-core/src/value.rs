//! Dynamic values produced by population.

use std::{fmt, sync::Arc};

/// A populated value. `Null` is the empty/zero value left behind by
/// truncation, cycle breaking and `ignore` customisations.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent or zero value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A floating-point number.
    Float(f64),
    /// A character.
    Char(char),
    /// A string.
    Str(String),
    /// The name of an enum variant.
    Enum(Arc<str>),
    /// Elements of a sequence, in order.
    Seq(Vec<Value>),
    /// Elements of a set, distinct and in insertion order.
    Set(Vec<Value>),
    /// Key/value pairs of a map, keys distinct and in insertion order.
    Map(Vec<(Value, Value)>),
    /// A struct.
    Struct(Record),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value's variant, used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Char(_) => "char",
            Self::Str(_) => "string",
            Self::Enum(_) => "enum",
            Self::Seq(_) => "sequence",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
        }
    }

    /// Borrows the record of a [`Value::Struct`].
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Struct(record) => Some(record),
            _ => None,
        }
    }

    /// Mutably borrows the record of a [`Value::Struct`].
    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Self::Struct(record) => Some(record),
            _ => None,
        }
    }

    /// Borrows the string of a [`Value::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Returns the integer of an [`Value::Int`] or an in-range [`Value::UInt`].
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::UInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Returns the variant name of a [`Value::Enum`].
    #[must_use]
    pub fn as_variant(&self) -> Option<&str> {
        match self {
            Self::Enum(variant) => Some(&**variant),
            _ => None,
        }
    }

    /// Borrows the elements of a [`Value::Seq`] or [`Value::Set`].
    #[must_use]
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Self::Seq(elements) | Self::Set(elements) => Some(elements.as_slice()),
            _ => None,
        }
    }

    /// Follows a dotted member path (`"address.city"`) through nested records.
    ///
    /// # Examples
    /// ```
    /// use fixtura_core::{Record, Value};
    ///
    /// let mut address = Record::new("Address");
    /// address.set("city", Value::from("Lisbon"));
    /// let mut person = Record::new("Person");
    /// person.set("address", Value::Struct(address));
    /// let person = Value::Struct(person);
    ///
    /// assert_eq!(person.pointer("address.city"), Some(&Value::from("Lisbon")));
    /// assert_eq!(person.pointer("address.street"), None);
    /// ```
    #[must_use]
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(self, |value, member| value.as_record()?.get(member))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Char(value) => write!(f, "{value:?}"),
            Self::Str(value) => write!(f, "{value:?}"),
            Self::Enum(variant) => f.write_str(variant),
            Self::Seq(elements) | Self::Set(elements) => {
                f.write_str("[")?;
                write_joined(f, elements.iter())?;
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Struct(record) => write!(f, "{record}"),
        }
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    values: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    for (index, value) in values.enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

/// The members of a populated struct, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    type_name: Arc<str>,
    fields: Vec<(Arc<str>, Value)>,
}

impl Record {
    /// Creates an empty record for `type_name`.
    #[must_use]
    pub fn new(type_name: impl Into<Arc<str>>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Returns the rendered type of the record, including generic arguments.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Looks up a member.
    #[must_use]
    pub fn get(&self, member: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| &**name == member)
            .map(|(_, value)| value)
    }

    /// Mutably looks up a member.
    pub fn get_mut(&mut self, member: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(name, _)| &**name == member)
            .map(|(_, value)| value)
    }

    /// Sets a member, appending it if absent.
    pub fn set(&mut self, member: impl Into<Arc<str>>, value: Value) {
        let member = member.into();
        match self.get_mut(&member) {
            Some(slot) => *slot = value,
            None => self.fields.push((member, value)),
        }
    }

    /// Removes a member and returns its value, or [`Value::Null`] if absent.
    pub fn take(&mut self, member: &str) -> Value {
        self.fields
            .iter()
            .position(|(name, _)| &**name == member)
            .map_or(Value::Null, |index| self.fields.remove(index).1)
    }

    /// Iterates over the members in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (&**name, value))
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when the record has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.type_name)?;
        for (index, (name, value)) in self.fields.iter().enumerate() {
            let separator = if index == 0 { " " } else { ", " };
            write!(f, "{separator}{name}: {value}")?;
        }
        if self.fields.is_empty() {
            f.write_str("}")
        } else {
            f.write_str(" }")
        }
    }
}

macro_rules! value_from {
    ($variant:ident: $($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )+
    };
}

value_from!(Int: i8, i16, i32, i64);
value_from!(UInt: u8, u16, u32, u64);
value_from!(Float: f32, f64);
value_from!(Bool: bool);
value_from!(Char: char);
value_from!(Str: String, &str);

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::Seq(values.into_iter().map(Into::into).collect())
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Struct(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_set_replaces_existing_members() {
        let mut record = Record::new("Person");
        record.set("name", Value::from("Ada"));
        record.set("age", Value::from(36_u8));
        record.set("name", Value::from("Grace"));
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("name"), Some(&Value::Str("Grace".to_owned())));
        assert_eq!(record.take("age"), Value::UInt(36));
        assert_eq!(record.take("age"), Value::Null);
    }

    #[test]
    fn display_renders_nested_values() {
        let mut record = Record::new("Tag");
        record.set("label", Value::from("x"));
        record.set("weights", Value::from(vec![1_i32, 2]));
        record.set("parent", Value::Null);
        assert_eq!(
            Value::Struct(record).to_string(),
            r#"Tag { label: "x", weights: [1, 2], parent: null }"#
        );
    }

    #[test]
    fn options_convert_to_null_or_inner_value() {
        assert_eq!(Value::from(None::<u8>), Value::Null);
        assert_eq!(Value::from(Some('z')), Value::Char('z'));
    }
}
