//! Conversion between `serde_json` documents and populated values.

use fixtura_core::{Record, ScalarKind, Schema, TypeDef, TypeExpr, Value};
use serde_json::{Map, Number, Value as Json};
use thiserror::Error;

/// A JSON literal that does not fit the member it was supplied for.
#[derive(Debug, Error, PartialEq)]
#[error("expected {expected} at `{path}`, found `{found}`")]
pub struct ConvertError {
    path: String,
    expected: String,
    found: String,
}

impl ConvertError {
    fn new(path: &str, expected: impl ToString, found: &Json) -> Self {
        Self {
            path: path.to_owned(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Renders a populated value as JSON.
///
/// Structs become objects and enums their variant name. Maps whose keys are
/// all strings or enum variants become objects; any other map becomes an
/// array of `[key, value]` pairs. Non-finite floats render as `null`.
#[must_use]
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(flag) => Json::Bool(*flag),
        Value::Int(number) => Json::from(*number),
        Value::UInt(number) => Json::from(*number),
        Value::Float(number) => Number::from_f64(*number).map_or(Json::Null, Json::Number),
        Value::Char(ch) => Json::String(ch.to_string()),
        Value::Str(text) => Json::String(text.clone()),
        Value::Enum(variant) => Json::String(variant.to_string()),
        Value::Seq(elements) | Value::Set(elements) => {
            Json::Array(elements.iter().map(to_json).collect())
        }
        Value::Map(entries) => map_to_json(entries),
        Value::Struct(record) => Json::Object(
            record
                .fields()
                .map(|(name, member)| (name.to_owned(), to_json(member)))
                .collect(),
        ),
    }
}

fn map_to_json(entries: &[(Value, Value)]) -> Json {
    let keyed: Option<Map<String, Json>> = entries
        .iter()
        .map(|(key, value)| match key {
            Value::Str(text) => Some((text.clone(), to_json(value))),
            Value::Enum(variant) => Some((variant.to_string(), to_json(value))),
            _ => None,
        })
        .collect();
    keyed.map_or_else(
        || {
            Json::Array(
                entries
                    .iter()
                    .map(|(key, value)| Json::Array(vec![to_json(key), to_json(value)]))
                    .collect(),
            )
        },
        Json::Object,
    )
}

/// Converts a JSON literal into a value of type `ty`.
///
/// `path` names the destination in error messages. Type parameters and
/// interfaces carry no shape of their own, so their literals are converted
/// by inspection.
///
/// # Errors
/// Returns [`ConvertError`] when the literal does not fit `ty`.
pub fn from_json(
    json: &Json,
    ty: &TypeExpr,
    schema: &Schema,
    path: &str,
) -> Result<Value, ConvertError> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    match ty {
        TypeExpr::Scalar(kind) => scalar(json, *kind, path),
        TypeExpr::Optional(inner) => from_json(json, inner, schema, path),
        TypeExpr::Seq(element) => elements(json, element, schema, path).map(Value::Seq),
        TypeExpr::Set(element) => elements(json, element, schema, path).map(Value::Set),
        TypeExpr::Map(key, value) => entries(json, key, value, schema, path),
        TypeExpr::Param(_) => Ok(inferred(json)),
        TypeExpr::Named { name, .. } => match schema.get(name) {
            Some(TypeDef::Enum(def)) => json
                .as_str()
                .and_then(|raw| def.variants().iter().find(|variant| &***variant == raw))
                .map(|variant| Value::Enum(variant.clone()))
                .ok_or_else(|| ConvertError::new(path, format!("a variant of `{name}`"), json)),
            Some(TypeDef::Struct(def)) => {
                let object = json
                    .as_object()
                    .ok_or_else(|| ConvertError::new(path, format!("a `{name}` object"), json))?;
                let mut record = Record::new(name.clone());
                for member in def.fields() {
                    let nested = format!("{path}.{}", member.name());
                    let value = object.get(member.name()).map_or(Ok(Value::Null), |raw| {
                        from_json(raw, member.ty(), schema, &nested)
                    })?;
                    record.set(member.name(), value);
                }
                Ok(Value::Struct(record))
            }
            Some(TypeDef::Interface(_)) | None => Ok(inferred(json)),
        },
    }
}

fn scalar(json: &Json, kind: ScalarKind, path: &str) -> Result<Value, ConvertError> {
    let mismatch = || ConvertError::new(path, format!("a `{}`", kind.name()), json);
    match kind {
        ScalarKind::Bool => json.as_bool().map(Value::Bool).ok_or_else(mismatch),
        ScalarKind::String => json
            .as_str()
            .map(|text| Value::Str(text.to_owned()))
            .ok_or_else(mismatch),
        ScalarKind::Char => {
            let mut chars = json.as_str().map(str::chars).ok_or_else(mismatch)?;
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(Value::Char(ch)),
                _ => Err(mismatch()),
            }
        }
        ScalarKind::F32 | ScalarKind::F64 => json.as_f64().map(Value::Float).ok_or_else(mismatch),
        ScalarKind::U8 => unsigned(json, u64::from(u8::MAX)).ok_or_else(mismatch),
        ScalarKind::U16 => unsigned(json, u64::from(u16::MAX)).ok_or_else(mismatch),
        ScalarKind::U32 => unsigned(json, u64::from(u32::MAX)).ok_or_else(mismatch),
        ScalarKind::U64 => unsigned(json, u64::MAX).ok_or_else(mismatch),
        ScalarKind::I8 => signed(json, i64::from(i8::MIN), i64::from(i8::MAX)).ok_or_else(mismatch),
        ScalarKind::I16 => {
            signed(json, i64::from(i16::MIN), i64::from(i16::MAX)).ok_or_else(mismatch)
        }
        ScalarKind::I32 => {
            signed(json, i64::from(i32::MIN), i64::from(i32::MAX)).ok_or_else(mismatch)
        }
        ScalarKind::I64 => signed(json, i64::MIN, i64::MAX).ok_or_else(mismatch),
    }
}

fn unsigned(json: &Json, max: u64) -> Option<Value> {
    json.as_u64()
        .filter(|number| *number <= max)
        .map(Value::UInt)
}

fn signed(json: &Json, min: i64, max: i64) -> Option<Value> {
    json.as_i64()
        .filter(|number| (min..=max).contains(number))
        .map(Value::Int)
}

fn elements(
    json: &Json,
    element: &TypeExpr,
    schema: &Schema,
    path: &str,
) -> Result<Vec<Value>, ConvertError> {
    let array = json
        .as_array()
        .ok_or_else(|| ConvertError::new(path, "an array", json))?;
    array
        .iter()
        .enumerate()
        .map(|(index, raw)| from_json(raw, element, schema, &format!("{path}[{index}]")))
        .collect()
}

fn entries(
    json: &Json,
    key: &TypeExpr,
    value: &TypeExpr,
    schema: &Schema,
    path: &str,
) -> Result<Value, ConvertError> {
    let object = json
        .as_object()
        .ok_or_else(|| ConvertError::new(path, "an object", json))?;
    object
        .iter()
        .map(|(raw_key, raw_value)| {
            let nested = format!("{path}[{raw_key}]");
            let key = from_json(&Json::String(raw_key.clone()), key, schema, &nested)?;
            Ok((key, from_json(raw_value, value, schema, &nested)?))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Map)
}

fn inferred(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(flag) => Value::Bool(*flag),
        Json::Number(number) => number
            .as_u64()
            .map(Value::UInt)
            .or_else(|| number.as_i64().map(Value::Int))
            .or_else(|| number.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        Json::String(text) => Value::Str(text.clone()),
        Json::Array(items) => Value::Seq(items.iter().map(inferred).collect()),
        Json::Object(object) => Value::Map(
            object
                .iter()
                .map(|(key, value)| (Value::Str(key.clone()), inferred(value)))
                .collect(),
        ),
    }
}
