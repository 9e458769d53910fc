#![expect(dead_code, reason = "each test binary uses a subset of the helpers")]

use fixtura_core::{
    Describe, EnumDef, FromValue, InterfaceDef, ScalarKind, Schema, StructDef, TypeExpr, Value,
    ValueError,
};

/// `Root -> A -> B`, each level carrying a string label.
#[must_use]
pub fn three_levels() -> Schema {
    Schema::new()
        .with(
            StructDef::new("Root")
                .field("label", ScalarKind::String)
                .field("a", TypeExpr::named("A")),
        )
        .with(
            StructDef::new("A")
                .field("label", ScalarKind::String)
                .field("b", TypeExpr::named("B")),
        )
        .with(StructDef::new("B").field("label", ScalarKind::String))
}

/// `A.b: B` and `B.a: A`.
#[must_use]
pub fn mutual() -> Schema {
    Schema::new()
        .with(
            StructDef::new("A")
                .field("id", ScalarKind::U32)
                .field("b", TypeExpr::named("B")),
        )
        .with(
            StructDef::new("B")
                .field("id", ScalarKind::U32)
                .field("a", TypeExpr::named("A")),
        )
}

/// A small company model with repeated member names, a map, an enum and an
/// interface.
#[must_use]
pub fn company() -> Schema {
    Schema::new()
        .with(
            StructDef::new("Company")
                .field("name", ScalarKind::String)
                .field("ceo", TypeExpr::named("Employee"))
                .field("staff", TypeExpr::seq(TypeExpr::named("Employee")))
                .field(
                    "offices",
                    TypeExpr::map(ScalarKind::String.into(), TypeExpr::named("Address")),
                )
                .field("vehicle", TypeExpr::named("Vehicle")),
        )
        .with(
            StructDef::new("Employee")
                .field("name", ScalarKind::String)
                .field("role", TypeExpr::named("Role"))
                .field("home", TypeExpr::named("Address"))
                .field("manager", TypeExpr::optional(TypeExpr::named("Employee"))),
        )
        .with(
            StructDef::new("Address")
                .field("street", ScalarKind::String)
                .field("city", ScalarKind::String),
        )
        .with(EnumDef::new("Role", ["Engineer", "Manager", "Director"]))
        .with(InterfaceDef::new(
            "Vehicle",
            [TypeExpr::named("Car"), TypeExpr::named("Bike")],
        ))
        .with(StructDef::new("Car").field("doors", ScalarKind::U8))
        .with(StructDef::new("Bike").field("gears", ScalarKind::U8))
}

/// Member `path` of `value`, following `.`-separated struct members.
#[must_use]
pub fn at<'v>(value: &'v Value, path: &str) -> &'v Value {
    value
        .pointer(path)
        .unwrap_or_else(|| panic!("`{path}` is not present in {value}"))
}

#[derive(Clone, Debug, PartialEq)]
pub enum Colour {
    Red,
    Green,
    Blue,
}

impl Describe for Colour {
    fn describe(schema: &mut Schema) -> TypeExpr {
        schema.describe_enum("Colour", ["Red", "Green", "Blue"])
    }
}

impl FromValue for Colour {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value.as_variant() {
            Some("Red") | None => Ok(Self::Red),
            Some("Green") => Ok(Self::Green),
            Some("Blue") => Ok(Self::Blue),
            Some(other) => Err(ValueError::UnknownVariant {
                enum_name: "Colour",
                variant: other.into(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl Describe for Address {
    fn describe(schema: &mut Schema) -> TypeExpr {
        schema.describe_struct("Address", |s| {
            s.field::<String>("street").field::<String>("city")
        })
    }
}

impl FromValue for Address {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let mut record = value.into_record()?;
        Ok(Self {
            street: record.extract("street")?,
            city: record.extract("city")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: u8,
    pub favourite: Colour,
    pub address: Address,
    pub nicknames: Vec<String>,
    pub partner: Option<Box<Person>>,
}

impl Describe for Person {
    fn describe(schema: &mut Schema) -> TypeExpr {
        schema.describe_struct("Person", |s| {
            s.field::<String>("name")
                .field::<u8>("age")
                .field::<Colour>("favourite")
                .field::<Address>("address")
                .field::<Vec<String>>("nicknames")
                .field::<Option<Box<Person>>>("partner")
        })
    }
}

impl FromValue for Person {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let mut record = value.into_record()?;
        Ok(Self {
            name: record.extract("name")?,
            age: record.extract("age")?,
            favourite: record.extract("favourite")?,
            address: record.extract("address")?,
            nicknames: record.extract("nicknames")?,
            partner: record.extract("partner")?,
        })
    }
}
