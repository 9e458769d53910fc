//! JSON schema file format.
//!
//! ```json
//! {
//!   "types": {
//!     "Person": { "kind": "struct", "fields": [{ "name": "name", "type": "String" }] },
//!     "Role": { "kind": "enum", "variants": ["Admin", "User"] },
//!     "Vehicle": { "kind": "interface", "implementations": ["Car"] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use fixtura_core::{EnumDef, InterfaceDef, Schema, StructDef, TypeExpr, TypeParseError};
use serde::Deserialize;

/// Top-level document.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    /// Definitions keyed by type name.
    pub types: BTreeMap<String, TypeFile>,
}

/// One type definition.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum TypeFile {
    /// A struct with ordered members.
    Struct {
        /// Generic parameter names.
        #[serde(default)]
        params: Vec<String>,
        /// Members in declaration order.
        fields: Vec<FieldFile>,
    },
    /// A fieldless enum.
    Enum {
        /// Variant names.
        variants: Vec<String>,
    },
    /// An abstract type with known implementations.
    Interface {
        /// Implementation type expressions.
        #[serde(default)]
        implementations: Vec<String>,
    },
}

/// A struct member.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldFile {
    /// Member name.
    pub name: String,
    /// Member type expression, e.g. `Vec<Address>`.
    #[serde(rename = "type")]
    pub ty: String,
}

impl SchemaFile {
    /// Builds the engine schema, parsing every type expression.
    ///
    /// # Errors
    /// Returns the first [`TypeParseError`] encountered.
    pub fn into_schema(self) -> Result<Schema, TypeParseError> {
        let mut schema = Schema::new();
        for (name, def) in self.types {
            match def {
                TypeFile::Struct { params, fields } => {
                    let mut def = params
                        .into_iter()
                        .fold(StructDef::new(name), StructDef::param);
                    for field in fields {
                        let ty: TypeExpr = field.ty.parse()?;
                        def = def.field(field.name, ty);
                    }
                    schema.define(def);
                }
                TypeFile::Enum { variants } => {
                    schema.define(EnumDef::new(name, variants));
                }
                TypeFile::Interface { implementations } => {
                    let implementations = implementations
                        .iter()
                        .map(|raw| raw.parse::<TypeExpr>())
                        .collect::<Result<Vec<_>, _>>()?;
                    schema.define(InterfaceDef::new(name, implementations));
                }
            }
        }
        Ok(schema)
    }
}
