//! Structural description of the types the engine populates.
//!
//! Rust offers no runtime reflection, so every target type is described up
//! front: a [`TypeExpr`] names a (possibly generic) type and a [`Schema`] maps
//! type names to their [`TypeDef`]. The resolver in [`resolve`] walks these
//! descriptions lazily during population.

mod parse;
pub(crate) mod resolve;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use crate::{error::FixturaError, value::Value};

pub use parse::TypeParseError;
pub use resolve::{Node, NodeKind, NodeMeta, ScalarShape, Slot};

/// Primitive leaf types with built-in default generation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `char`
    Char,
    /// `String`
    String,
}

impl ScalarKind {
    const ALL: [Self; 13] = [
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::Char,
        Self::String,
    ];

    /// Returns the canonical spelling used in type expressions.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::String => "String",
        }
    }

    /// Looks up a scalar by its canonical spelling.
    ///
    /// # Examples
    /// ```
    /// use fixtura_core::ScalarKind;
    ///
    /// assert_eq!(ScalarKind::from_name("u16"), Some(ScalarKind::U16));
    /// assert_eq!(ScalarKind::from_name("Person"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Inclusive integer bounds for integral kinds.
    pub(crate) const fn integer_bounds(self) -> Option<(i128, i128)> {
        match self {
            Self::I8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Self::I16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Self::I32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Self::I64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Self::U8 => Some((0, u8::MAX as i128)),
            Self::U16 => Some((0, u16::MAX as i128)),
            Self::U32 => Some((0, u32::MAX as i128)),
            Self::U64 => Some((0, u64::MAX as i128)),
            Self::Bool | Self::F32 | Self::F64 | Self::Char | Self::String => None,
        }
    }

    pub(crate) const fn is_unsigned(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }
}

/// A type expression: a scalar, a named (possibly generic) type, a type
/// parameter, or one of the built-in containers.
///
/// Expressions render canonically through [`fmt::Display`] and parse back
/// through [`std::str::FromStr`].
///
/// # Examples
/// ```
/// use fixtura_core::{ScalarKind, TypeExpr};
///
/// let pair = TypeExpr::generic(
///     "Pair",
///     [TypeExpr::scalar(ScalarKind::String), TypeExpr::seq(TypeExpr::named("Item"))],
/// );
/// assert_eq!(pair.to_string(), "Pair<String, Vec<Item>>");
/// assert_eq!(pair.head(), "Pair");
/// let parsed: TypeExpr = "Pair<String, Vec<Item>>".parse().expect("valid expression");
/// assert_eq!(parsed, pair);
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TypeExpr {
    /// A primitive leaf type.
    Scalar(ScalarKind),
    /// A type registered in the [`Schema`], with its generic arguments.
    Named {
        /// Registered type name.
        name: Arc<str>,
        /// Generic arguments in declaration order.
        args: Vec<TypeExpr>,
    },
    /// A generic type parameter awaiting substitution.
    Param(Arc<str>),
    /// An ordered, homogeneous sequence.
    Seq(Box<TypeExpr>),
    /// A homogeneous set with unique elements.
    Set(Box<TypeExpr>),
    /// A keyed container.
    Map(Box<TypeExpr>, Box<TypeExpr>),
    /// A value that may be absent.
    Optional(Box<TypeExpr>),
}

impl TypeExpr {
    /// A scalar leaf.
    #[must_use]
    pub const fn scalar(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }

    /// A non-generic named type.
    #[must_use]
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// A named type applied to generic arguments.
    #[must_use]
    pub fn generic(name: impl Into<Arc<str>>, args: impl IntoIterator<Item = Self>) -> Self {
        Self::Named {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// A generic type parameter.
    #[must_use]
    pub fn param(name: impl Into<Arc<str>>) -> Self {
        Self::Param(name.into())
    }

    /// A sequence of `element`.
    #[must_use]
    pub fn seq(element: Self) -> Self {
        Self::Seq(Box::new(element))
    }

    /// A set of `element`.
    #[must_use]
    pub fn set(element: Self) -> Self {
        Self::Set(Box::new(element))
    }

    /// A map from `key` to `value`.
    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// An optional `inner`.
    #[must_use]
    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Returns the head of the expression: the scalar, type, parameter or
    /// container name without generic arguments.
    #[must_use]
    pub fn head(&self) -> &str {
        match self {
            Self::Scalar(kind) => kind.name(),
            Self::Named { name, .. } | Self::Param(name) => &**name,
            Self::Seq(_) => "Vec",
            Self::Set(_) => "Set",
            Self::Map(..) => "Map",
            Self::Optional(_) => "Option",
        }
    }

    /// Strips any number of [`TypeExpr::Optional`] wrappers.
    #[must_use]
    pub fn strip_optional(&self) -> &Self {
        let mut current = self;
        while let Self::Optional(inner) = current {
            current = inner;
        }
        current
    }

    /// Returns `true` when the expression mentions no type parameters.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        match self {
            Self::Scalar(_) => true,
            Self::Param(_) => false,
            Self::Named { args, .. } => args.iter().all(Self::is_concrete),
            Self::Seq(inner) | Self::Set(inner) | Self::Optional(inner) => inner.is_concrete(),
            Self::Map(key, value) => key.is_concrete() && value.is_concrete(),
        }
    }

    /// Replaces bound parameters with their bindings, leaving unbound ones in
    /// place.
    pub(crate) fn substitute(&self, bindings: &BTreeMap<Arc<str>, Self>) -> Self {
        match self {
            Self::Scalar(_) => self.clone(),
            Self::Param(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Named { name, args } => Self::Named {
                name: Arc::clone(name),
                args: args.iter().map(|arg| arg.substitute(bindings)).collect(),
            },
            Self::Seq(inner) => Self::seq(inner.substitute(bindings)),
            Self::Set(inner) => Self::set(inner.substitute(bindings)),
            Self::Optional(inner) => Self::optional(inner.substitute(bindings)),
            Self::Map(key, value) => Self::map(key.substitute(bindings), value.substitute(bindings)),
        }
    }

    fn named_references<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Scalar(_) | Self::Param(_) => {}
            Self::Named { name, args } => {
                out.insert(&**name);
                for arg in args {
                    arg.named_references(out);
                }
            }
            Self::Seq(inner) | Self::Set(inner) | Self::Optional(inner) => {
                inner.named_references(out);
            }
            Self::Map(key, value) => {
                key.named_references(out);
                value.named_references(out);
            }
        }
    }
}

impl From<ScalarKind> for TypeExpr {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => f.write_str(kind.name()),
            Self::Param(name) => f.write_str(name),
            Self::Named { name, args } => {
                f.write_str(name)?;
                if args.is_empty() {
                    return Ok(());
                }
                f.write_str("<")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            Self::Seq(inner) => write!(f, "Vec<{inner}>"),
            Self::Set(inner) => write!(f, "Set<{inner}>"),
            Self::Optional(inner) => write!(f, "Option<{inner}>"),
            Self::Map(key, value) => write!(f, "Map<{key}, {value}>"),
        }
    }
}

/// A named member of a struct.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    name: Arc<str>,
    ty: TypeExpr,
}

impl FieldDef {
    /// Returns the member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared (unsubstituted) member type.
    #[must_use]
    pub const fn ty(&self) -> &TypeExpr {
        &self.ty
    }

    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.name
    }
}

/// A struct with ordered members and optional generic parameters.
///
/// # Examples
/// ```
/// use fixtura_core::{ScalarKind, StructDef, TypeExpr};
///
/// let pair = StructDef::new("Pair")
///     .param("L")
///     .param("R")
///     .field("left", TypeExpr::param("L"))
///     .field("right", TypeExpr::param("R"))
///     .field("label", ScalarKind::String);
/// assert_eq!(pair.params().len(), 2);
/// assert_eq!(pair.fields()[2].name(), "label");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct StructDef {
    name: Arc<str>,
    params: Vec<Arc<str>>,
    fields: Vec<FieldDef>,
    template: Option<Value>,
}

impl StructDef {
    /// Starts a struct definition with no members.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            fields: Vec::new(),
            template: None,
        }
    }

    /// Appends a generic parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<Arc<str>>) -> Self {
        self.params.push(name.into());
        self
    }

    /// Appends a member. Members are visited in the order they are added.
    #[must_use]
    pub fn field(mut self, name: impl Into<Arc<str>>, ty: impl Into<TypeExpr>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }

    /// Registers a pre-initialised record used by the template
    /// instantiation strategy in place of an all-`Null` shell.
    #[must_use]
    pub fn with_template(mut self, template: Value) -> Self {
        self.template = Some(template);
        self
    }

    /// Returns the struct name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the generic parameters.
    #[must_use]
    pub fn params(&self) -> &[Arc<str>] {
        &self.params
    }

    /// Returns the members in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Returns the template record, if one was registered.
    #[must_use]
    pub const fn template(&self) -> Option<&Value> {
        self.template.as_ref()
    }
}

/// A fieldless enumeration; populated with one of its variant names.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumDef {
    name: Arc<str>,
    variants: Vec<Arc<str>>,
}

impl EnumDef {
    /// Creates an enum definition.
    #[must_use]
    pub fn new<I, S>(name: impl Into<Arc<str>>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the enum name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the variant names in declaration order.
    #[must_use]
    pub fn variants(&self) -> &[Arc<str>] {
        &self.variants
    }
}

/// An abstract type. Nodes of an interface type stay unresolved unless a
/// `subtype` customisation picks a concrete implementation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterfaceDef {
    name: Arc<str>,
    implementations: Vec<TypeExpr>,
}

impl InterfaceDef {
    /// Creates an interface definition listing its known implementations.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, implementations: impl IntoIterator<Item = TypeExpr>) -> Self {
        Self {
            name: name.into(),
            implementations: implementations.into_iter().collect(),
        }
    }

    /// Returns the interface name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the registered implementations.
    #[must_use]
    pub fn implementations(&self) -> &[TypeExpr] {
        &self.implementations
    }
}

/// Definition of a named type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDef {
    /// A struct with members.
    Struct(StructDef),
    /// A fieldless enum.
    Enum(EnumDef),
    /// An abstract type with implementations.
    Interface(InterfaceDef),
}

impl TypeDef {
    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Struct(def) => def.name(),
            Self::Enum(def) => def.name(),
            Self::Interface(def) => def.name(),
        }
    }
}

impl From<StructDef> for TypeDef {
    fn from(def: StructDef) -> Self {
        Self::Struct(def)
    }
}

impl From<EnumDef> for TypeDef {
    fn from(def: EnumDef) -> Self {
        Self::Enum(def)
    }
}

impl From<InterfaceDef> for TypeDef {
    fn from(def: InterfaceDef) -> Self {
        Self::Interface(def)
    }
}

/// Registry of named type definitions.
///
/// # Examples
/// ```
/// use fixtura_core::{EnumDef, ScalarKind, Schema, StructDef, TypeExpr};
///
/// let schema = Schema::new()
///     .with(EnumDef::new("Colour", ["Red", "Green"]))
///     .with(
///         StructDef::new("Node")
///             .field("colour", TypeExpr::named("Colour"))
///             .field("next", TypeExpr::optional(TypeExpr::named("Node"))),
///     );
/// assert!(schema.contains("Node"));
/// assert!(schema.validate().is_ok());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    types: BTreeMap<Arc<str>, TypeDef>,
    describing: BTreeSet<Arc<str>>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `def`, replacing any previous definition with the same name.
    #[must_use]
    pub fn with(mut self, def: impl Into<TypeDef>) -> Self {
        self.define(def);
        self
    }

    /// Registers `def`, replacing any previous definition with the same name.
    pub fn define(&mut self, def: impl Into<TypeDef>) -> &mut Self {
        let def = def.into();
        self.types.insert(Arc::from(def.name()), def);
        self
    }

    /// Looks up a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Returns `true` if `name` is registered or currently being described.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name) || self.describing.contains(name)
    }

    /// Iterates over the registered definitions in name order.
    pub fn definitions(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    /// Registers a struct through a builder closure, guarding against
    /// re-entrant description of self-referential types.
    ///
    /// The closure runs only the first time `name` is described; nested calls
    /// for the same name (as happens for `Node { next: Option<Node> }`) return
    /// the named expression immediately.
    pub fn describe_struct<F>(&mut self, name: &str, build: F) -> TypeExpr
    where
        F: FnOnce(StructBuilder<'_>) -> StructBuilder<'_>,
    {
        if self.contains(name) {
            return TypeExpr::named(name);
        }
        let key: Arc<str> = Arc::from(name);
        self.describing.insert(Arc::clone(&key));
        let builder = build(StructBuilder {
            schema: self,
            def: StructDef::new(Arc::clone(&key)),
        });
        let def = builder.def;
        self.describing.remove(&key);
        self.define(def);
        TypeExpr::named(key)
    }

    /// Registers an enum unless one with the same name already exists.
    pub fn describe_enum<I, S>(&mut self, name: &str, variants: I) -> TypeExpr
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        if !self.contains(name) {
            self.define(EnumDef::new(name, variants));
        }
        TypeExpr::named(name)
    }

    /// Checks internal consistency: duplicate members or variants, empty
    /// enums, and references to unknown names.
    ///
    /// # Errors
    /// Returns [`FixturaError::InvalidSchema`] describing the first problem.
    pub fn validate(&self) -> Result<(), FixturaError> {
        for def in self.types.values() {
            match def {
                TypeDef::Struct(def) => self.validate_struct(def)?,
                TypeDef::Enum(def) => {
                    if def.variants.is_empty() {
                        return Err(FixturaError::invalid_schema(format!(
                            "enum `{}` has no variants",
                            def.name
                        )));
                    }
                    let unique: BTreeSet<&str> =
                        def.variants.iter().map(|variant| &**variant).collect();
                    if unique.len() != def.variants.len() {
                        return Err(FixturaError::invalid_schema(format!(
                            "enum `{}` declares a variant twice",
                            def.name
                        )));
                    }
                }
                TypeDef::Interface(def) => {
                    for implementation in &def.implementations {
                        self.check_references(&def.name, implementation)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_struct(&self, def: &StructDef) -> Result<(), FixturaError> {
        let mut seen = BTreeSet::new();
        for field in &def.fields {
            if field.name.is_empty() {
                return Err(FixturaError::invalid_schema(format!(
                    "struct `{}` has a member with an empty name",
                    def.name
                )));
            }
            if !seen.insert(&*field.name) {
                return Err(FixturaError::invalid_schema(format!(
                    "struct `{}` declares member `{}` twice",
                    def.name, field.name
                )));
            }
            self.check_references(&def.name, &field.ty)?;
        }
        Ok(())
    }

    fn check_references(&self, owner: &str, ty: &TypeExpr) -> Result<(), FixturaError> {
        let mut names = BTreeSet::new();
        ty.named_references(&mut names);
        match names.into_iter().find(|name| !self.contains(name)) {
            Some(missing) => Err(FixturaError::invalid_schema(format!(
                "`{owner}` refers to unregistered type `{missing}`"
            ))),
            None => Ok(()),
        }
    }
}

/// Builder handed to [`Schema::describe_struct`] closures.
pub struct StructBuilder<'s> {
    schema: &'s mut Schema,
    def: StructDef,
}

impl StructBuilder<'_> {
    /// Appends a member whose type is described by `F`.
    #[must_use]
    pub fn field<F: crate::Describe>(mut self, name: &str) -> Self {
        let ty = F::describe(self.schema);
        self.def = self.def.field(name, ty);
        self
    }

    /// Appends a member with an explicit type expression.
    #[must_use]
    pub fn field_expr(mut self, name: &str, ty: impl Into<TypeExpr>) -> Self {
        self.def = self.def.field(name, ty);
        self
    }

    /// Registers a template record for the struct.
    #[must_use]
    pub fn template(mut self, template: Value) -> Self {
        self.def = self.def.with_template(template);
        self
    }
}
