//! Selectors: declarative rules matching nodes of the populated graph.
//!
//! A [`Selector`] matches a node by type, by member, by predicate or as the
//! root, optionally narrowed by a depth predicate and by [`Scope`]s that must
//! match the node's ancestors. Selectors are plain values; malformed input is
//! captured and reported as a usage error when the selector is declared on a
//! fixture builder.
//!
//! # Examples
//! ```
//! use fixtura_core::select::{any_of, field, field_scope, types};
//!
//! let city = field("Address", "city").within([field_scope("Person", "home")]);
//! assert_eq!(city.to_string(), r#"field(Address, "city").within(field_scope(Person, "home"))"#);
//!
//! let group = any_of([types("Address"), types("Person").at_depth(0)]);
//! assert_eq!(group.to_string(), "any_of(types(Address), types(Person).at_depth(0))");
//! ```

pub(crate) mod declaration;
pub(crate) mod matcher;

use std::{fmt, sync::Arc};

use crate::{
    describe::Describe,
    path::AncestorPath,
    schema::{NodeMeta, Schema, Slot, TypeDef, TypeExpr},
};

pub use declaration::ApiCategory;

type TypePredicate = Arc<dyn Fn(&TypeExpr) -> bool + Send + Sync>;
type FieldPredicate = Arc<dyn Fn(&FieldInfo<'_>) -> bool + Send + Sync>;
type DepthFn = Arc<dyn Fn(usize) -> bool + Send + Sync>;

/// Metadata of a struct member handed to [`fields_matching`] predicates.
#[derive(Clone, Copy, Debug)]
pub struct FieldInfo<'a> {
    name: &'a str,
    declaring_type: &'a str,
    ty: &'a TypeExpr,
    depth: usize,
}

impl<'a> FieldInfo<'a> {
    /// Member name.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// Name of the struct declaring the member.
    #[must_use]
    pub const fn declaring_type(&self) -> &'a str {
        self.declaring_type
    }

    /// Resolved member type.
    #[must_use]
    pub const fn ty(&self) -> &'a TypeExpr {
        self.ty
    }

    /// Depth of the member's node.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    fn of(meta: &'a NodeMeta) -> Option<Self> {
        match meta.slot() {
            Slot::Field(name) => Some(Self {
                name: &**name,
                declaring_type: meta.declaring_type()?,
                ty: meta.ty(),
                depth: meta.depth(),
            }),
            Slot::Root | Slot::Element | Slot::Key | Slot::Value => None,
        }
    }
}

/// How a selector compares node types.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeMatcher {
    /// Any instantiation of the named type (`Pair` matches `Pair<String, i32>`).
    Head(Arc<str>),
    /// Exactly this resolved type.
    Exact(TypeExpr),
}

impl TypeMatcher {
    fn parse(raw: &str) -> Result<Self, Arc<str>> {
        if raw.trim().is_empty() {
            return Err(Arc::from("type name is empty"));
        }
        match raw.parse::<TypeExpr>() {
            Ok(TypeExpr::Named { name, args }) if args.is_empty() => Ok(Self::Head(name)),
            Ok(expr) => Ok(Self::Exact(expr.strip_optional().clone())),
            Err(err) => Err(Arc::from(err.to_string())),
        }
    }

    /// Returns `true` when `ty` satisfies the matcher.
    #[must_use]
    pub fn matches(&self, ty: &TypeExpr) -> bool {
        match self {
            Self::Head(head) => matches!(ty, TypeExpr::Named { name, .. } if name == head),
            Self::Exact(expected) => expected == ty,
        }
    }

    fn struct_name(&self) -> Option<&Arc<str>> {
        match self {
            Self::Head(name) | Self::Exact(TypeExpr::Named { name, .. }) => Some(name),
            Self::Exact(_) => None,
        }
    }
}

impl fmt::Display for TypeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head(name) => f.write_str(name),
            Self::Exact(expr) => write!(f, "{expr}"),
        }
    }
}

#[derive(Clone)]
enum Target {
    Root,
    Type(TypeMatcher),
    Field {
        owner: Option<Arc<str>>,
        member: Arc<str>,
    },
    TypeWhere {
        description: Arc<str>,
        predicate: TypePredicate,
    },
    FieldWhere {
        description: Arc<str>,
        predicate: FieldPredicate,
    },
}

impl Target {
    fn matches(&self, meta: &NodeMeta) -> bool {
        match self {
            Self::Root => matches!(meta.slot(), Slot::Root),
            Self::Type(matcher) => matcher.matches(meta.ty()),
            Self::Field { owner, member } => {
                meta.member() == Some(&**member)
                    && owner
                        .as_deref()
                        .is_none_or(|owner| meta.declaring_type() == Some(owner))
            }
            Self::TypeWhere { predicate, .. } => predicate(meta.ty()),
            Self::FieldWhere { predicate, .. } => {
                FieldInfo::of(meta).is_some_and(|info| predicate(&info))
            }
        }
    }

    fn check(&self, schema: &Schema) -> Result<(), Arc<str>> {
        match self {
            Self::Type(TypeMatcher::Head(name)) if !schema.contains(name) => {
                Err(Arc::from(format!("type `{name}` is not registered")))
            }
            Self::Field {
                owner: Some(owner),
                member,
            } => match schema.get(owner) {
                None => Err(Arc::from(format!("type `{owner}` is not registered"))),
                Some(TypeDef::Struct(def)) => {
                    if def.fields().iter().any(|field| field.name() == &**member) {
                        Ok(())
                    } else {
                        Err(Arc::from(format!("struct `{owner}` has no member `{member}`")))
                    }
                }
                Some(_) => Err(Arc::from(format!("type `{owner}` is not a struct"))),
            },
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("root()"),
            Self::Type(matcher) => write!(f, "types({matcher})"),
            Self::Field {
                owner: Some(owner),
                member,
            } => write!(f, "field({owner}, {member:?})"),
            Self::Field {
                owner: None,
                member,
            } => write!(f, "field_named({member:?})"),
            Self::TypeWhere { description, .. } => write!(f, "types_matching({description})"),
            Self::FieldWhere { description, .. } => write!(f, "fields_matching({description})"),
        }
    }
}

/// Depth constraint attached with [`Selector::at_depth`] or
/// [`Selector::at_depth_matching`].
#[derive(Clone)]
enum DepthPredicate {
    Exactly(usize),
    Matching {
        description: Arc<str>,
        predicate: DepthFn,
    },
}

impl DepthPredicate {
    fn matches(&self, depth: usize) -> bool {
        match self {
            Self::Exactly(expected) => depth == *expected,
            Self::Matching { predicate, .. } => predicate(depth),
        }
    }

    /// Scopes read `at_depth(n)` as a lower bound: the ancestor may sit at
    /// `n` or anywhere below it.
    fn admits_ancestor(&self, depth: usize) -> bool {
        match self {
            Self::Exactly(minimum) => depth >= *minimum,
            Self::Matching { predicate, .. } => predicate(depth),
        }
    }
}

impl fmt::Display for DepthPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(depth) => write!(f, ".at_depth({depth})"),
            Self::Matching { description, .. } => write!(f, ".at_depth_matching({description})"),
        }
    }
}

/// A declarative rule matching nodes.
#[derive(Clone)]
pub struct Selector {
    target: Target,
    depth: Option<DepthPredicate>,
    scopes: Vec<Scope>,
    invalid: Option<Arc<str>>,
}

impl Selector {
    fn new(target: Target) -> Self {
        Self {
            target,
            depth: None,
            scopes: Vec::new(),
            invalid: None,
        }
    }

    fn invalid(target: Target, reason: Arc<str>) -> Self {
        Self {
            invalid: Some(reason),
            ..Self::new(target)
        }
    }

    /// Restricts the selector to nodes whose ancestors match `scopes`.
    ///
    /// Scopes are listed from the outermost inwards, the way the path reads:
    /// `within([scope("Person"), scope("Address")])` matches nodes below an
    /// `Address` that is itself below a `Person`. Walking from the node
    /// towards the root, the last scope must match first and each earlier
    /// scope must match an ancestor strictly above it. Gaps are allowed.
    #[must_use]
    pub fn within(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        for scope in scopes {
            if self.invalid.is_none() {
                self.invalid.clone_from(&scope.invalid);
            }
            self.scopes.push(scope);
        }
        self
    }

    /// Restricts the selector to nodes at exactly `depth`.
    #[must_use]
    pub fn at_depth(mut self, depth: usize) -> Self {
        self.depth = Some(DepthPredicate::Exactly(depth));
        self
    }

    /// Restricts the selector to nodes whose depth satisfies `predicate`.
    #[must_use]
    pub fn at_depth_matching<F>(mut self, description: &str, predicate: F) -> Self
    where
        F: Fn(usize) -> bool + Send + Sync + 'static,
    {
        self.depth = Some(DepthPredicate::Matching {
            description: Arc::from(description),
            predicate: Arc::new(predicate),
        });
        self
    }

    /// Converts the selector into a scope for use with [`Selector::within`].
    ///
    /// A depth set with [`Selector::at_depth`] becomes a lower bound, so the
    /// scope matches ancestors at that depth or deeper. Predicates from
    /// [`Selector::at_depth_matching`] apply unchanged.
    #[must_use]
    pub fn to_scope(self) -> Scope {
        let invalid = if self.scopes.is_empty() {
            self.invalid
        } else {
            Some(Arc::from("a scoped selector cannot be used as a scope"))
        };
        Scope {
            target: self.target,
            depth: self.depth,
            invalid,
        }
    }

    /// Returns the reason the selector is malformed, if it is.
    #[must_use]
    pub fn problem(&self) -> Option<&str> {
        self.invalid.as_deref()
    }

    /// Returns `true` when the selector matches `node` reached through `path`.
    #[must_use]
    pub fn matches(&self, node: &NodeMeta, path: &AncestorPath) -> bool {
        self.target.matches(node)
            && self
                .depth
                .as_ref()
                .is_none_or(|depth| depth.matches(node.depth()))
            && self.scopes_match(path)
    }

    fn scopes_match(&self, path: &AncestorPath) -> bool {
        let mut pending = self.scopes.iter().rev().peekable();
        for ancestor in path.outward() {
            match pending.peek() {
                None => break,
                Some(scope) if scope.matches(ancestor) => {
                    pending.next();
                }
                Some(_) => {}
            }
        }
        pending.peek().is_none()
    }

    pub(crate) fn check(&self, schema: &Schema) -> Result<(), Arc<str>> {
        self.target.check(schema)?;
        self.scopes
            .iter()
            .try_for_each(|scope| scope.target.check(schema))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        if let Some(depth) = &self.depth {
            write!(f, "{depth}")?;
        }
        if !self.scopes.is_empty() {
            f.write_str(".within(")?;
            for (index, scope) in self.scopes.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{scope}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&format_args!("{self}")).finish()
    }
}

/// A selector restricted to matching ancestors.
#[derive(Clone)]
pub struct Scope {
    target: Target,
    depth: Option<DepthPredicate>,
    invalid: Option<Arc<str>>,
}

impl Scope {
    fn matches(&self, ancestor: &NodeMeta) -> bool {
        self.target.matches(ancestor)
            && self
                .depth
                .as_ref()
                .is_none_or(|depth| depth.admits_ancestor(ancestor.depth()))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Type(matcher) => write!(f, "scope({matcher})"),
            Target::Field {
                owner: Some(owner),
                member,
            } => write!(f, "field_scope({owner}, {member:?})"),
            other => write!(f, "scope({other})"),
        }?;
        if let Some(depth) = &self.depth {
            write!(f, "{depth}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Scope").field(&format_args!("{self}")).finish()
    }
}

/// One or more selectors declared together; the group matches when any
/// member matches.
#[derive(Clone, Debug)]
pub struct Selection {
    selectors: Vec<Selector>,
}

impl Selection {
    /// Returns the members of the group.
    #[must_use]
    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub(crate) fn problem(&self) -> Option<&str> {
        if self.selectors.is_empty() {
            return Some("any_of needs at least one selector");
        }
        self.selectors.iter().find_map(Selector::problem)
    }
}

impl From<Selector> for Selection {
    fn from(selector: Selector) -> Self {
        Self {
            selectors: vec![selector],
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [single] = self.selectors.as_slice() {
            return write!(f, "{single}");
        }
        f.write_str("any_of(")?;
        for (index, selector) in self.selectors.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{selector}")?;
        }
        f.write_str(")")
    }
}

/// Selects the root node.
#[must_use]
pub fn root() -> Selector {
    Selector::new(Target::Root)
}

/// Selects nodes of the named type.
///
/// A bare name (`"Pair"`) matches every instantiation of a generic type; a
/// name with arguments (`"Pair<String, i32>"`) and scalar or container
/// expressions (`"Vec<String>"`) match the exact resolved type.
#[must_use]
pub fn types(name: &str) -> Selector {
    match TypeMatcher::parse(name) {
        Ok(matcher) => Selector::new(Target::Type(matcher)),
        Err(reason) => Selector::invalid(Target::Type(TypeMatcher::Head(Arc::from(name))), reason),
    }
}

/// Selects nodes whose type is exactly `T`'s.
#[must_use]
pub fn all<T: Describe>() -> Selector {
    let expr = T::describe(&mut Schema::new());
    Selector::new(Target::Type(TypeMatcher::Exact(expr.strip_optional().clone())))
}

/// Selects the member `member` declared by struct `owner`.
#[must_use]
pub fn field(owner: &str, member: &str) -> Selector {
    let (target, reason) = field_target(TypeMatcher::parse(owner), owner, member);
    match reason {
        Some(reason) => Selector::invalid(target, reason),
        None => Selector::new(target),
    }
}

/// Selects the member `member` of the struct described by `T`.
#[must_use]
pub fn field_of<T: Describe>(member: &str) -> Selector {
    let expr = T::describe(&mut Schema::new());
    let rendered = expr.to_string();
    let (target, reason) = field_target(Ok(TypeMatcher::Exact(expr)), &rendered, member);
    match reason {
        Some(reason) => Selector::invalid(target, reason),
        None => Selector::new(target),
    }
}

/// Selects every member named `member`, whichever struct declares it.
#[must_use]
pub fn field_named(member: &str) -> Selector {
    let target = Target::Field {
        owner: None,
        member: Arc::from(member),
    };
    if member.is_empty() {
        Selector::invalid(target, Arc::from("member name is empty"))
    } else {
        Selector::new(target)
    }
}

/// Selects nodes whose type satisfies `predicate`.
#[must_use]
pub fn types_matching<F>(description: &str, predicate: F) -> Selector
where
    F: Fn(&TypeExpr) -> bool + Send + Sync + 'static,
{
    Selector::new(Target::TypeWhere {
        description: Arc::from(description),
        predicate: Arc::new(predicate),
    })
}

/// Selects struct members satisfying `predicate`.
#[must_use]
pub fn fields_matching<F>(description: &str, predicate: F) -> Selector
where
    F: Fn(&FieldInfo<'_>) -> bool + Send + Sync + 'static,
{
    Selector::new(Target::FieldWhere {
        description: Arc::from(description),
        predicate: Arc::new(predicate),
    })
}

/// Groups selectors; the group matches a node when any member does.
#[must_use]
pub fn any_of<I, S>(selections: I) -> Selection
where
    I: IntoIterator<Item = S>,
    S: Into<Selection>,
{
    Selection {
        selectors: selections
            .into_iter()
            .flat_map(|selection| selection.into().selectors)
            .collect(),
    }
}

/// Scope matching ancestors of the named type.
#[must_use]
pub fn scope(name: &str) -> Scope {
    types(name).to_scope()
}

/// Scope matching ancestors reached through `owner.member`.
#[must_use]
pub fn field_scope(owner: &str, member: &str) -> Scope {
    field(owner, member).to_scope()
}

fn field_target(
    owner: Result<TypeMatcher, Arc<str>>,
    raw_owner: &str,
    member: &str,
) -> (Target, Option<Arc<str>>) {
    let (owner, mut reason) = match owner {
        Ok(matcher) => match matcher.struct_name() {
            Some(name) => (Arc::clone(name), None),
            None => (
                Arc::from(raw_owner),
                Some(Arc::from(format!("`{raw_owner}` cannot declare members"))),
            ),
        },
        Err(reason) => (Arc::from(raw_owner), Some(reason)),
    };
    if member.is_empty() && reason.is_none() {
        reason = Some(Arc::from("member name is empty"));
    }
    let target = Target::Field {
        owner: Some(owner),
        member: Arc::from(member),
    };
    (target, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ScalarKind, StructDef, resolve::TypeGraph};

    use rstest::{fixture, rstest};

    #[fixture]
    fn schema() -> Schema {
        Schema::new()
            .with(
                StructDef::new("Person")
                    .field("name", ScalarKind::String)
                    .field("home", TypeExpr::named("Address"))
                    .field("work", TypeExpr::named("Address")),
            )
            .with(StructDef::new("Address").field("city", ScalarKind::String))
            .with(
                StructDef::new("Pair")
                    .param("L")
                    .field("left", TypeExpr::param("L")),
            )
    }

    /// Returns the `city` node reached through `Person.<via>` with its path.
    fn city(schema: &Schema, via: usize) -> (NodeMeta, AncestorPath) {
        let graph = TypeGraph::new(schema);
        let root = graph.root(&TypeExpr::named("Person"));
        let address = graph.children_of(&root).remove(via);
        let city = graph.children_of(&address).remove(0);
        let mut path = AncestorPath::new();
        path.push(&root);
        path.push(&address);
        (city.meta().clone(), path)
    }

    #[rstest]
    fn field_scope_distinguishes_members_of_the_same_type(schema: Schema) {
        let selector = field("Address", "city").within([field_scope("Person", "home")]);
        let (home_city, home_path) = city(&schema, 1);
        let (work_city, work_path) = city(&schema, 2);
        assert!(selector.matches(&home_city, &home_path));
        assert!(!selector.matches(&work_city, &work_path));
    }

    #[rstest]
    fn scopes_are_listed_outermost_first(schema: Schema) {
        let (node, path) = city(&schema, 1);
        let ordered = field_named("city").within([scope("Person"), scope("Address")]);
        let reversed = field_named("city").within([scope("Address"), scope("Person")]);
        assert!(ordered.matches(&node, &path));
        assert!(!reversed.matches(&node, &path));
    }

    #[rstest]
    fn scopes_consume_distinct_ancestors(schema: Schema) {
        let (node, path) = city(&schema, 1);
        let twice = field_named("city").within([scope("Person"), scope("Person")]);
        assert!(!twice.matches(&node, &path));
    }

    #[rstest]
    fn scope_depths_are_lower_bounds(schema: Schema) {
        let (node, path) = city(&schema, 1);
        let at_or_below = |depth| {
            field_named("city").within([types("Address").at_depth(depth).to_scope()])
        };
        assert!(at_or_below(0).matches(&node, &path));
        assert!(at_or_below(1).matches(&node, &path));
        assert!(!at_or_below(2).matches(&node, &path));
        let exact = field_named("city")
            .within([types("Address").at_depth_matching("root only", |depth| depth == 0).to_scope()]);
        assert!(!exact.matches(&node, &path));
    }

    #[rstest]
    fn head_matching_ignores_generic_arguments(schema: Schema) {
        let graph = TypeGraph::new(&schema);
        let pair = graph.root(&TypeExpr::generic("Pair", [TypeExpr::scalar(ScalarKind::I32)]));
        let path = AncestorPath::new();
        assert!(types("Pair").matches(pair.meta(), &path));
        assert!(types("Pair<i32>").matches(pair.meta(), &path));
        assert!(!types("Pair<String>").matches(pair.meta(), &path));
        assert!(root().matches(pair.meta(), &path));
    }

    #[rstest]
    fn depth_predicates_narrow_matches(schema: Schema) {
        let (node, path) = city(&schema, 1);
        assert!(field_named("city").at_depth(2).matches(&node, &path));
        assert!(!field_named("city").at_depth(1).matches(&node, &path));
        let deep = field_named("city").at_depth_matching("deeper than 1", |depth| depth > 1);
        assert!(deep.matches(&node, &path));
    }

    #[rstest]
    fn predicates_see_member_metadata(schema: Schema) {
        let (node, path) = city(&schema, 1);
        let selector = fields_matching("string members of Address", |info| {
            info.declaring_type() == "Address" && info.ty() == &TypeExpr::scalar(ScalarKind::String)
        });
        assert!(selector.matches(&node, &path));
        let by_type = types_matching("strings", |ty| ty.head() == "String");
        assert!(by_type.matches(&node, &path));
    }

    #[rstest]
    #[case(types(""), "type name is empty")]
    #[case(field("Person", ""), "member name is empty")]
    #[case(field("Vec<u8>", "len"), "`Vec<u8>` cannot declare members")]
    #[case(types("Vec<").within([scope("Person")]), "invalid type expression `Vec<` at offset 4: expected a type name")]
    #[case(field_named("x").within([field_named("y").within([scope("A")]).to_scope()]), "a scoped selector cannot be used as a scope")]
    fn malformed_selectors_are_captured(#[case] selector: Selector, #[case] reason: &str) {
        assert_eq!(selector.problem(), Some(reason));
    }

    #[rstest]
    fn schema_checks_reject_unknown_members(schema: Schema) {
        assert!(field("Person", "name").check(&schema).is_ok());
        let err = field("Person", "nmae").check(&schema).expect_err("typo");
        assert_eq!(&*err, "struct `Person` has no member `nmae`");
        let err = types("Robot").check(&schema).expect_err("unknown type");
        assert_eq!(&*err, "type `Robot` is not registered");
        let err = field_named("x")
            .within([field_scope("Ghost", "y")])
            .check(&schema)
            .expect_err("unknown scope owner");
        assert_eq!(&*err, "type `Ghost` is not registered");
    }

    #[test]
    fn any_of_flattens_nested_groups() {
        let group = any_of([any_of([types("A"), types("B")]), Selection::from(root())]);
        assert_eq!(group.selectors().len(), 3);
        assert_eq!(group.to_string(), "any_of(types(A), types(B), root())");
        assert_eq!(any_of(Vec::<Selector>::new()).problem(), Some("any_of needs at least one selector"));
    }

    #[test]
    fn all_uses_exact_resolved_types() {
        assert_eq!(all::<Vec<String>>().to_string(), "types(Vec<String>)");
        assert_eq!(field_of::<u8>("x").problem(), Some("`u8` cannot declare members"));
    }
}
