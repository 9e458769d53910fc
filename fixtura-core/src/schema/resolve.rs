//! Lazy resolution of a type's structural graph into traversal nodes.
//!
//! [`TypeGraph`] turns a concrete [`TypeExpr`] into a [`Node`] and produces the
//! node's children on demand. Generic parameters are bound where a
//! parameterised type is introduced and substituted into its members, so
//! descendants always see fully resolved expressions. Nodes are created fresh
//! for every traversal and never cached.

use std::{collections::BTreeMap, fmt, sync::Arc};

use tracing::debug;

use super::{ScalarKind, Schema, TypeDef, TypeExpr};

/// Position a node occupies relative to its parent.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Slot {
    /// The root of the traversal.
    Root,
    /// A named struct member.
    Field(Arc<str>),
    /// The representative element of a sequence or set.
    Element,
    /// The representative key of a map.
    Key,
    /// The representative value of a map.
    Value,
}

impl Slot {
    /// Returns the member name for [`Slot::Field`] nodes.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        match self {
            Self::Field(name) => Some(&**name),
            Self::Root | Self::Element | Self::Key | Self::Value => None,
        }
    }
}

/// Identity of a node: its resolved type, position and depth.
///
/// This is what selectors and scopes match against, and what the ancestor
/// path records for every expanded node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeMeta {
    ty: TypeExpr,
    slot: Slot,
    declaring: Option<Arc<str>>,
    depth: usize,
}

impl NodeMeta {
    /// Returns the resolved type of the node.
    #[must_use]
    pub const fn ty(&self) -> &TypeExpr {
        &self.ty
    }

    /// Returns the node's position relative to its parent.
    #[must_use]
    pub const fn slot(&self) -> &Slot {
        &self.slot
    }

    /// Returns the member name, or `None` for the root and container slots.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        self.slot.member()
    }

    /// Returns the head of the struct type that declares this member.
    #[must_use]
    pub fn declaring_type(&self) -> Option<&str> {
        self.declaring.as_deref()
    }

    /// Returns the distance from the root (root = 0).
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }
}

impl fmt::Display for NodeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Slot::Root => write!(f, "{}", self.ty),
            Slot::Field(name) => write!(f, ".{name}"),
            Slot::Element => f.write_str("[]"),
            Slot::Key => f.write_str("{key}"),
            Slot::Value => f.write_str("{value}"),
        }
    }
}

/// Leaf shape of a scalar node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScalarShape {
    /// A primitive.
    Primitive(ScalarKind),
    /// A fieldless enum with its variants.
    Enum(Arc<[Arc<str>]>),
}

/// Structural shape of a node. The set is closed; the orchestrator matches on
/// it exhaustively.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// A struct with resolved member types, in declaration order.
    Struct {
        /// Registered struct name.
        name: Arc<str>,
        /// Members with generic parameters substituted.
        fields: Arc<[(Arc<str>, TypeExpr)]>,
    },
    /// A homogeneous container with one representative element.
    Sequence {
        /// Resolved element type.
        element: TypeExpr,
        /// Whether elements must be distinct.
        unique: bool,
    },
    /// A keyed container with one representative key/value pair.
    Map {
        /// Resolved key type.
        key: TypeExpr,
        /// Resolved value type.
        value: TypeExpr,
    },
    /// A leaf.
    Scalar(ScalarShape),
    /// A type that cannot be expanded: an unbound parameter, an unknown name,
    /// or an interface without a chosen subtype.
    Unresolved {
        /// Why the node could not be resolved.
        reason: Arc<str>,
    },
}

/// One position in the traversal of a target type's structural graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    meta: NodeMeta,
    kind: NodeKind,
    nullable: bool,
}

impl Node {
    /// Returns the node's identity.
    #[must_use]
    pub const fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    /// Returns the node's structural shape.
    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns `true` when the member was declared optional.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns `true` for sequence and map nodes.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence { .. } | NodeKind::Map { .. })
    }
}

/// Resolver over a [`Schema`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct TypeGraph<'s> {
    schema: &'s Schema,
}

impl<'s> TypeGraph<'s> {
    pub(crate) const fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    pub(crate) fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Resolves the root node for `ty`.
    pub(crate) fn root(&self, ty: &TypeExpr) -> Node {
        self.node(ty, Slot::Root, None, 0)
    }

    /// Produces the ordered children of `node`.
    pub(crate) fn children_of(&self, node: &Node) -> Vec<Node> {
        let depth = node.meta.depth + 1;
        match &node.kind {
            NodeKind::Struct { name, fields } => fields
                .iter()
                .map(|(member, ty)| {
                    self.node(ty, Slot::Field(Arc::clone(member)), Some(Arc::clone(name)), depth)
                })
                .collect(),
            NodeKind::Sequence { element, .. } => vec![self.node(element, Slot::Element, None, depth)],
            NodeKind::Map { key, value } => vec![
                self.node(key, Slot::Key, None, depth),
                self.node(value, Slot::Value, None, depth),
            ],
            NodeKind::Scalar(_) | NodeKind::Unresolved { .. } => Vec::new(),
        }
    }

    /// Re-resolves `node` as `ty`, keeping its position and depth.
    pub(crate) fn retarget(&self, node: &Node, ty: &TypeExpr) -> Node {
        let mut retargeted = self.node(
            ty,
            node.meta.slot.clone(),
            node.meta.declaring.clone(),
            node.meta.depth,
        );
        retargeted.nullable |= node.nullable;
        retargeted
    }

    fn node(&self, ty: &TypeExpr, slot: Slot, declaring: Option<Arc<str>>, depth: usize) -> Node {
        let nullable = matches!(ty, TypeExpr::Optional(_));
        let ty = ty.strip_optional().clone();
        let kind = self.kind_of(&ty);
        if let NodeKind::Unresolved { reason } = &kind {
            debug!(ty = %ty, depth, reason = %reason, "unresolved node");
        }
        Node {
            meta: NodeMeta {
                ty,
                slot,
                declaring,
                depth,
            },
            kind,
            nullable,
        }
    }

    fn kind_of(&self, ty: &TypeExpr) -> NodeKind {
        match ty {
            TypeExpr::Scalar(kind) => NodeKind::Scalar(ScalarShape::Primitive(*kind)),
            TypeExpr::Seq(element) => NodeKind::Sequence {
                element: (**element).clone(),
                unique: false,
            },
            TypeExpr::Set(element) => NodeKind::Sequence {
                element: (**element).clone(),
                unique: true,
            },
            TypeExpr::Map(key, value) => NodeKind::Map {
                key: (**key).clone(),
                value: (**value).clone(),
            },
            TypeExpr::Optional(inner) => self.kind_of(inner),
            TypeExpr::Param(name) => unresolved(format!("type parameter `{name}` is unbound")),
            TypeExpr::Named { name, args } => self.kind_of_named(name, args),
        }
    }

    fn kind_of_named(&self, name: &Arc<str>, args: &[TypeExpr]) -> NodeKind {
        match self.schema.get(name) {
            None => unresolved(format!("type `{name}` is not registered")),
            Some(TypeDef::Enum(def)) => NodeKind::Scalar(ScalarShape::Enum(def.variants().into())),
            Some(TypeDef::Interface(def)) => {
                unresolved(format!("interface `{}` has no subtype selected", def.name()))
            }
            Some(TypeDef::Struct(def)) => {
                // Parameters without a matching argument stay unbound and
                // surface as unresolved members.
                let bindings: BTreeMap<Arc<str>, TypeExpr> = def
                    .params()
                    .iter()
                    .cloned()
                    .zip(args.iter().cloned())
                    .collect();
                let fields = def
                    .fields()
                    .iter()
                    .map(|field| (Arc::clone(field.name_arc()), field.ty().substitute(&bindings)))
                    .collect();
                NodeKind::Struct {
                    name: Arc::clone(name),
                    fields,
                }
            }
        }
    }
}

fn unresolved(reason: String) -> NodeKind {
    NodeKind::Unresolved {
        reason: Arc::from(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDef, InterfaceDef, StructDef};

    fn pair_schema() -> Schema {
        Schema::new()
            .with(
                StructDef::new("Pair")
                    .param("L")
                    .param("R")
                    .field("left", TypeExpr::param("L"))
                    .field("right", TypeExpr::seq(TypeExpr::param("R"))),
            )
            .with(StructDef::new("Item").field("id", ScalarKind::U32))
            .with(EnumDef::new("Colour", ["Red", "Blue"]))
            .with(InterfaceDef::new("Shape", [TypeExpr::named("Item")]))
    }

    #[test]
    fn struct_children_follow_declaration_order_with_bound_generics() {
        let schema = pair_schema();
        let graph = TypeGraph::new(&schema);
        let root = graph.root(&TypeExpr::generic(
            "Pair",
            [TypeExpr::scalar(ScalarKind::String), TypeExpr::named("Item")],
        ));
        let children = graph.children_of(&root);

        let summary: Vec<(Option<&str>, String, usize)> = children
            .iter()
            .map(|child| {
                (
                    child.meta().member(),
                    child.meta().ty().to_string(),
                    child.meta().depth(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some("left"), "String".to_owned(), 1),
                (Some("right"), "Vec<Item>".to_owned(), 1),
            ]
        );
        assert!(children.iter().all(|c| c.meta().declaring_type() == Some("Pair")));
    }

    #[test]
    fn bindings_propagate_to_grandchildren() {
        let schema = pair_schema();
        let graph = TypeGraph::new(&schema);
        let root = graph.root(&TypeExpr::generic(
            "Pair",
            [TypeExpr::scalar(ScalarKind::Bool), TypeExpr::named("Item")],
        ));
        let right = graph.children_of(&root).remove(1);
        let element = graph.children_of(&right).remove(0);
        assert_eq!(element.meta().slot(), &Slot::Element);
        assert_eq!(element.meta().ty(), &TypeExpr::named("Item"));
        assert!(matches!(element.kind(), NodeKind::Struct { .. }));
        assert_eq!(element.meta().depth(), 2);
    }

    #[test]
    fn missing_arguments_leave_unresolved_members() {
        let schema = pair_schema();
        let graph = TypeGraph::new(&schema);
        let root = graph.root(&TypeExpr::named("Pair"));
        let left = graph.children_of(&root).remove(0);
        assert!(matches!(left.kind(), NodeKind::Unresolved { reason } if reason.contains("`L`")));
    }

    #[test]
    fn optional_members_are_transparent_but_nullable() {
        let schema = Schema::new().with(
            StructDef::new("Link").field("next", TypeExpr::optional(TypeExpr::named("Link"))),
        );
        let graph = TypeGraph::new(&schema);
        let root = graph.root(&TypeExpr::named("Link"));
        let next = graph.children_of(&root).remove(0);
        assert!(next.is_nullable());
        assert_eq!(next.meta().ty(), &TypeExpr::named("Link"));
    }

    #[test]
    fn maps_expose_key_and_value_nodes() {
        let schema = Schema::new();
        let graph = TypeGraph::new(&schema);
        let root = graph.root(&TypeExpr::map(
            TypeExpr::scalar(ScalarKind::String),
            TypeExpr::scalar(ScalarKind::I64),
        ));
        let slots: Vec<Slot> = graph
            .children_of(&root)
            .iter()
            .map(|child| child.meta().slot().clone())
            .collect();
        assert_eq!(slots, vec![Slot::Key, Slot::Value]);
        assert!(root.is_container());
    }

    #[test]
    fn enums_resolve_to_scalars_and_interfaces_stay_unresolved() {
        let schema = pair_schema();
        let graph = TypeGraph::new(&schema);
        let colour = graph.root(&TypeExpr::named("Colour"));
        assert!(matches!(colour.kind(), NodeKind::Scalar(ScalarShape::Enum(v)) if v.len() == 2));
        let shape = graph.root(&TypeExpr::named("Shape"));
        assert!(matches!(shape.kind(), NodeKind::Unresolved { .. }));

        let item = graph.retarget(&shape, &TypeExpr::named("Item"));
        assert!(matches!(item.kind(), NodeKind::Struct { .. }));
        assert_eq!(item.meta().slot(), &Slot::Root);
    }
}
