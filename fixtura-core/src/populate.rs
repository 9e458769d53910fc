//! Depth-first population of a type graph.
//!
//! For every node the populator asks, in order: is the node within the depth
//! bound, would expanding it re-enter a type on the active path, is a subtype
//! selected, and does a customisation override its value. Children are
//! visited with the node pushed on the ancestor path and popped afterwards;
//! completion hooks run on the way back up.

use tracing::{debug, trace, warn};

use crate::{
    depth::DepthController,
    error::FixturaError,
    generators::{self, CollectionSpec, Gen},
    instantiate::InstantiationChain,
    path::AncestorPath,
    random::Random,
    schema::{Node, NodeKind, TypeDef, TypeExpr, resolve::TypeGraph},
    select::{
        declaration::{Action, Declaration, Domain},
        matcher::{MatchRecord, SelectorMatcher},
    },
    settings::SettingsSnapshot,
    value::{Record, Value},
};

/// Draws allowed per requested element of a set or map before giving up on
/// finding distinct values.
const DISTINCT_ATTEMPTS_PER_ELEMENT: usize = 10;

/// Mutable state of one creation call.
pub(crate) struct Populator<'a> {
    graph: TypeGraph<'a>,
    matcher: SelectorMatcher<'a>,
    chain: &'a InstantiationChain,
    settings: &'a SettingsSnapshot,
    random: Random,
    record: MatchRecord,
    depth: DepthController,
    path: AncestorPath,
}

impl<'a> Populator<'a> {
    pub(crate) fn new(
        graph: TypeGraph<'a>,
        declarations: &'a [Declaration],
        chain: &'a InstantiationChain,
        settings: &'a SettingsSnapshot,
        random: Random,
    ) -> Self {
        Self {
            graph,
            matcher: SelectorMatcher::new(declarations),
            chain,
            settings,
            random,
            record: MatchRecord::new(declarations),
            depth: DepthController::new(settings.max_depth(), settings.max_depth_policy()),
            path: AncestorPath::new(),
        }
    }

    /// Populates one root value of type `ty`.
    pub(crate) fn populate(&mut self, ty: &TypeExpr) -> Result<Value, FixturaError> {
        let root = self.graph.root(ty);
        self.visit(&root)
    }

    /// Emits the truncation summary and hands back the match record.
    pub(crate) fn finish(self) -> MatchRecord {
        if let Some((truncated, first)) = self.depth.summary() {
            warn!(
                truncated,
                first = %first,
                max_depth = self.settings.max_depth(),
                "nodes beyond the maximum depth were left empty"
            );
        }
        self.record
    }

    fn visit(&mut self, node: &Node) -> Result<Value, FixturaError> {
        trace!(node = %node.meta(), depth = node.meta().depth(), "visit");
        if !self.depth.should_expand(node.meta()) {
            let path = &self.path;
            self.depth
                .truncate(node.meta(), || path.render_with(node.meta()))?;
            return Ok(Value::Null);
        }
        if self.path.would_cycle(node.meta().ty()) {
            debug!(node = %self.path.render_with(node.meta()), "cycle truncated");
            return Ok(Value::Null);
        }

        let retargeted = match self.winner(Domain::Subtype, node) {
            Some(declaration) => match declaration.action() {
                Action::Subtype(ty) => Some(self.graph.retarget(node, ty)),
                _ => None,
            },
            None => None,
        };
        let node = match &retargeted {
            Some(subtype) => {
                if self.path.would_cycle(subtype.meta().ty()) {
                    debug!(node = %self.path.render_with(subtype.meta()), "cycle truncated");
                    return Ok(Value::Null);
                }
                subtype
            }
            None => node,
        };

        let customisation = self.winner(Domain::Value, node);
        let nullable = self.winner(Domain::Nullable, node).is_some()
            || (node.is_nullable() && self.settings.nullable_options());
        let mut value = if nullable && self.random.chance(self.settings.nullable_probability()) {
            Value::Null
        } else {
            match customisation {
                Some(declaration) => self.apply(node, declaration)?,
                None => self.expand(node, None)?,
            }
        };
        self.complete(node, &mut value);
        Ok(value)
    }

    fn winner(&mut self, domain: Domain, node: &Node) -> Option<&'a Declaration> {
        self.matcher
            .winner(domain, node.meta(), &self.path, &mut self.record)
    }

    fn apply(&mut self, node: &Node, declaration: &Declaration) -> Result<Value, FixturaError> {
        match declaration.action() {
            Action::Ignore => Ok(Value::Null),
            Action::Set(value) => Ok(value.clone()),
            Action::Supply(supply) => Ok(supply(&mut self.random)),
            Action::Generate(Gen::Collection(spec)) => {
                if node.is_container() {
                    self.expand(node, Some(spec))
                } else {
                    Err(FixturaError::usage(
                        format!("generator `collection` cannot populate `{}`", node.meta().ty()),
                        declaration.location(),
                    ))
                }
            }
            Action::Generate(spec) => spec
                .produce(node.kind(), self.settings, &mut self.random)
                .map_err(|reason| FixturaError::usage(reason, declaration.location())),
            Action::OnComplete(_) | Action::WithNullable | Action::Subtype(_) => {
                self.expand(node, None)
            }
        }
    }

    fn complete(&mut self, node: &Node, value: &mut Value) {
        let hooks = self
            .matcher
            .all(Domain::Completion, node.meta(), &self.path, &mut self.record);
        if value.is_null() {
            return;
        }
        for hook in hooks {
            if let Action::OnComplete(callback) = hook.action() {
                callback(value);
            }
        }
    }

    fn expand(&mut self, node: &Node, spec: Option<&CollectionSpec>) -> Result<Value, FixturaError> {
        match node.kind() {
            NodeKind::Scalar(shape) => Ok(generators::default_scalar(
                shape,
                self.settings,
                &mut self.random,
            )),
            NodeKind::Unresolved { .. } => Ok(Value::Null),
            NodeKind::Struct { name, .. } => self.expand_struct(node, name),
            NodeKind::Sequence { unique, .. } => self.expand_sequence(node, *unique, spec),
            NodeKind::Map { .. } => self.expand_map(node, spec),
        }
    }

    fn expand_struct(&mut self, node: &Node, name: &str) -> Result<Value, FixturaError> {
        let Some(TypeDef::Struct(def)) = self.graph.schema().get(name) else {
            return Ok(Value::Null);
        };
        let Some(instance) = self.chain.instantiate(node.meta().ty(), def)? else {
            return Ok(Value::Null);
        };
        let Value::Struct(mut record) = instance else {
            return Ok(instance);
        };
        let children = self.graph.children_of(node);
        self.path.push(node);
        let outcome = self.fill_record(&mut record, &children);
        self.path.pop();
        outcome?;
        Ok(Value::Struct(record))
    }

    fn fill_record(&mut self, record: &mut Record, children: &[Node]) -> Result<(), FixturaError> {
        for child in children {
            let value = self.visit(child)?;
            if let (Some(member), false) = (child.meta().member(), value.is_null()) {
                record.set(member, value);
            }
        }
        Ok(())
    }

    fn expand_sequence(
        &mut self,
        node: &Node,
        unique: bool,
        spec: Option<&CollectionSpec>,
    ) -> Result<Value, FixturaError> {
        let size = generators::container_size(false, spec, self.settings, &mut self.random);
        let Some(element) = self.graph.children_of(node).into_iter().next() else {
            return Ok(Value::Seq(Vec::new()));
        };
        self.path.push(node);
        let outcome = self.fill_elements(&element, size, unique);
        self.path.pop();
        let elements = outcome?;
        Ok(if unique {
            Value::Set(elements)
        } else {
            Value::Seq(elements)
        })
    }

    fn fill_elements(
        &mut self,
        element: &Node,
        size: usize,
        unique: bool,
    ) -> Result<Vec<Value>, FixturaError> {
        let attempts = if unique {
            size.saturating_mul(DISTINCT_ATTEMPTS_PER_ELEMENT)
        } else {
            size
        };
        let mut elements = Vec::with_capacity(size);
        for _ in 0..attempts {
            if elements.len() == size {
                break;
            }
            let value = self.visit(element)?;
            if value.is_null() && !element.is_nullable() {
                continue;
            }
            if unique && elements.contains(&value) {
                continue;
            }
            elements.push(value);
        }
        if elements.len() < size {
            debug!(
                node = %self.path,
                requested = size,
                produced = elements.len(),
                "container received fewer elements than requested"
            );
        }
        Ok(elements)
    }

    fn expand_map(
        &mut self,
        node: &Node,
        spec: Option<&CollectionSpec>,
    ) -> Result<Value, FixturaError> {
        let size = generators::container_size(true, spec, self.settings, &mut self.random);
        let mut children = self.graph.children_of(node).into_iter();
        let (Some(key), Some(value)) = (children.next(), children.next()) else {
            return Ok(Value::Map(Vec::new()));
        };
        self.path.push(node);
        let outcome = self.fill_entries(&key, &value, size);
        self.path.pop();
        Ok(Value::Map(outcome?))
    }

    fn fill_entries(
        &mut self,
        key_node: &Node,
        value_node: &Node,
        size: usize,
    ) -> Result<Vec<(Value, Value)>, FixturaError> {
        let mut entries: Vec<(Value, Value)> = Vec::with_capacity(size);
        for _ in 0..size.saturating_mul(DISTINCT_ATTEMPTS_PER_ELEMENT) {
            if entries.len() == size {
                break;
            }
            let key = self.visit(key_node)?;
            if key.is_null() || entries.iter().any(|(existing, _)| *existing == key) {
                continue;
            }
            let value = self.visit(value_node)?;
            if value.is_null() && !value_node.is_nullable() {
                continue;
            }
            entries.push((key, value));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::SourceLocation,
        instantiate::ProviderStrategy,
        schema::{ScalarKind, Schema, StructDef},
        select::{Selection, field, field_named, root, types},
        settings::Settings,
    };

    use rstest::{fixture, rstest};

    #[fixture]
    fn schema() -> Schema {
        Schema::new().with(
            StructDef::new("Person")
                .field("name", ScalarKind::String)
                .field("age", ScalarKind::U8)
                .field("nickname", TypeExpr::optional(TypeExpr::scalar(ScalarKind::String)))
                .field("tags", TypeExpr::set(TypeExpr::scalar(ScalarKind::Bool)))
                .field("friend", TypeExpr::optional(TypeExpr::named("Person"))),
        )
    }

    fn run(
        schema: &Schema,
        declarations: &[Declaration],
        settings: &Settings,
    ) -> Result<(Value, MatchRecord), FixturaError> {
        let snapshot = settings.resolve()?;
        let chain = InstantiationChain::standard(&ProviderStrategy::default(), &[]);
        let mut populator = Populator::new(
            TypeGraph::new(schema),
            declarations,
            &chain,
            &snapshot,
            Random::from_seed(5),
        );
        let value = populator.populate(&TypeExpr::named("Person"))?;
        Ok((value, populator.finish()))
    }

    fn declare(order: usize, selection: impl Into<Selection>, action: Action) -> Declaration {
        Declaration::new(order, selection.into(), action, SourceLocation::new("populate.rs", 1, 1))
    }

    #[rstest]
    fn self_reference_is_cut_at_the_first_repetition(schema: Schema) {
        let (value, _) = run(&schema, &[], &Settings::new()).expect("population succeeds");
        assert!(value.pointer("name").and_then(Value::as_str).is_some());
        assert_eq!(value.pointer("friend"), Some(&Value::Null));
    }

    #[rstest]
    fn sets_are_deduplicated_within_bounded_attempts(schema: Schema) {
        let settings = Settings::new().collection_size(5..=5);
        let (value, _) = run(&schema, &[], &settings).expect("population succeeds");
        let tags = value
            .pointer("tags")
            .and_then(Value::as_elements)
            .expect("tags are populated");
        assert!((1..=2).contains(&tags.len()), "{tags:?}");
    }

    #[rstest]
    fn ignore_leaves_the_member_null_and_marks_the_selector(schema: Schema) {
        let declarations = vec![declare(0, field("Person", "age"), Action::Ignore)];
        let (value, record) = run(&schema, &declarations, &Settings::new()).expect("succeeds");
        assert_eq!(value.pointer("age"), Some(&Value::Null));
        assert!(record.unused(&declarations).is_empty());
    }

    #[rstest]
    fn generate_mismatch_is_a_usage_error(schema: Schema) {
        let declarations = vec![declare(0, field_named("name"), Action::Generate(Gen::bools()))];
        let err = run(&schema, &declarations, &Settings::new()).expect_err("mismatched generator");
        assert!(matches!(err, FixturaError::Usage { .. }));
    }

    #[rstest]
    fn completion_hooks_see_populated_children(schema: Schema) {
        let hook = std::sync::Arc::new(|value: &mut Value| {
            if let Some(record) = value.as_record_mut() {
                let name = record.get("name").cloned().unwrap_or(Value::Null);
                record.set("name", Value::from(format!("done:{}", name.as_str().unwrap_or(""))));
            }
        });
        let declarations = vec![
            declare(0, types("String"), Action::Set(Value::from("x"))),
            declare(1, root(), Action::OnComplete(hook)),
        ];
        let (value, _) = run(&schema, &declarations, &Settings::new()).expect("succeeds");
        assert_eq!(value.pointer("name"), Some(&Value::from("done:x")));
    }

    #[rstest]
    fn nullable_options_may_leave_members_empty(schema: Schema) {
        let settings = Settings::new().nullable_options(true).nullable_probability(1.0);
        let declarations = vec![declare(0, field_named("nickname"), Action::Set(Value::from("x")))];
        let (value, record) = run(&schema, &declarations, &settings).expect("succeeds");
        assert_eq!(value.pointer("nickname"), Some(&Value::Null));
        assert!(value.pointer("name").and_then(Value::as_str).is_some());
        assert!(record.unused(&declarations).is_empty());
    }
}
