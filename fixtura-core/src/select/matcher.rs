//! Selector matching with "last declared wins" precedence.

use crate::{path::AncestorPath, schema::NodeMeta};

use super::{
    Selector,
    declaration::{Declaration, Domain},
};

/// Per-call record of which selectors were used.
///
/// One flag per member of every declared group, initialised to `false` and
/// flipped the first time the member matches a node for a winning
/// declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct MatchRecord {
    used: Vec<Vec<bool>>,
}

impl MatchRecord {
    pub(crate) fn new(declarations: &[Declaration]) -> Self {
        Self {
            used: declarations
                .iter()
                .map(|declaration| vec![false; declaration.selection().selectors().len()])
                .collect(),
        }
    }

    fn mark(&mut self, declaration: usize, member: usize) {
        if let Some(flag) = self
            .used
            .get_mut(declaration)
            .and_then(|members| members.get_mut(member))
        {
            *flag = true;
        }
    }

    /// Returns every unused selector with its declaration, in declaration
    /// order.
    pub(crate) fn unused<'d>(
        &self,
        declarations: &'d [Declaration],
    ) -> Vec<(&'d Declaration, &'d Selector)> {
        declarations
            .iter()
            .zip(&self.used)
            .flat_map(|(declaration, flags)| {
                declaration
                    .selection()
                    .selectors()
                    .iter()
                    .zip(flags)
                    .filter(|(_, used)| !**used)
                    .map(move |(selector, _)| (declaration, selector))
            })
            .collect()
    }
}

/// Matches nodes against the declared customisations.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SelectorMatcher<'d> {
    declarations: &'d [Declaration],
}

impl<'d> SelectorMatcher<'d> {
    pub(crate) const fn new(declarations: &'d [Declaration]) -> Self {
        Self { declarations }
    }

    /// Returns the highest-order declaration in `domain` matching `node`, and
    /// marks its matching members used.
    pub(crate) fn winner(
        &self,
        domain: Domain,
        node: &NodeMeta,
        path: &AncestorPath,
        record: &mut MatchRecord,
    ) -> Option<&'d Declaration> {
        self.declarations
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, declaration)| declaration.domain() == domain)
            .find(|(index, declaration)| Self::mark_matches(*index, declaration, node, path, record))
            .map(|(_, declaration)| declaration)
    }

    /// Returns every declaration in `domain` matching `node`, in declaration
    /// order, marking each used.
    pub(crate) fn all(
        &self,
        domain: Domain,
        node: &NodeMeta,
        path: &AncestorPath,
        record: &mut MatchRecord,
    ) -> Vec<&'d Declaration> {
        self.declarations
            .iter()
            .enumerate()
            .filter(|(_, declaration)| declaration.domain() == domain)
            .filter(|(index, declaration)| Self::mark_matches(*index, declaration, node, path, record))
            .map(|(_, declaration)| declaration)
            .collect()
    }

    fn mark_matches(
        index: usize,
        declaration: &Declaration,
        node: &NodeMeta,
        path: &AncestorPath,
        record: &mut MatchRecord,
    ) -> bool {
        let mut matched = false;
        for (member, selector) in declaration.selection().selectors().iter().enumerate() {
            if selector.matches(node, path) {
                record.mark(index, member);
                matched = true;
            }
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        error::SourceLocation,
        schema::{ScalarKind, Schema, StructDef, TypeExpr, resolve::TypeGraph},
        select::{Selection, any_of, declaration::Action, field, field_named, scope, types},
        value::Value,
    };

    fn declare(selection: impl Into<Selection>, action: Action, order: usize) -> Declaration {
        Declaration::new(
            order,
            selection.into(),
            action,
            SourceLocation::new("matcher.rs", u32::try_from(order).unwrap_or(0) + 1, 1),
        )
    }

    fn person_name() -> (NodeMeta, AncestorPath) {
        let schema = Schema::new().with(
            StructDef::new("Person")
                .field("name", ScalarKind::String)
                .field("age", ScalarKind::U8),
        );
        let graph = TypeGraph::new(&schema);
        let root = graph.root(&TypeExpr::named("Person"));
        let name = graph.children_of(&root).remove(0);
        let mut path = AncestorPath::new();
        path.push(&root);
        (name.meta().clone(), path)
    }

    #[test]
    fn last_declared_wins_regardless_of_specificity() {
        let declarations = vec![
            declare(
                field("Person", "name").within([scope("Person")]),
                Action::Set(Value::from("specific")),
                0,
            ),
            declare(types("String"), Action::Set(Value::from("broad")), 1),
        ];
        let matcher = SelectorMatcher::new(&declarations);
        let mut record = MatchRecord::new(&declarations);
        let (node, path) = person_name();

        let winner = matcher
            .winner(Domain::Value, &node, &path, &mut record)
            .expect("both declarations match");
        assert_eq!(winner.order(), 1);
        let unused = record.unused(&declarations);
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].0.order(), 0);
    }

    #[test]
    fn domains_do_not_compete() {
        let declarations = vec![
            declare(field_named("name"), Action::WithNullable, 0),
            declare(field_named("name"), Action::Ignore, 1),
        ];
        let matcher = SelectorMatcher::new(&declarations);
        let mut record = MatchRecord::new(&declarations);
        let (node, path) = person_name();

        let nullable = matcher.winner(Domain::Nullable, &node, &path, &mut record);
        assert_eq!(nullable.map(Declaration::order), Some(0));
        let value = matcher.winner(Domain::Value, &node, &path, &mut record);
        assert_eq!(value.map(Declaration::order), Some(1));
        assert!(record.unused(&declarations).is_empty());
    }

    #[test]
    fn groups_track_each_member() {
        let declarations = vec![declare(
            any_of([field_named("name"), field_named("nickname")]),
            Action::Ignore,
            0,
        )];
        let matcher = SelectorMatcher::new(&declarations);
        let mut record = MatchRecord::new(&declarations);
        let (node, path) = person_name();

        assert!(matcher.winner(Domain::Value, &node, &path, &mut record).is_some());
        let unused = record.unused(&declarations);
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].1.to_string(), r#"field_named("nickname")"#);
    }

    #[test]
    fn completions_are_returned_in_declaration_order() {
        let noop = |_: &mut Value| {};
        let declarations = vec![
            declare(types("String"), Action::OnComplete(Arc::new(noop)), 0),
            declare(field_named("age"), Action::OnComplete(Arc::new(noop)), 1),
            declare(field_named("name"), Action::OnComplete(Arc::new(noop)), 2),
        ];
        let matcher = SelectorMatcher::new(&declarations);
        let mut record = MatchRecord::new(&declarations);
        let (node, path) = person_name();

        let orders: Vec<usize> = matcher
            .all(Domain::Completion, &node, &path, &mut record)
            .into_iter()
            .map(Declaration::order)
            .collect();
        assert_eq!(orders, vec![0, 2]);
    }
}
