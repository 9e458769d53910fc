//! Cycle truncation through object edges, containers and subtypes.

mod common;

use common::{at, company, mutual};
use fixtura_core::{
    FixtureBuilder, ScalarKind, Schema, StructDef, TypeExpr, Value,
    select::field,
};
use rstest::rstest;

#[rstest]
fn mutual_references_stop_at_the_repeated_type() {
    let value = FixtureBuilder::from_schema(mutual(), TypeExpr::named("A"))
        .with_max_depth(usize::MAX)
        .with_seed(2)
        .create_value()
        .expect("population terminates");
    assert!(at(&value, "id").as_i64().is_some());
    assert!(at(&value, "b.id").as_i64().is_some());
    assert_eq!(at(&value, "b.a"), &Value::Null);
}

#[rstest]
fn sibling_branches_see_independent_paths() {
    let value = FixtureBuilder::from_schema(company(), TypeExpr::named("Company"))
        .with_seed(5)
        .create_value()
        .expect("valid");
    assert!(at(&value, "ceo.home.city").as_str().is_some());
    assert_eq!(at(&value, "ceo.manager"), &Value::Null);
    let staff = at(&value, "staff").as_elements().expect("a sequence");
    assert!(!staff.is_empty());
    for employee in staff {
        assert!(at(employee, "home.street").as_str().is_some());
        assert_eq!(at(employee, "manager"), &Value::Null);
    }
}

#[rstest]
fn recursion_through_a_container_is_bounded_by_depth() {
    let schema = Schema::new().with(
        StructDef::new("Tree")
            .field("label", ScalarKind::String)
            .field("children", TypeExpr::seq(TypeExpr::named("Tree"))),
    );
    let value = FixtureBuilder::from_schema(schema, TypeExpr::named("Tree"))
        .with_max_depth(4)
        .with_settings(fixtura_core::Settings::new().collection_size(1..=1))
        .with_seed(8)
        .create_value()
        .expect("population terminates");

    let child = &at(&value, "children").as_elements().expect("a sequence")[0];
    let grandchild = &at(child, "children").as_elements().expect("a sequence")[0];
    assert!(at(grandchild, "label").as_str().is_none());
    assert_eq!(at(grandchild, "children"), &Value::Null);
}

#[rstest]
fn a_subtype_that_re_enters_the_path_is_truncated() {
    let schema = Schema::new()
        .with(StructDef::new("Holder").field("slot", TypeExpr::named("Item")))
        .with(StructDef::new("Item").field("inner", TypeExpr::named("Leaf")))
        .with(StructDef::new("Leaf").field("tag", ScalarKind::String));
    let value = FixtureBuilder::from_schema(schema, TypeExpr::named("Holder"))
        .subtype(field("Item", "inner"), TypeExpr::named("Holder"))
        .with_seed(1)
        .create_value()
        .expect("population terminates");
    assert_eq!(at(&value, "slot.inner"), &Value::Null);
}
