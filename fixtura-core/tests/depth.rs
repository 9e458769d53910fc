//! Depth bound and truncation policy behaviour.

mod common;

use common::{at, three_levels};
use fixtura_core::{FixturaError, FixturaErrorCode, FixtureBuilder, TypeExpr, Value};
use fixtura_test_support::tracing::RecordingLayer;
use rstest::rstest;
use tracing::Level;

fn root() -> FixtureBuilder {
    FixtureBuilder::from_schema(three_levels(), TypeExpr::named("Root")).with_seed(11)
}

#[rstest]
fn zero_depth_keeps_only_the_root() {
    let value = root().with_max_depth(0).create_value().expect("ignore policy");
    let record = value.as_record().expect("root is still instantiated");
    assert_eq!(record.type_name(), "Root");
    assert!(record.fields().all(|(_, member)| member.is_null()));
}

#[rstest]
fn first_level_members_are_populated_at_depth_one() {
    let value = root().with_max_depth(1).create_value().expect("ignore policy");
    assert!(at(&value, "label").as_str().is_some());
    assert!(at(&value, "a").as_record().is_some());
    assert_eq!(at(&value, "a.label"), &Value::Null);
    assert_eq!(at(&value, "a.b"), &Value::Null);
}

#[rstest]
fn second_level_members_are_populated_at_depth_two() {
    let value = root().with_max_depth(2).create_value().expect("ignore policy");
    assert!(at(&value, "a.label").as_str().is_some());
    assert!(at(&value, "a.b").as_record().is_some());
    assert_eq!(at(&value, "a.b.label"), &Value::Null);
}

#[rstest]
fn the_default_depth_populates_everything() {
    let value = root().create_value().expect("three levels fit in the default depth");
    assert!(at(&value, "a.b.label").as_str().is_some());
}

#[rstest]
fn fail_policy_names_the_first_truncated_node() {
    let err = root()
        .with_max_depth(1)
        .fail_on_max_depth()
        .create_value()
        .expect_err("a.label lies beyond depth 1");
    assert_eq!(err.code(), FixturaErrorCode::MaxDepthReached);
    let FixturaError::MaxDepthReached { max_depth, path } = err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(max_depth, 1);
    assert_eq!(&*path, "Root.a.label");
}

#[rstest]
fn fail_policy_passes_when_nothing_is_truncated() {
    assert!(root().fail_on_max_depth().create_value().is_ok());
}

#[rstest]
fn ignore_policy_logs_one_summary() {
    let (layer, guard) = RecordingLayer::install();
    root().with_max_depth(1).create_value().expect("ignore policy");
    drop(guard);

    let warnings = layer.events_at(Level::WARN);
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    let summary = &warnings[0];
    assert_eq!(summary.field("truncated"), Some("2"));
    assert_eq!(summary.field("first"), Some("Root.a.label"));
}

#[rstest]
fn the_create_span_records_seed_and_depth() {
    let (layer, guard) = RecordingLayer::install();
    root().with_max_depth(3).create_value().expect("valid");
    drop(guard);

    let span = layer.find_span("fixture.create").expect("span recorded");
    assert_eq!(span.field("seed"), Some("11"));
    assert_eq!(span.field("max_depth"), Some("3"));
    assert_eq!(span.field("root"), Some("Root"));
}
