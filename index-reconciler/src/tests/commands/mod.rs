use assert_matches::assert_matches;
use rstest::*;

use crate::commands::{check_drift, render_output, run};
use crate::error::ReconcilerError;
use crate::reconciler::ReconcileMode;
use crate::schema::constant::{PLAN_SNAPSHOTS_COLLECTION, RUN_EVENTS_COLLECTION, WEEKLY_METRICS_COLLECTION};
use crate::schema::SchemaError;
use crate::tests::common::*;
use crate::types::index::asc;
use crate::types::params::SchemaArgs;

#[fixture]
fn catalog() -> InMemoryIndexCatalog {
    InMemoryIndexCatalog::new()
}

fn only(collections: &[&str]) -> SchemaArgs {
    SchemaArgs { version: None, collections: collections.iter().map(|name| name.to_string()).collect() }
}

#[rstest]
#[tokio::test]
async fn collection_filter_limits_the_run(catalog: InMemoryIndexCatalog) {
    let report = run(&catalog, &only(&[WEEKLY_METRICS_COLLECTION]), ReconcileMode::Apply).await.unwrap();

    assert_eq!(report.collections.len(), 1);
    assert_eq!(report.collections[0].collection, WEEKLY_METRICS_COLLECTION);
    assert_eq!(report.schema_version, 1);
    assert_eq!(catalog.index_names(WEEKLY_METRICS_COLLECTION).len(), 3);
    assert!(catalog.indexes(RUN_EVENTS_COLLECTION).is_empty());
}

#[rstest]
#[tokio::test]
async fn filter_keeps_declaration_order(catalog: InMemoryIndexCatalog) {
    let args = only(&[PLAN_SNAPSHOTS_COLLECTION, RUN_EVENTS_COLLECTION]);

    let report = run(&catalog, &args, ReconcileMode::DryRun).await.unwrap();

    let order: Vec<&str> = report.collections.iter().map(|c| c.collection.as_str()).collect();
    assert_eq!(order, vec![RUN_EVENTS_COLLECTION, PLAN_SNAPSHOTS_COLLECTION]);
}

#[rstest]
#[tokio::test]
async fn unknown_collection_is_rejected_before_any_call(catalog: InMemoryIndexCatalog) {
    let result = run(&catalog, &only(&["run_event"]), ReconcileMode::Apply).await;

    assert_matches!(
        result,
        Err(ReconcilerError::SchemaError(SchemaError::UnknownCollection(ref name, 1))) if name == "run_event"
    );
    assert!(catalog.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn unknown_schema_version_is_rejected(catalog: InMemoryIndexCatalog) {
    let args = SchemaArgs { version: Some(7), collections: vec![] };

    let result = run(&catalog, &args, ReconcileMode::Apply).await;

    assert_matches!(
        result,
        Err(ReconcilerError::SchemaError(SchemaError::UnknownVersion { requested: 7, latest: 1 }))
    );
    assert!(catalog.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn drift_check_fails_only_when_asked(catalog: InMemoryIndexCatalog) {
    let pending = run(&catalog, &SchemaArgs::default(), ReconcileMode::DryRun).await.unwrap();

    assert!(check_drift(&pending, false).is_ok());
    assert_matches!(check_drift(&pending, true), Err(ReconcilerError::DriftDetected(5)));

    run(&catalog, &SchemaArgs::default(), ReconcileMode::Apply).await.unwrap();
    let settled = run(&catalog, &SchemaArgs::default(), ReconcileMode::DryRun).await.unwrap();

    assert!(check_drift(&settled, true).is_ok());
    assert_eq!(settled.progress_lines().first().map(String::as_str), Some("run_events indexes up to date."));
}

#[rstest]
#[tokio::test]
async fn text_output_starts_with_database_banner(catalog: InMemoryIndexCatalog) {
    catalog.seed(RUN_EVENTS_COLLECTION, vec![ttl_index("old_ttl", vec![asc("createdAt")], NINETY_DAYS)]);
    let report = run(&catalog, &only(&[RUN_EVENTS_COLLECTION]), ReconcileMode::Apply).await.unwrap();

    assert_eq!(
        render_output(&report, false).unwrap(),
        vec![
            format!("Using database: {}", TEST_DATABASE),
            "Dropped conflicting TTL index old_ttl on run_events.".to_string(),
            "run_events indexes ensured.".to_string(),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn json_output_is_a_single_document(catalog: InMemoryIndexCatalog) {
    let report = run(&catalog, &only(&[WEEKLY_METRICS_COLLECTION]), ReconcileMode::DryRun).await.unwrap();

    let lines = render_output(&report, true).unwrap();

    assert_eq!(lines.len(), 1);
    let document: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(document["database"], TEST_DATABASE);
    assert_eq!(document["mode"], "dry_run");
    assert_eq!(document["collections"][0]["collection"], WEEKLY_METRICS_COLLECTION);
    assert_eq!(document["collections"][0]["plan"]["actions"][0]["action"], "create");
}
