use std::time::Duration;

use assert_matches::assert_matches;
use mockall::Sequence;
use rstest::*;

use crate::core::client::database::{DatabaseError, MockIndexCatalog};
use crate::reconciler::plan::ConflictReason;
use crate::reconciler::{
    ensure_ttl_index, reconcile_collection, reconcile_schema, ReconcileError, ReconcileMode, ReconcileReport,
};
use crate::schema::constant::*;
use crate::schema::{CollectionSchema, SchemaVersion, TtlRule};
use crate::tests::common::*;
use crate::types::index::{asc, desc, IndexSpec};

#[fixture]
fn catalog() -> InMemoryIndexCatalog {
    InMemoryIndexCatalog::new()
}

#[fixture]
fn schema() -> SchemaVersion {
    crate::schema::latest().unwrap()
}

fn run_events_rule() -> TtlRule {
    TtlRule::new("createdAt", "run_events_createdAt_ttl", NINETY_DAYS)
}

async fn apply_all(catalog: &InMemoryIndexCatalog, schema: &SchemaVersion) -> ReconcileReport {
    let collections: Vec<&CollectionSchema> = schema.collections.iter().collect();
    reconcile_schema(catalog, schema.version, &collections, ReconcileMode::Apply).await.unwrap()
}

#[rstest]
#[tokio::test]
async fn second_apply_issues_no_mutations(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    let first = apply_all(&catalog, &schema).await;
    assert_eq!(first.created(), 14);
    assert_eq!(first.dropped(), 0);

    catalog.clear_calls();
    let second = apply_all(&catalog, &schema).await;

    assert!(catalog.mutations().is_empty());
    assert_eq!(second.created(), 0);
    assert_eq!(second.drifted_collections(), 0);
    assert!(second.collections.iter().all(|report| report.outcome.as_ref().is_some_and(|o| o.is_noop())));
}

#[rstest]
#[tokio::test]
async fn applied_run_prints_progress_per_collection(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    let report = apply_all(&catalog, &schema).await;
    assert_eq!(
        report.progress_lines(),
        vec![
            "run_events indexes ensured.",
            "feedback_events indexes ensured.",
            "weekly_metrics indexes ensured.",
            "plan_snapshots indexes ensured.",
            "run_artifacts indexes ensured.",
        ]
    );
    assert_eq!(report.database, TEST_DATABASE);
}

#[rstest]
#[tokio::test]
async fn legacy_ttl_on_run_events_is_replaced(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    catalog.seed(RUN_EVENTS_COLLECTION, vec![ttl_index("old_ttl", vec![asc("createdAt")], NINETY_DAYS)]);
    let run_events = schema.collection(RUN_EVENTS_COLLECTION).unwrap();

    let report = reconcile_collection(&catalog, run_events, ReconcileMode::Apply).await.unwrap();

    assert_eq!(
        catalog.mutations(),
        vec![
            create_call(RUN_EVENTS_COLLECTION, "run_events_runId_unique"),
            create_call(RUN_EVENTS_COLLECTION, "run_events_status_createdAt"),
            drop_call(RUN_EVENTS_COLLECTION, "old_ttl"),
            create_call(RUN_EVENTS_COLLECTION, "run_events_createdAt_ttl"),
        ]
    );
    assert_eq!(
        catalog.index_names(RUN_EVENTS_COLLECTION),
        vec!["_id_", "run_events_runId_unique", "run_events_status_createdAt", "run_events_createdAt_ttl"]
    );
    let ttl = catalog.index(RUN_EVENTS_COLLECTION, "run_events_createdAt_ttl").unwrap();
    assert_eq!(ttl.keys, vec![asc("createdAt")]);
    assert_eq!(ttl.expire_after, Some(NINETY_DAYS));
    assert_eq!(report.outcome.unwrap().dropped, vec!["old_ttl".to_string()]);
}

#[rstest]
#[tokio::test]
async fn descending_legacy_ttl_is_replaced(catalog: InMemoryIndexCatalog) {
    catalog.seed(RUN_EVENTS_COLLECTION, vec![ttl_index("createdAt_-1", vec![desc("createdAt")], NINETY_DAYS)]);

    let outcome = ensure_ttl_index(&catalog, RUN_EVENTS_COLLECTION, &run_events_rule()).await.unwrap();

    assert_eq!(outcome.dropped, vec!["createdAt_-1".to_string()]);
    assert_eq!(outcome.created, vec!["run_events_createdAt_ttl".to_string()]);
    assert_eq!(catalog.index_names(RUN_EVENTS_COLLECTION), vec!["_id_", "run_events_createdAt_ttl"]);
}

#[rstest]
#[tokio::test]
async fn canonical_ttl_already_present_is_left_alone(catalog: InMemoryIndexCatalog) {
    catalog.seed(
        RUN_EVENTS_COLLECTION,
        vec![ttl_index("run_events_createdAt_ttl", vec![asc("createdAt")], NINETY_DAYS)],
    );

    let outcome = ensure_ttl_index(&catalog, RUN_EVENTS_COLLECTION, &run_events_rule()).await.unwrap();

    assert!(outcome.is_noop());
    assert_eq!(outcome.kept, vec!["run_events_createdAt_ttl".to_string()]);
    assert_eq!(catalog.calls(), vec![CatalogCall::List { collection: RUN_EVENTS_COLLECTION.to_string() }]);
}

#[rstest]
#[tokio::test]
async fn changed_expiry_is_recreated(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    catalog.seed(
        RUN_EVENTS_COLLECTION,
        vec![ttl_index("run_events_createdAt_ttl", vec![asc("createdAt")], Duration::from_secs(30 * 24 * 60 * 60))],
    );
    let run_events = schema.collection(RUN_EVENTS_COLLECTION).unwrap();

    reconcile_collection(&catalog, run_events, ReconcileMode::Apply).await.unwrap();

    let ttl_mutations: Vec<CatalogCall> = catalog
        .mutations()
        .into_iter()
        .filter(|call| match call {
            CatalogCall::Create { name, .. } | CatalogCall::Drop { name, .. } => name == "run_events_createdAt_ttl",
            CatalogCall::List { .. } => false,
        })
        .collect();
    assert_eq!(
        ttl_mutations,
        vec![
            drop_call(RUN_EVENTS_COLLECTION, "run_events_createdAt_ttl"),
            create_call(RUN_EVENTS_COLLECTION, "run_events_createdAt_ttl"),
        ]
    );
    let ttl = catalog.index(RUN_EVENTS_COLLECTION, "run_events_createdAt_ttl").unwrap();
    assert_eq!(ttl.expire_after, Some(NINETY_DAYS));
}

#[rstest]
#[tokio::test]
async fn fresh_weekly_metrics_gets_exactly_its_two_indexes(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    let weekly = schema.collection(WEEKLY_METRICS_COLLECTION).unwrap();

    reconcile_collection(&catalog, weekly, ReconcileMode::Apply).await.unwrap();

    assert_eq!(
        catalog.index_names(WEEKLY_METRICS_COLLECTION),
        vec!["_id_", "weekly_metrics_weekStart_unique", "weekly_metrics_createdAt_desc"]
    );
    let unique = catalog.index(WEEKLY_METRICS_COLLECTION, "weekly_metrics_weekStart_unique").unwrap();
    assert!(unique.unique);
    assert!(catalog.indexes(WEEKLY_METRICS_COLLECTION).iter().all(|index| index.expire_after.is_none()));
}

#[rstest]
#[tokio::test]
async fn feedback_events_expire_on_received_at(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    let feedback = schema.collection(FEEDBACK_EVENTS_COLLECTION).unwrap();

    reconcile_collection(&catalog, feedback, ReconcileMode::Apply).await.unwrap();

    let ttl = catalog.index(FEEDBACK_EVENTS_COLLECTION, "feedback_events_receivedAt_ttl").unwrap();
    assert_eq!(ttl.keys, vec![asc("receivedAt")]);
    assert_eq!(ttl.expire_after, Some(Duration::from_secs(180 * SECONDS_PER_DAY)));
    let compound = catalog.index(FEEDBACK_EVENTS_COLLECTION, "feedback_events_runId_sessionDay_receivedAt").unwrap();
    assert_eq!(compound.keys, vec![asc("runId"), asc("sessionDay"), desc("receivedAt")]);
}

#[rstest]
#[tokio::test]
async fn undeclared_indexes_survive_apply(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    catalog.seed(RUN_ARTIFACTS_COLLECTION, vec![plain_index("adhoc_userId", vec![asc("userId")])]);
    let artifacts = schema.collection(RUN_ARTIFACTS_COLLECTION).unwrap();

    let report = reconcile_collection(&catalog, artifacts, ReconcileMode::Apply).await.unwrap();

    assert_eq!(report.plan.unmanaged, vec!["adhoc_userId".to_string()]);
    assert!(catalog.index(RUN_ARTIFACTS_COLLECTION, "adhoc_userId").is_some());
    assert!(!catalog.mutations().contains(&drop_call(RUN_ARTIFACTS_COLLECTION, "adhoc_userId")));
}

#[rstest]
#[tokio::test]
async fn dry_run_only_lists(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    catalog.seed(RUN_EVENTS_COLLECTION, vec![ttl_index("old_ttl", vec![asc("createdAt")], NINETY_DAYS)]);
    let collections: Vec<&CollectionSchema> = schema.collections.iter().collect();

    let report = reconcile_schema(&catalog, schema.version, &collections, ReconcileMode::DryRun).await.unwrap();

    assert!(catalog.mutations().is_empty());
    assert_eq!(catalog.calls().len(), 5);
    assert_eq!(report.drifted_collections(), 5);
    assert!(report.collections.iter().all(|collection| collection.outcome.is_none()));
    assert!(catalog.index(RUN_EVENTS_COLLECTION, "old_ttl").is_some());

    let lines = report.progress_lines();
    assert_eq!(lines[0], "run_events plan:");
    assert!(lines.iter().any(|line| line.starts_with("  drop   old_ttl")));
}

#[rstest]
#[tokio::test]
async fn key_pattern_clash_aborts_before_mutating(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    catalog.seed(WEEKLY_METRICS_COLLECTION, vec![plain_index("weekStart_1", vec![asc("weekStart")])]);
    let weekly = schema.collection(WEEKLY_METRICS_COLLECTION).unwrap();

    let result = reconcile_collection(&catalog, weekly, ReconcileMode::Apply).await;

    assert_matches!(
        result,
        Err(ReconcileError::IndexConflict { ref name, ref existing, reason: ConflictReason::KeysTaken, .. })
            if name == "weekly_metrics_weekStart_unique" && existing.starts_with("weekStart_1")
    );
    assert!(catalog.mutations().is_empty());
}

#[rstest]
#[tokio::test]
async fn name_held_by_different_index_aborts(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    catalog.seed(RUN_ARTIFACTS_COLLECTION, vec![plain_index("run_artifacts_createdAt_desc", vec![asc("createdAt")])]);
    let artifacts = schema.collection(RUN_ARTIFACTS_COLLECTION).unwrap();

    let result = reconcile_collection(&catalog, artifacts, ReconcileMode::Apply).await;

    assert_matches!(
        result,
        Err(ReconcileError::IndexConflict { ref name, reason: ConflictReason::NameTaken, .. })
            if name == "run_artifacts_createdAt_desc"
    );
    assert!(catalog.mutations().is_empty());
}

#[rstest]
#[tokio::test]
async fn failure_keeps_earlier_indexes_and_rerun_completes(catalog: InMemoryIndexCatalog, schema: SchemaVersion) {
    catalog.fail_create_of("run_events_status_createdAt");

    let collections: Vec<&CollectionSchema> = schema.collections.iter().collect();
    let failed = reconcile_schema(&catalog, schema.version, &collections, ReconcileMode::Apply).await;
    assert_matches!(failed, Err(ReconcileError::CreateIndex { ref name, .. }) if name == "run_events_status_createdAt");
    assert_eq!(catalog.index_names(RUN_EVENTS_COLLECTION), vec!["_id_", "run_events_runId_unique"]);
    assert!(catalog.indexes(FEEDBACK_EVENTS_COLLECTION).is_empty());

    catalog.clear_failures();
    catalog.clear_calls();
    let report = apply_all(&catalog, &schema).await;

    assert_eq!(report.created(), 13);
    assert!(!catalog.mutations().contains(&create_call(RUN_EVENTS_COLLECTION, "run_events_runId_unique")));
}

#[rstest]
#[tokio::test]
async fn ensure_ttl_index_lists_then_drops_then_creates() {
    let mut catalog = MockIndexCatalog::new();
    let mut seq = Sequence::new();
    let existing = vec![ttl_index("old_ttl", vec![asc("createdAt")], NINETY_DAYS)];

    catalog
        .expect_list_indexes()
        .withf(|collection: &str| collection == RUN_EVENTS_COLLECTION)
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_| Ok(existing.clone()));
    catalog
        .expect_drop_index()
        .withf(|collection: &str, name: &str| collection == RUN_EVENTS_COLLECTION && name == "old_ttl")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    catalog
        .expect_create_index()
        .withf(|collection: &str, spec: &IndexSpec| {
            collection == RUN_EVENTS_COLLECTION && *spec == run_events_rule().index_spec()
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    let outcome = ensure_ttl_index(&catalog, RUN_EVENTS_COLLECTION, &run_events_rule()).await.unwrap();
    assert_eq!(outcome.dropped, vec!["old_ttl".to_string()]);
    assert_eq!(outcome.created, vec!["run_events_createdAt_ttl".to_string()]);
}

#[rstest]
#[tokio::test]
async fn failed_drop_skips_the_create() {
    let mut catalog = MockIndexCatalog::new();
    catalog
        .expect_list_indexes()
        .returning(|_| Ok(vec![ttl_index("old_ttl", vec![asc("createdAt")], NINETY_DAYS)]));
    catalog.expect_drop_index().times(1).returning(|collection, name| {
        Err(DatabaseError::IndexNotFound { collection: collection.to_string(), name: name.to_string() })
    });
    catalog.expect_create_index().times(0);

    let result = ensure_ttl_index(&catalog, RUN_EVENTS_COLLECTION, &run_events_rule()).await;

    assert_matches!(
        result,
        Err(ReconcileError::DropIndex { source: DatabaseError::IndexNotFound { .. }, ref name, .. })
            if name == "old_ttl"
    );
}

#[rstest]
#[tokio::test]
async fn server_side_conflict_surfaces_as_create_error() {
    let mut catalog = MockIndexCatalog::new();
    catalog.expect_list_indexes().returning(|_| Ok(vec![]));
    catalog.expect_create_index().times(1).returning(|collection, spec| {
        Err(DatabaseError::IndexConflict {
            collection: collection.to_string(),
            message: format!("Index already exists with a different name: {}", spec.name),
        })
    });
    let weekly = CollectionSchema::new(WEEKLY_METRICS_COLLECTION)
        .index(IndexSpec::new("weekly_metrics_weekStart_unique", vec![asc("weekStart")]).unique());

    let result = reconcile_collection(&catalog, &weekly, ReconcileMode::Apply).await;

    assert_matches!(
        result,
        Err(ReconcileError::CreateIndex { source: DatabaseError::IndexConflict { .. }, ref collection, .. })
            if collection == WEEKLY_METRICS_COLLECTION
    );
}
