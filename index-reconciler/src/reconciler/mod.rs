//! Index reconciliation.
//!
//! Brings the indexes of each managed collection in line with its
//! [`CollectionSchema`]: unique constraints first, then query-pattern indexes,
//! then the expiry index through [`ensure_ttl_index`]. Every operation goes
//! through an explicit [`IndexCatalog`] handle. Failures abort the run where
//! they happen; whatever was applied before stays applied and a re-run picks up
//! from there.

pub mod plan;
pub mod report;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use self::plan::{plan_collection, plan_ttl_index, ConflictReason, IndexAction};
pub use self::report::{CollectionReport, ReconcileReport};
use crate::core::client::database::{DatabaseError, IndexCatalog};
use crate::schema::{CollectionSchema, TtlRule};
use crate::types::index::{format_keys, ExistingIndex, IndexSpec};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to list indexes on {collection}: {source}")]
    ListIndexes { collection: String, source: DatabaseError },

    #[error("Failed to create index {name} on {collection}: {source}")]
    CreateIndex { collection: String, name: String, source: DatabaseError },

    #[error("Failed to drop index {name} on {collection}: {source}")]
    DropIndex { collection: String, name: String, source: DatabaseError },

    #[error("Index {name} on {collection} conflicts with existing index {existing}: {reason}")]
    IndexConflict { collection: String, name: String, existing: String, reason: ConflictReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReconcileMode {
    /// List, plan and mutate
    Apply,
    /// List and plan only
    DryRun,
}

/// Index names touched by an applied run on one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionOutcome {
    pub created: Vec<String>,
    pub dropped: Vec<String>,
    pub kept: Vec<String>,
}

impl CollectionOutcome {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.dropped.is_empty()
    }

    fn merge(&mut self, other: CollectionOutcome) {
        self.created.extend(other.created);
        self.dropped.extend(other.dropped);
        self.kept.extend(other.kept);
    }
}

/// Ensures `collection` carries exactly one expiry index on `rule.field`, under `rule.index_name`.
///
/// Lists the collection's indexes, drops every single-field expiry index on the
/// field that is not the canonical one (or is canonical but out of date), then
/// creates the canonical index unless an identical one is already there.
/// Drop and create are separate calls: a failure in between leaves the field
/// without an expiry index until the next run.
#[instrument(skip_all, fields(collection = %collection, field = %rule.field))]
pub async fn ensure_ttl_index(
    catalog: &dyn IndexCatalog,
    collection: &str,
    rule: &TtlRule,
) -> Result<CollectionOutcome, ReconcileError> {
    let existing = list_indexes(catalog, collection).await?;
    let actions = plan_ttl_index(rule, &existing);
    execute_actions(catalog, collection, &actions).await
}

/// Plans one collection and, in [`ReconcileMode::Apply`], executes the plan.
///
/// A conflict anywhere in the plan aborts before the collection is touched.
/// Otherwise static indexes are applied from the plan and the expiry rule goes
/// through [`ensure_ttl_index`], which re-reads the collection's indexes.
#[instrument(skip_all, fields(collection = %schema.name))]
pub async fn reconcile_collection(
    catalog: &dyn IndexCatalog,
    schema: &CollectionSchema,
    mode: ReconcileMode,
) -> Result<CollectionReport, ReconcileError> {
    let existing = list_indexes(catalog, &schema.name).await?;
    let plan = plan_collection(schema, &existing);
    for name in &plan.unmanaged {
        debug!(index = %name, "Leaving index not declared by the schema untouched");
    }

    let outcome = match mode {
        ReconcileMode::DryRun => None,
        ReconcileMode::Apply => {
            if let Some(IndexAction::Conflict { spec, existing, reason }) = plan.conflicts().next() {
                return Err(conflict_error(&schema.name, spec, existing, *reason));
            }
            // plan_collection emits exactly one action per static index before the expiry actions
            let static_actions = &plan.actions[..schema.indexes.len()];
            let mut outcome = execute_actions(catalog, &schema.name, static_actions).await?;
            if let Some(rule) = &schema.ttl {
                outcome.merge(ensure_ttl_index(catalog, &schema.name, rule).await?);
            }
            info!(created = outcome.created.len(), dropped = outcome.dropped.len(), "Collection indexes ensured");
            Some(outcome)
        }
    };

    Ok(CollectionReport { collection: schema.name.clone(), plan, outcome })
}

/// Reconciles collections one after another, in the given order, stopping at the first failure.
#[instrument(skip_all, fields(database = %catalog.database_name(), schema_version = schema_version, mode = %mode))]
pub async fn reconcile_schema(
    catalog: &dyn IndexCatalog,
    schema_version: u32,
    collections: &[&CollectionSchema],
    mode: ReconcileMode,
) -> Result<ReconcileReport, ReconcileError> {
    let mut report = ReconcileReport::new(catalog.database_name(), schema_version, mode);
    for schema in collections {
        let collection_report = reconcile_collection(catalog, schema, mode).await?;
        report.collections.push(collection_report);
    }
    Ok(report)
}

async fn list_indexes(catalog: &dyn IndexCatalog, collection: &str) -> Result<Vec<ExistingIndex>, ReconcileError> {
    catalog
        .list_indexes(collection)
        .await
        .map_err(|source| ReconcileError::ListIndexes { collection: collection.to_string(), source })
}

async fn execute_actions(
    catalog: &dyn IndexCatalog,
    collection: &str,
    actions: &[IndexAction],
) -> Result<CollectionOutcome, ReconcileError> {
    let mut outcome = CollectionOutcome::default();
    for action in actions {
        match action {
            IndexAction::Keep { name } => {
                debug!(index = %name, "Index already present");
                outcome.kept.push(name.clone());
            }
            IndexAction::Drop { index, reason } => {
                warn!(index = %index.name, keys = %format_keys(&index.keys), %reason, "Dropping index");
                catalog.drop_index(collection, &index.name).await.map_err(|source| ReconcileError::DropIndex {
                    collection: collection.to_string(),
                    name: index.name.clone(),
                    source,
                })?;
                outcome.dropped.push(index.name.clone());
            }
            IndexAction::Create { spec } => {
                info!(index = %spec.name, keys = %format_keys(&spec.keys), "Creating index");
                catalog.create_index(collection, spec).await.map_err(|source| ReconcileError::CreateIndex {
                    collection: collection.to_string(),
                    name: spec.name.clone(),
                    source,
                })?;
                outcome.created.push(spec.name.clone());
            }
            IndexAction::Conflict { spec, existing, reason } => {
                return Err(conflict_error(collection, spec, existing, *reason));
            }
        }
    }
    Ok(outcome)
}

fn conflict_error(
    collection: &str,
    spec: &IndexSpec,
    existing: &ExistingIndex,
    reason: ConflictReason,
) -> ReconcileError {
    error!(index = %spec.name, existing = %existing, %reason, "Index conflicts with an existing index");
    ReconcileError::IndexConflict {
        collection: collection.to_string(),
        name: spec.name.clone(),
        existing: existing.to_string(),
        reason,
    }
}
