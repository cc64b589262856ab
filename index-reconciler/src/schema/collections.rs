//! Index declarations per schema version.
//!
//! Each version lists its collections in the order they are reconciled. Within a
//! collection, unique constraints are declared first, then the query-pattern
//! indexes, and the expiry rule last.
//!
//! Version 1:
//! - `run_events`: `{ runId: 1 }` unique, `{ status: 1, createdAt: -1 }`, TTL on `createdAt` (90 days)
//! - `feedback_events`: `{ sessionKey: 1 }` unique, `{ sessionDate: 1, receivedAt: -1 }`,
//!   `{ runId: 1, sessionDay: 1, receivedAt: -1 }`, TTL on `receivedAt` (180 days)
//! - `weekly_metrics`: `{ weekStart: 1 }` unique, `{ createdAt: -1 }`
//! - `plan_snapshots`: `{ runId: 1 }` unique, `{ weekStart: 1 }`, TTL on `createdAt` (365 days)
//! - `run_artifacts`: `{ runId: 1 }` unique, `{ createdAt: -1 }`

use super::constant::*;
use super::{CollectionSchema, SchemaVersion, TtlRule};
use crate::types::index::{asc, desc, IndexSpec};

pub fn schema_versions() -> Vec<SchemaVersion> {
    vec![version_1()]
}

fn version_1() -> SchemaVersion {
    SchemaVersion {
        version: 1,
        collections: vec![
            CollectionSchema::new(RUN_EVENTS_COLLECTION)
                .index(IndexSpec::new("run_events_runId_unique", vec![asc("runId")]).unique())
                .index(IndexSpec::new("run_events_status_createdAt", vec![asc("status"), desc("createdAt")]))
                .ttl(TtlRule::days("createdAt", "run_events_createdAt_ttl", RUN_EVENTS_RETENTION_DAYS)),
            CollectionSchema::new(FEEDBACK_EVENTS_COLLECTION)
                .index(IndexSpec::new("feedback_events_sessionKey_unique", vec![asc("sessionKey")]).unique())
                .index(IndexSpec::new(
                    "feedback_events_sessionDate_receivedAt",
                    vec![asc("sessionDate"), desc("receivedAt")],
                ))
                .index(IndexSpec::new(
                    "feedback_events_runId_sessionDay_receivedAt",
                    vec![asc("runId"), asc("sessionDay"), desc("receivedAt")],
                ))
                .ttl(TtlRule::days("receivedAt", "feedback_events_receivedAt_ttl", FEEDBACK_EVENTS_RETENTION_DAYS)),
            CollectionSchema::new(WEEKLY_METRICS_COLLECTION)
                .index(IndexSpec::new("weekly_metrics_weekStart_unique", vec![asc("weekStart")]).unique())
                .index(IndexSpec::new("weekly_metrics_createdAt_desc", vec![desc("createdAt")])),
            CollectionSchema::new(PLAN_SNAPSHOTS_COLLECTION)
                .index(IndexSpec::new("plan_snapshots_runId_unique", vec![asc("runId")]).unique())
                .index(IndexSpec::new("plan_snapshots_weekStart", vec![asc("weekStart")]))
                .ttl(TtlRule::days("createdAt", "plan_snapshots_createdAt_ttl", PLAN_SNAPSHOTS_RETENTION_DAYS)),
            CollectionSchema::new(RUN_ARTIFACTS_COLLECTION)
                .index(IndexSpec::new("run_artifacts_runId_unique", vec![asc("runId")]).unique())
                .index(IndexSpec::new("run_artifacts_createdAt_desc", vec![desc("createdAt")])),
        ],
    }
}
