/// Collection name for run lifecycle events
pub const RUN_EVENTS_COLLECTION: &str = "run_events";

/// Collection name for post-session athlete feedback
pub const FEEDBACK_EVENTS_COLLECTION: &str = "feedback_events";

/// Collection name for weekly aggregated metrics, one document per week
pub const WEEKLY_METRICS_COLLECTION: &str = "weekly_metrics";

/// Collection name for generated training plan snapshots
pub const PLAN_SNAPSHOTS_COLLECTION: &str = "plan_snapshots";

/// Collection name for artifacts produced by a run
pub const RUN_ARTIFACTS_COLLECTION: &str = "run_artifacts";

pub const SECONDS_PER_DAY: u64 = 60 * 60 * 24;

pub const RUN_EVENTS_RETENTION_DAYS: u64 = 90;
pub const FEEDBACK_EVENTS_RETENTION_DAYS: u64 = 180;
pub const PLAN_SNAPSHOTS_RETENTION_DAYS: u64 = 365;
