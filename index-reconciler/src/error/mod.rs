use thiserror::Error;

use crate::core::client::database::DatabaseError;
use crate::reconciler::ReconcileError;
use crate::schema::SchemaError;

/// Result type for reconciler commands
pub type ReconcilerResult<T> = Result<T, ReconcilerError>;

/// Error types surfaced by the `index-reconciler` commands
#[derive(Error, Debug)]
pub enum ReconcilerError {
    #[error("Database error: {0}")]
    DatabaseCoreError(#[from] DatabaseError),

    #[error("Reconcile error: {0}")]
    ReconcileError(#[from] ReconcileError),

    #[error("Schema error: {0}")]
    SchemaError(#[from] SchemaError),

    /// Database error
    #[error("Database Invalid URI error: {0}")]
    DatabaseInvalidURIError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pending index changes found by a plan run with drift checking enabled
    #[error("Index drift detected in {0} collection(s)")]
    DriftDetected(usize),

    #[error("Failed to render report: {0}")]
    ReportError(#[from] serde_json::Error),
}
