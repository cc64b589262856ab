use serde::Serialize;

use super::plan::CollectionPlan;
use super::{CollectionOutcome, ReconcileMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub collection: String,
    pub plan: CollectionPlan,
    /// Present once the plan has been applied
    pub outcome: Option<CollectionOutcome>,
}

impl CollectionReport {
    /// Operator facing lines for this collection.
    pub fn progress_lines(&self) -> Vec<String> {
        match &self.outcome {
            Some(outcome) => {
                let mut lines: Vec<String> = outcome
                    .dropped
                    .iter()
                    .map(|name| format!("Dropped conflicting TTL index {} on {}.", name, self.collection))
                    .collect();
                lines.push(format!("{} indexes ensured.", self.collection));
                lines
            }
            None if !self.plan.has_drift() => vec![format!("{} indexes up to date.", self.collection)],
            None => {
                let mut lines = vec![format!("{} plan:", self.collection)];
                lines.extend(self.plan.actions.iter().filter(|a| a.is_mutation()).map(|a| format!("  {}", a)));
                lines
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub database: String,
    pub schema_version: u32,
    pub mode: ReconcileMode,
    pub collections: Vec<CollectionReport>,
}

impl ReconcileReport {
    pub fn new(database: &str, schema_version: u32, mode: ReconcileMode) -> Self {
        Self { database: database.to_string(), schema_version, mode, collections: Vec::new() }
    }

    /// Number of collections whose plan had pending changes when they were read
    pub fn drifted_collections(&self) -> usize {
        self.collections.iter().filter(|report| report.plan.has_drift()).count()
    }

    pub fn created(&self) -> usize {
        self.collections.iter().filter_map(|report| report.outcome.as_ref()).map(|o| o.created.len()).sum()
    }

    pub fn dropped(&self) -> usize {
        self.collections.iter().filter_map(|report| report.outcome.as_ref()).map(|o| o.dropped.len()).sum()
    }

    pub fn progress_lines(&self) -> Vec<String> {
        self.collections.iter().flat_map(CollectionReport::progress_lines).collect()
    }
}
