//! Pure diff between the indexes a collection has and the ones its schema declares.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::schema::{CollectionSchema, TtlRule};
use crate::types::index::{format_keys, ExistingIndex, IndexSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Expiry index on the rule's field under a non-canonical name
    LegacyTtlName,
    /// Canonical expiry index whose duration or direction no longer matches the rule
    TtlDefinitionChanged,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::LegacyTtlName => write!(f, "conflicting TTL index"),
            DropReason::TtlDefinitionChanged => write!(f, "TTL definition changed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// The name is held by an index with a different definition
    NameTaken,
    /// The key pattern is already indexed under another name
    KeysTaken,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::NameTaken => write!(f, "name already used by a different index"),
            ConflictReason::KeysTaken => write!(f, "key pattern already indexed under another name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IndexAction {
    Keep { name: String },
    Create { spec: IndexSpec },
    Drop { index: ExistingIndex, reason: DropReason },
    Conflict { spec: IndexSpec, existing: ExistingIndex, reason: ConflictReason },
}

impl IndexAction {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, IndexAction::Keep { .. })
    }
}

impl fmt::Display for IndexAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexAction::Keep { name } => write!(f, "keep   {}", name),
            IndexAction::Create { spec } => write!(f, "create {}", spec),
            IndexAction::Drop { index, reason } => write!(f, "drop   {} ({})", index, reason),
            IndexAction::Conflict { spec, existing, reason } => {
                write!(f, "CONFLICT {} {} vs existing {} ({})", spec.name, format_keys(&spec.keys), existing, reason)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionPlan {
    pub collection: String,
    pub actions: Vec<IndexAction>,
    /// Indexes on the collection that the schema neither declares nor replaces. Left untouched.
    pub unmanaged: Vec<String>,
}

impl CollectionPlan {
    pub fn has_drift(&self) -> bool {
        self.actions.iter().any(IndexAction::is_mutation)
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &IndexAction> {
        self.actions.iter().filter(|action| matches!(action, IndexAction::Conflict { .. }))
    }
}

/// Plans one collection against a single listing of its indexes.
///
/// Static indexes come first (unique, then query-pattern), the expiry rule last,
/// which is also the order [`super::reconcile_collection`] applies them in.
pub fn plan_collection(schema: &CollectionSchema, existing: &[ExistingIndex]) -> CollectionPlan {
    let mut actions: Vec<IndexAction> =
        schema.ordered_indexes().into_iter().map(|spec| plan_index(spec, existing)).collect();
    if let Some(rule) = &schema.ttl {
        actions.extend(plan_ttl_index(rule, existing));
    }

    let mut touched: HashSet<&str> = schema.declared_names().into_iter().collect();
    for action in &actions {
        match action {
            IndexAction::Drop { index, .. } | IndexAction::Conflict { existing: index, .. } => {
                touched.insert(index.name.as_str());
            }
            IndexAction::Keep { .. } | IndexAction::Create { .. } => {}
        }
    }
    let unmanaged = existing
        .iter()
        .filter(|index| !index.is_default_id() && !touched.contains(index.name.as_str()))
        .map(|index| index.name.clone())
        .collect();

    CollectionPlan { collection: schema.name.clone(), actions, unmanaged }
}

/// A static index is kept when an identical one carries its name and created when
/// neither its name nor its key pattern is in use.
pub fn plan_index(spec: &IndexSpec, existing: &[ExistingIndex]) -> IndexAction {
    if let Some(found) = existing.iter().find(|index| index.name == spec.name) {
        return if found.matches(spec) {
            IndexAction::Keep { name: spec.name.clone() }
        } else {
            IndexAction::Conflict { spec: spec.clone(), existing: found.clone(), reason: ConflictReason::NameTaken }
        };
    }
    match existing.iter().find(|index| index.has_same_keys(&spec.keys)) {
        Some(found) => {
            IndexAction::Conflict { spec: spec.clone(), existing: found.clone(), reason: ConflictReason::KeysTaken }
        }
        None => IndexAction::Create { spec: spec.clone() },
    }
}

/// Expiry index actions for one rule.
///
/// Every single-field index on the rule's field that carries an expiry is a TTL
/// candidate. Candidates under another name are dropped; the canonical one is kept
/// when it matches the rule and dropped for recreation otherwise. A plain index on
/// the same field is never a candidate.
pub fn plan_ttl_index(rule: &TtlRule, existing: &[ExistingIndex]) -> Vec<IndexAction> {
    let desired = rule.index_spec();
    let mut actions = Vec::new();
    let mut canonical_present = false;

    for index in existing.iter().filter(|index| index.is_ttl_on(&rule.field)) {
        if index.name != rule.index_name {
            actions.push(IndexAction::Drop { index: index.clone(), reason: DropReason::LegacyTtlName });
        } else if index.matches(&desired) {
            canonical_present = true;
        } else {
            actions.push(IndexAction::Drop { index: index.clone(), reason: DropReason::TtlDefinitionChanged });
        }
    }

    if canonical_present {
        actions.push(IndexAction::Keep { name: desired.name });
        return actions;
    }

    let others: Vec<&ExistingIndex> = existing.iter().filter(|index| !index.is_ttl_on(&rule.field)).collect();
    if let Some(found) = others.iter().find(|index| index.name == desired.name) {
        actions.push(IndexAction::Conflict {
            spec: desired,
            existing: (*found).clone(),
            reason: ConflictReason::NameTaken,
        });
    } else if let Some(found) = others.iter().find(|index| index.has_same_keys(&desired.keys)) {
        actions.push(IndexAction::Conflict {
            spec: desired,
            existing: (*found).clone(),
            reason: ConflictReason::KeysTaken,
        });
    } else {
        actions.push(IndexAction::Create { spec: desired });
    }
    actions
}
