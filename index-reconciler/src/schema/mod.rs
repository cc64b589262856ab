//! Declarative index schema.
//!
//! The desired state of every managed collection lives in a versioned table
//! ([`collections::schema_versions`]). The reconciler diffs a collection's
//! current indexes against one entry of that table.

pub mod collections;
pub mod constant;

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

use self::constant::SECONDS_PER_DAY;
use crate::types::index::{asc, IndexSpec};

pub use collections::schema_versions;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unknown schema version {requested}, latest is {latest}")]
    UnknownVersion { requested: u32, latest: u32 },

    #[error("Collection {0} is not managed by schema version {1}")]
    UnknownCollection(String, u32),

    #[error("Index name {name} is declared twice on {collection}")]
    DuplicateIndexName { collection: String, name: String },

    #[error("Index {name} on {collection} has no key fields")]
    EmptyKeys { collection: String, name: String },

    #[error("Expiry rule {name} on {collection} must have a non-zero duration")]
    ZeroExpiry { collection: String, name: String },

    #[error("Index {name} on {collection} uses the key pattern of the expiry index")]
    TtlKeyShadowed { collection: String, name: String },

    #[error("No schema versions are declared")]
    NoVersions,
}

/// Time-based expiry declared on a single timestamp field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlRule {
    pub field: String,
    pub index_name: String,
    pub expire_after: Duration,
}

impl TtlRule {
    pub fn new(field: &str, index_name: &str, expire_after: Duration) -> Self {
        Self { field: field.to_string(), index_name: index_name.to_string(), expire_after }
    }

    pub fn days(field: &str, index_name: &str, days: u64) -> Self {
        Self::new(field, index_name, Duration::from_secs(days * SECONDS_PER_DAY))
    }

    /// The canonical index this rule stands for: ascending on the field, canonical name and expiry.
    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec::new(&self.index_name, vec![asc(&self.field)]).expire_after(self.expire_after)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub indexes: Vec<IndexSpec>,
    pub ttl: Option<TtlRule>,
}

impl CollectionSchema {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), indexes: Vec::new(), ttl: None }
    }

    pub fn index(mut self, spec: IndexSpec) -> Self {
        self.indexes.push(spec);
        self
    }

    pub fn ttl(mut self, rule: TtlRule) -> Self {
        self.ttl = Some(rule);
        self
    }

    /// Static indexes in execution order: unique constraints, then query-pattern indexes.
    /// Declaration order is kept within a role.
    pub fn ordered_indexes(&self) -> Vec<&IndexSpec> {
        let mut ordered: Vec<&IndexSpec> = self.indexes.iter().collect();
        ordered.sort_by_key(|spec| spec.role());
        ordered
    }

    /// Names of every index this collection declares, the expiry index included.
    pub fn declared_names(&self) -> Vec<&str> {
        self.indexes
            .iter()
            .map(|spec| spec.name.as_str())
            .chain(self.ttl.iter().map(|rule| rule.index_name.as_str()))
            .collect()
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for name in self.declared_names() {
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateIndexName { collection: self.name.clone(), name: name.to_string() });
            }
        }
        for spec in &self.indexes {
            if spec.keys.is_empty() {
                return Err(SchemaError::EmptyKeys { collection: self.name.clone(), name: spec.name.clone() });
            }
        }
        if let Some(rule) = &self.ttl {
            if rule.expire_after.is_zero() {
                return Err(SchemaError::ZeroExpiry { collection: self.name.clone(), name: rule.index_name.clone() });
            }
            // A key pattern can be indexed only once per collection
            let ttl_keys = rule.index_spec().keys;
            if let Some(spec) = self.indexes.iter().find(|spec| spec.keys == ttl_keys) {
                return Err(SchemaError::TtlKeyShadowed { collection: self.name.clone(), name: spec.name.clone() });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersion {
    pub version: u32,
    pub collections: Vec<CollectionSchema>,
}

impl SchemaVersion {
    pub fn collection(&self, name: &str) -> Option<&CollectionSchema> {
        self.collections.iter().find(|collection| collection.name == name)
    }

    /// Collections to reconcile, in declaration order. An empty filter selects all of them.
    pub fn select(&self, names: &[String]) -> Result<Vec<&CollectionSchema>, SchemaError> {
        if let Some(unknown) = names.iter().find(|name| self.collection(name).is_none()) {
            return Err(SchemaError::UnknownCollection(unknown.clone(), self.version));
        }
        Ok(self
            .collections
            .iter()
            .filter(|collection| names.is_empty() || names.iter().any(|name| *name == collection.name))
            .collect())
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        self.collections.iter().try_for_each(CollectionSchema::validate)
    }
}

pub fn latest() -> Result<SchemaVersion, SchemaError> {
    schema_versions().into_iter().max_by_key(|schema| schema.version).ok_or(SchemaError::NoVersions)
}

pub fn find(version: u32) -> Result<SchemaVersion, SchemaError> {
    let versions = schema_versions();
    let latest = versions.iter().map(|schema| schema.version).max().ok_or(SchemaError::NoVersions)?;
    versions
        .into_iter()
        .find(|schema| schema.version == version)
        .ok_or(SchemaError::UnknownVersion { requested: version, latest })
}
