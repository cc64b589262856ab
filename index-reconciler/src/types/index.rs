use std::fmt;
use std::time::Duration;

use mongodb::bson::{Bson, Document};
use serde::{Serialize, Serializer};

/// Name MongoDB gives the implicit primary key index of every collection.
pub const DEFAULT_ID_INDEX_NAME: &str = "_id_";

/// Direction (or special type) of one key in an index key pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IndexDirection {
    Ascending,
    Descending,
    /// Non-ordered index types such as `"text"`, `"hashed"` or `"2dsphere"`.
    /// Read back from the server but never declared by the schema.
    Special(String),
}

impl IndexDirection {
    pub fn to_bson(&self) -> Bson {
        match self {
            IndexDirection::Ascending => Bson::Int32(1),
            IndexDirection::Descending => Bson::Int32(-1),
            IndexDirection::Special(kind) => Bson::String(kind.clone()),
        }
    }

    /// The server accepts any positive number as ascending and any negative one as descending.
    pub fn from_bson(value: &Bson) -> Option<Self> {
        let sign = match value {
            Bson::Int32(v) => *v as f64,
            Bson::Int64(v) => *v as f64,
            Bson::Double(v) => *v,
            Bson::String(kind) => return Some(IndexDirection::Special(kind.clone())),
            _ => return None,
        };
        if sign > 0.0 {
            Some(IndexDirection::Ascending)
        } else if sign < 0.0 {
            Some(IndexDirection::Descending)
        } else {
            None
        }
    }
}

impl fmt::Display for IndexDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexDirection::Ascending => write!(f, "1"),
            IndexDirection::Descending => write!(f, "-1"),
            IndexDirection::Special(kind) => write!(f, "\"{}\"", kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IndexField {
    pub field: String,
    pub direction: IndexDirection,
}

pub fn asc(field: &str) -> IndexField {
    IndexField { field: field.to_string(), direction: IndexDirection::Ascending }
}

pub fn desc(field: &str) -> IndexField {
    IndexField { field: field.to_string(), direction: IndexDirection::Descending }
}

/// Renders a key pattern the way the mongo shell shows it, e.g. `{status: 1, createdAt: -1}`.
pub fn format_keys(keys: &[IndexField]) -> String {
    let parts: Vec<String> = keys.iter().map(|k| format!("{}: {}", k.field, k.direction)).collect();
    format!("{{{}}}", parts.join(", "))
}

pub fn keys_document(keys: &[IndexField]) -> Document {
    let mut document = Document::new();
    for key in keys {
        document.insert(key.field.clone(), key.direction.to_bson());
    }
    document
}

/// Expiry in whole seconds, the unit `expireAfterSeconds` uses.
fn serialize_expire_after<S: Serializer>(expire_after: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    expire_after.map(|duration| duration.as_secs()).serialize(serializer)
}

/// Role of a declared index, which also fixes its position in a collection run:
/// unique constraints first, query-pattern indexes next, expiry indexes last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexRole {
    Unique,
    Query,
    Expiry,
}

/// A desired index as declared by the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<IndexField>,
    pub unique: bool,
    #[serde(
        rename = "expireAfterSeconds",
        serialize_with = "serialize_expire_after",
        skip_serializing_if = "Option::is_none"
    )]
    pub expire_after: Option<Duration>,
}

impl IndexSpec {
    pub fn new(name: &str, keys: Vec<IndexField>) -> Self {
        Self { name: name.to_string(), keys, unique: false, expire_after: None }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn expire_after(mut self, expire_after: Duration) -> Self {
        self.expire_after = Some(expire_after);
        self
    }

    pub fn role(&self) -> IndexRole {
        if self.unique {
            IndexRole::Unique
        } else if self.expire_after.is_some() {
            IndexRole::Expiry
        } else {
            IndexRole::Query
        }
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, format_keys(&self.keys))?;
        if self.unique {
            write!(f, " unique")?;
        }
        if let Some(expire_after) = self.expire_after {
            write!(f, " expireAfterSeconds={}", expire_after.as_secs())?;
        }
        Ok(())
    }
}

/// An index as currently present on a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingIndex {
    pub name: String,
    pub keys: Vec<IndexField>,
    pub unique: bool,
    #[serde(
        rename = "expireAfterSeconds",
        serialize_with = "serialize_expire_after",
        skip_serializing_if = "Option::is_none"
    )]
    pub expire_after: Option<Duration>,
}

impl ExistingIndex {
    pub fn default_id() -> Self {
        Self { name: DEFAULT_ID_INDEX_NAME.to_string(), keys: vec![asc("_id")], unique: false, expire_after: None }
    }

    pub fn is_default_id(&self) -> bool {
        self.name == DEFAULT_ID_INDEX_NAME
    }

    pub fn has_same_keys(&self, keys: &[IndexField]) -> bool {
        self.keys == keys
    }

    /// Structural equality with a declared index: same key pattern, uniqueness and expiry.
    pub fn matches(&self, spec: &IndexSpec) -> bool {
        self.has_same_keys(&spec.keys) && self.unique == spec.unique && self.expire_after == spec.expire_after
    }

    /// True for a single-field index on `field` carrying an expiry policy, whatever its direction.
    pub fn is_ttl_on(&self, field: &str) -> bool {
        self.expire_after.is_some() && self.keys.len() == 1 && self.keys[0].field == field
    }
}

impl From<&IndexSpec> for ExistingIndex {
    fn from(spec: &IndexSpec) -> Self {
        Self { name: spec.name.clone(), keys: spec.keys.clone(), unique: spec.unique, expire_after: spec.expire_after }
    }
}

impl fmt::Display for ExistingIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, format_keys(&self.keys))?;
        if self.unique {
            write!(f, " unique")?;
        }
        if let Some(expire_after) = self.expire_after {
            write!(f, " expireAfterSeconds={}", expire_after.as_secs())?;
        }
        Ok(())
    }
}
