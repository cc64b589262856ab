pub mod error;
pub mod mongodb;

use async_trait::async_trait;

use crate::types::index::{ExistingIndex, IndexSpec};
pub use error::DatabaseError;

/// Index administration on the collections of one database.
///
/// This is the only boundary the reconciler talks to. Implementations must keep
/// the server's semantics: creating an index identical to an existing one is a
/// no-op, creating one that clashes by name or key pattern is an
/// [`DatabaseError::IndexConflict`], and listing a collection that does not
/// exist yields no indexes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexCatalog: Send + Sync {
    /// Name of the database the catalog operates on
    fn database_name(&self) -> &str;

    /// list_indexes - All indexes of a collection, the default `_id_` index included
    async fn list_indexes(&self, collection: &str) -> Result<Vec<ExistingIndex>, DatabaseError>;

    /// create_index - Create one index on a collection
    async fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<(), DatabaseError>;

    /// drop_index - Drop an index by name
    async fn drop_index(&self, collection: &str, name: &str) -> Result<(), DatabaseError>;
}
