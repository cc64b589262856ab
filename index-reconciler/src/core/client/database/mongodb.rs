use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info};

use super::error::DatabaseError;
use super::IndexCatalog;
use crate::types::index::{keys_document, ExistingIndex, IndexDirection, IndexField, IndexSpec};
use crate::types::params::database::DatabaseArgs;

/// Server error codes the reconciler needs to tell apart.
const NAMESPACE_NOT_FOUND: i32 = 26;
const INDEX_NOT_FOUND: i32 = 27;
const INDEX_ALREADY_EXISTS: i32 = 68;
const INDEX_OPTIONS_CONFLICT: i32 = 85;
const INDEX_KEY_SPECS_CONFLICT: i32 = 86;

/// MongoDB backed [`IndexCatalog`]
pub struct MongoIndexCatalog {
    client: Client,
    database: Database,
}

impl MongoIndexCatalog {
    /// Connects and pings the server so that a bad URI fails before any index is touched.
    pub async fn new(config: &DatabaseArgs) -> Result<Self, DatabaseError> {
        let mut options = ClientOptions::parse(&config.connection_uri).await?;
        options.app_name = Some(config.app_name.clone());
        options.server_selection_timeout = Some(config.server_selection_timeout);
        options.connect_timeout = Some(config.server_selection_timeout);

        let client = Client::with_options(options)?;
        client.database("admin").run_command(doc! { "ping": 1 }, None).await?;
        info!(database = %config.database_name, "Connected to MongoDB");

        let database = client.database(&config.database_name);
        Ok(Self { client, database })
    }

    /// Mongodb client uses Arc internally, reducing the cost of clone.
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

#[async_trait]
impl IndexCatalog for MongoIndexCatalog {
    fn database_name(&self) -> &str {
        self.database.name()
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<ExistingIndex>, DatabaseError> {
        let cursor = match self.collection(collection).list_indexes(None).await {
            Ok(cursor) => cursor,
            Err(err) if is_missing_namespace(command_error_code(&err)) => {
                debug!(collection, "Collection does not exist yet, no indexes to list");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        let models: Vec<IndexModel> = cursor.try_collect().await?;
        models.into_iter().map(|model| existing_index_from_model(collection, model)).collect()
    }

    async fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<(), DatabaseError> {
        self.collection(collection)
            .create_index(index_model_for(spec), None)
            .await
            .map_err(|err| classify_error(collection, &spec.name, err))?;
        Ok(())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> Result<(), DatabaseError> {
        self.collection(collection).drop_index(name, None).await.map_err(|err| classify_error(collection, name, err))
    }
}

pub fn index_model_for(spec: &IndexSpec) -> IndexModel {
    let options = IndexOptions::builder()
        .name(spec.name.clone())
        .unique(spec.unique.then_some(true))
        .expire_after(spec.expire_after)
        .build();
    IndexModel::builder().keys(keys_document(&spec.keys)).options(options).build()
}

/// Converts an index description returned by `listIndexes`.
pub fn existing_index_from_model(collection: &str, model: IndexModel) -> Result<ExistingIndex, DatabaseError> {
    let invalid =
        |message: String| DatabaseError::InvalidIndexDescriptor { collection: collection.to_string(), message };

    let options = model.options.unwrap_or_default();
    let name = options.name.ok_or_else(|| invalid(format!("index on {} has no name", model.keys)))?;

    let mut keys = Vec::with_capacity(model.keys.len());
    for (field, value) in model.keys.iter() {
        let direction = IndexDirection::from_bson(value)
            .ok_or_else(|| invalid(format!("index {} has unsupported key value {} for {}", name, value, field)))?;
        keys.push(IndexField { field: field.clone(), direction });
    }

    Ok(ExistingIndex { name, keys, unique: options.unique.unwrap_or(false), expire_after: options.expire_after })
}

fn command_error_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command_error) => Some(command_error.code),
        _ => None,
    }
}

/// Listing indexes of a collection that was never created fails with this code.
fn is_missing_namespace(code: Option<i32>) -> bool {
    code == Some(NAMESPACE_NOT_FOUND)
}

fn classify_error(collection: &str, index_name: &str, err: mongodb::error::Error) -> DatabaseError {
    let code = command_error_code(&err);
    classify_code(code, collection, index_name, err)
}

fn classify_code(code: Option<i32>, collection: &str, index_name: &str, err: mongodb::error::Error) -> DatabaseError {
    match code {
        Some(INDEX_ALREADY_EXISTS | INDEX_OPTIONS_CONFLICT | INDEX_KEY_SPECS_CONFLICT) => {
            DatabaseError::IndexConflict { collection: collection.to_string(), message: err.to_string() }
        }
        Some(INDEX_NOT_FOUND) => {
            DatabaseError::IndexNotFound { collection: collection.to_string(), name: index_name.to_string() }
        }
        _ => DatabaseError::MongoError(err),
    }
}
