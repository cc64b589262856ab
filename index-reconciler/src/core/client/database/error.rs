use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Mongo error: {0}")]
    MongoError(#[from] mongodb::error::Error),

    #[error("Index conflict on {collection}: {message}")]
    IndexConflict { collection: String, message: String },

    #[error("Index {name} not found on {collection}")]
    IndexNotFound { collection: String, name: String },

    #[error("Invalid index descriptor on {collection}: {message}")]
    InvalidIndexDescriptor { collection: String, message: String },
}
