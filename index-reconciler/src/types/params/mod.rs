pub mod database;
pub mod schema;

pub use database::DatabaseArgs;
pub use schema::SchemaArgs;
