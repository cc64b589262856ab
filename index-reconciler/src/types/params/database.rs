use std::time::Duration;

use crate::cli::database::mongodb::MongoDBCliArgs;
use crate::error::ReconcilerError;

/// Characters MongoDB rejects in database names.
const FORBIDDEN_DATABASE_NAME_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$'];

/// Validated MongoDB parameters
#[derive(Debug, Clone)]
pub struct DatabaseArgs {
    pub connection_uri: String,
    pub database_name: String,
    pub app_name: String,
    pub server_selection_timeout: Duration,
}

impl TryFrom<MongoDBCliArgs> for DatabaseArgs {
    type Error = ReconcilerError;

    fn try_from(args: MongoDBCliArgs) -> Result<Self, Self::Error> {
        let connection_uri = args.mongodb_connection_url.trim().to_string();
        if !(connection_uri.starts_with("mongodb://") || connection_uri.starts_with("mongodb+srv://")) {
            return Err(ReconcilerError::DatabaseInvalidURIError(connection_uri));
        }

        let database_name = args.mongodb_database_name.trim().to_string();
        if database_name.is_empty() {
            return Err(ReconcilerError::ConfigError("database name must not be empty".to_string()));
        }
        if let Some(c) = database_name.chars().find(|c| FORBIDDEN_DATABASE_NAME_CHARS.contains(c)) {
            return Err(ReconcilerError::ConfigError(format!(
                "database name {:?} contains forbidden character {:?}",
                database_name, c
            )));
        }

        if args.mongodb_server_selection_timeout_secs == 0 {
            return Err(ReconcilerError::ConfigError("server selection timeout must be at least 1 second".to_string()));
        }

        Ok(Self {
            connection_uri,
            database_name,
            app_name: args.mongodb_app_name,
            server_selection_timeout: Duration::from_secs(args.mongodb_server_selection_timeout_secs),
        })
    }
}
