use clap::Args;

/// Parameters used to connect to MongoDB.
#[derive(Debug, Clone, Args)]
pub struct MongoDBCliArgs {
    /// The connection string to the MongoDB server.
    #[arg(env = "INDEX_RECONCILER_MONGODB_CONNECTION_URL", long, default_value = "mongodb://localhost:27017")]
    pub mongodb_connection_url: String,

    /// The name of the database holding the run tracking collections.
    #[arg(env = "INDEX_RECONCILER_DATABASE_NAME", long)]
    pub mongodb_database_name: String,

    /// Name reported to the server for this connection.
    #[arg(env = "INDEX_RECONCILER_MONGODB_APP_NAME", long, default_value = "index-reconciler")]
    pub mongodb_app_name: String,

    /// Seconds to wait for a reachable server before giving up.
    #[arg(env = "INDEX_RECONCILER_MONGODB_SERVER_SELECTION_TIMEOUT_SECS", long, default_value_t = 10)]
    pub mongodb_server_selection_timeout_secs: u64,
}
