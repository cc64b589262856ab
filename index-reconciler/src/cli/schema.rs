use clap::Args;

/// Parameters selecting what part of the declared schema to reconcile.
#[derive(Debug, Clone, Args)]
pub struct SchemaCliArgs {
    /// Schema version to reconcile against. Defaults to the latest declared version.
    #[arg(env = "INDEX_RECONCILER_SCHEMA_VERSION", long, value_name = "VERSION")]
    pub schema_version: Option<u32>,

    /// Only reconcile this collection. May be repeated; defaults to every collection of the schema.
    #[arg(long = "collection", value_name = "NAME")]
    pub collections: Vec<String>,
}
