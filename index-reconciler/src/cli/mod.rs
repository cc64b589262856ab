use clap::{Args, Parser, Subcommand};

pub mod database;
pub mod schema;

#[derive(Parser, Debug)]
#[command(
    name = "index-reconciler",
    version,
    about = "Declares and reconciles the MongoDB indexes of the run tracking collections",
    long_about = "Brings every managed collection to exactly the indexes its schema declares: unique constraints, \
    query-pattern indexes and TTL expiry indexes. Conflicting legacy TTL indexes are replaced. Safe to re-run.",
    after_help = "Examples:\n  \
    index-reconciler plan --mongodb-database-name coach\n  \
    index-reconciler apply --mongodb-database-name coach\n  \
    index-reconciler apply --mongodb-database-name coach --collection run_events"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, drop and keep indexes until every collection matches the schema
    Apply {
        #[command(flatten)]
        apply_command: ApplyCmd,
    },
    /// Show what `apply` would change without touching the database
    Plan {
        #[command(flatten)]
        plan_command: PlanCmd,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ApplyCmd {
    #[clap(flatten)]
    pub mongodb_args: database::mongodb::MongoDBCliArgs,

    #[clap(flatten)]
    pub schema_args: schema::SchemaCliArgs,

    /// Print the report as JSON instead of progress lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlanCmd {
    #[clap(flatten)]
    pub mongodb_args: database::mongodb::MongoDBCliArgs,

    #[clap(flatten)]
    pub schema_args: schema::SchemaCliArgs,

    /// Print the report as JSON instead of progress lines
    #[arg(long)]
    pub json: bool,

    /// Exit with an error when any collection has pending changes
    #[arg(long)]
    pub fail_on_drift: bool,
}
