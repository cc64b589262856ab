use clap::Parser as _;
use dotenvy::dotenv;
use index_reconciler::cli::{Cli, Commands};
use index_reconciler::commands;
use index_reconciler::utils::logging::init_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Apply { apply_command } => {
            info!("Executing apply command");
            commands::apply(apply_command).await
        }
        Commands::Plan { plan_command } => {
            info!("Executing plan command");
            commands::plan(plan_command).await
        }
    };

    match result {
        Ok(report) => {
            info!(
                database = %report.database,
                collections = report.collections.len(),
                "Index reconciliation completed"
            );
        }
        Err(e) => {
            error!(
                error = %e,
                error_chain = ?e,
                "Index reconciliation failed"
            );
            std::process::exit(1);
        }
    }
}
