//! Command handlers behind the `apply` and `plan` subcommands.

use tracing::{info, warn};

use crate::cli::{ApplyCmd, PlanCmd};
use crate::core::client::database::mongodb::MongoIndexCatalog;
use crate::core::client::database::IndexCatalog;
use crate::error::{ReconcilerError, ReconcilerResult};
use crate::reconciler::{reconcile_schema, ReconcileMode, ReconcileReport};
use crate::types::params::{DatabaseArgs, SchemaArgs};

/// apply - Reconcile the selected collections against the database
pub async fn apply(apply_cmd: &ApplyCmd) -> ReconcilerResult<ReconcileReport> {
    let database_args = DatabaseArgs::try_from(apply_cmd.mongodb_args.clone())?;
    let schema_args = SchemaArgs::from(apply_cmd.schema_args.clone());
    let catalog = MongoIndexCatalog::new(&database_args).await?;

    let report = run(&catalog, &schema_args, ReconcileMode::Apply).await?;
    print_lines(&render_output(&report, apply_cmd.json)?);
    Ok(report)
}

/// plan - Show pending index changes without applying them
pub async fn plan(plan_cmd: &PlanCmd) -> ReconcilerResult<ReconcileReport> {
    let database_args = DatabaseArgs::try_from(plan_cmd.mongodb_args.clone())?;
    let schema_args = SchemaArgs::from(plan_cmd.schema_args.clone());
    let catalog = MongoIndexCatalog::new(&database_args).await?;

    let report = run(&catalog, &schema_args, ReconcileMode::DryRun).await?;
    print_lines(&render_output(&report, plan_cmd.json)?);
    check_drift(&report, plan_cmd.fail_on_drift)?;
    Ok(report)
}

/// Resolves the schema selection and reconciles it through `catalog`.
pub async fn run(
    catalog: &dyn IndexCatalog,
    schema_args: &SchemaArgs,
    mode: ReconcileMode,
) -> ReconcilerResult<ReconcileReport> {
    let schema = schema_args.resolve()?;
    let collections = schema.select(&schema_args.collections)?;
    info!(
        database = %catalog.database_name(),
        schema_version = schema.version,
        collections = collections.len(),
        %mode,
        "Reconciling indexes"
    );

    let report = reconcile_schema(catalog, schema.version, &collections, mode).await?;
    info!(
        created = report.created(),
        dropped = report.dropped(),
        drifted = report.drifted_collections(),
        "Reconciliation finished"
    );
    Ok(report)
}

pub fn check_drift(report: &ReconcileReport, fail_on_drift: bool) -> ReconcilerResult<()> {
    let drifted = report.drifted_collections();
    if drifted == 0 {
        return Ok(());
    }
    warn!(drifted, "Collections have pending index changes");
    if fail_on_drift {
        return Err(ReconcilerError::DriftDetected(drifted));
    }
    Ok(())
}

/// Everything a command writes to stdout: the database banner and progress lines,
/// or the report as a single JSON document.
pub fn render_output(report: &ReconcileReport, json: bool) -> ReconcilerResult<Vec<String>> {
    if json {
        return Ok(vec![serde_json::to_string_pretty(report)?]);
    }
    let mut lines = vec![format!("Using database: {}", report.database)];
    lines.extend(report.progress_lines());
    Ok(lines)
}

#[allow(clippy::print_stdout)]
fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}
