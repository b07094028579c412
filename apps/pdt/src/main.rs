mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::ConnectionConfig;
use pdt_engine::{
    Dialect, FileTriggerValueStore, PostgresWarehouse, Regenerator, RunContext, ViewDeclaration,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pdt")]
#[command(
    about = "Regenerate persisted derived tables whose trigger queries report new values",
    long_about = None
)]
struct Args {
    /// Path to the connections YAML file
    #[arg(short, long, default_value = "connections.yml")]
    connections: PathBuf,

    /// Directory containing view declaration YAML files
    #[arg(short, long, default_value = "views")]
    views: PathBuf,

    /// Directory holding per-connection trigger value state
    #[arg(long, default_value = ".pdt-state")]
    state_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let connections =
        config::load_connections(&args.connections).context("Failed to load connections")?;
    let (file_count, declarations) =
        config::load_view_declarations(&args.views).context("Failed to load view declarations")?;
    info!(
        files = file_count,
        views = declarations.len(),
        connections = connections.len(),
        "Loaded view declarations"
    );

    for connection in &connections {
        info!(connection = %connection.name, "Starting regeneration run");
        if let Err(e) = run_connection(connection, declarations.clone(), &args.state_dir).await {
            error!(connection = %connection.name, error = %e, "Regeneration run failed");
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn run_connection(
    connection: &ConnectionConfig,
    declarations: Vec<ViewDeclaration>,
    state_dir: &Path,
) -> Result<()> {
    let dialect = Dialect::from_name(&connection.dialect)?;
    let ctx = RunContext::new(declarations, dialect)?;

    let mut warehouse = PostgresWarehouse::connect(&connection.postgres_config(), dialect)
        .await
        .context(format!("Failed to connect to '{}'", connection.name))?;
    let mut store =
        FileTriggerValueStore::open(state_dir.join(format!("{}.json", connection.name)))?;

    let summary = Regenerator::new(&ctx, &mut warehouse, &mut store)?
        .run()
        .await?;
    info!(
        connection = %connection.name,
        regenerated = summary.regenerated_count(),
        skipped = summary.skipped_count(),
        "Regeneration run complete"
    );
    Ok(())
}
