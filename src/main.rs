//! Weighing Lab (WeighLab)
//!
//! An MCP server for compound weighing, stock tracking, and label generation.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

use weighlab::build_info;
use weighlab::config::Config;
use weighlab::db;
use weighlab::mcp::WeighLabService;
use weighlab::service::WeighingService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("weighlab=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::log_startup_banner();

    let config = Config::from_env()?;
    let db_path = config.database_path.clone();
    info!(path = %db_path.display(), "Database path");

    // Ensure data directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = db::Database::open_migrated(&db_path)?;
    let version = database.with_conn(db::migrations::get_schema_version)?;
    info!(version, "Database schema ready");

    let weighing = WeighingService::from_config(database, &config)?;
    info!(
        concentration_unit = %config.concentration_unit,
        matrix_max_version = config.encoder.matrix_max_version,
        linear_max_chars = config.encoder.linear_max_chars,
        "Weighing service ready"
    );

    let service = WeighLabService::new(db_path, weighing);

    // Create stdio transport
    let transport = (stdin(), stdout());

    info!("Starting MCP server on stdio");
    let server = service.serve(transport).await?;

    // Wait for the server to complete
    server.waiting().await?;

    Ok(())
}
