//! Restodir Server - Main entry point

use anyhow::Result;
use restodir_common::logging::{init_logging, LogConfig};
use tracing::info;

use restodir_server::{config::Config, server};

#[tokio::main]
async fn main() -> Result<()> {
    // Make `.env` visible to the logging variables as well
    dotenvy::dotenv().ok();

    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("restodir-server")
        .filter_directives("restodir_server=debug,tower_http=debug,aws_config=info")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    info!("Starting Restodir Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    server::run(config).await
}
