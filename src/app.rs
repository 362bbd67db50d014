use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::domain::error::{AppError, Result};
use crate::infrastructure::bootstrap::build_state;
use crate::infrastructure::config::AppConfig;
use crate::interfaces::http::start_server;

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.log_level);

    let state = build_state(&config).await?;
    let server = start_server(&config.server, state)
        .map_err(|e| AppError::IoError(format!("Failed to bind HTTP server: {}", e)))?;

    info!(
        host = %config.server.host,
        port = config.server.port,
        "Equipment API listening"
    );
    server.await?;
    Ok(())
}
