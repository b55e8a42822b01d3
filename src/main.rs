use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use trans_unit_admin::config::Config;
use trans_unit_admin::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trans_unit_admin=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("Starting translation admin");

    // Load configuration from environment
    let config = Config::from_env()?;

    let state = AppState::from_config(&config).await?;
    if state.token_finder.is_some() {
        info!("Dev tools enabled, recording request tokens");
    }

    server::run_server(Arc::new(state), config.port).await
}
