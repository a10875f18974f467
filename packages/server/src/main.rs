use std::error::Error;

use api::{BridgeConfig, init_bridge};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = BridgeConfig::from_env()?;
    let bridge = init_bridge(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str()).await?;
    tracing::info!("listening on {}", config.bind_addr);

    axum::serve(listener, server::router(&bridge))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    bridge.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
