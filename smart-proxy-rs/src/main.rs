// smart-proxy-rs/src/main.rs
// Smart Proxy - LLM gateway entry point
// Port 8787 by default (SMART_PROXY_SERVICE_ADDR / SMART_PROXY_SERVICE_PORT)

use std::sync::Arc;

use config_rs::ProxyConfig;
use smart_proxy::SmartProxy;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ProxyConfig::from_env()?;
    let addr = config.bind_addr;

    tracing::info!("Local backend: {}", config.local_base_url);
    tracing::info!("Remote backend: {} (model {})", config.remote_base_url, config.remote_model);
    tracing::info!("Tools backend: {}", config.tools_base_url);
    if config.remote_secondary_api_key.is_some() {
        tracing::info!("Secondary remote key configured");
    }

    let proxy = Arc::new(SmartProxy::from_config(config)?);
    let app = proxy.create_router();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Smart Proxy listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Smart Proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
