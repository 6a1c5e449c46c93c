//! Server lifecycle
//!
//! Binds the HTTP listener, serves the API and shuts down gracefully on
//! Ctrl+C.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::api::{create_router, ApiState};
use crate::config::Config;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid listen address: {0}")]
    Address(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the gateway with the given configuration until Ctrl+C
pub async fn run_server(config: Config) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .map_err(|e| ServerError::Address(format!("{}:{}: {}", config.bind_address, config.port, e)))?;

    let listener = TcpListener::bind(addr).await?;
    serve(listener, config).await
}

/// Serve the API on an already-bound listener
pub async fn serve(listener: TcpListener, config: Config) -> Result<(), ServerError> {
    let state = ApiState::from_config(&config)?;
    let router = create_router(state);

    info!("Server running on {}", listener.local_addr()?);
    info!("Manifest gateway: {}", config.gateway_url);
    info!(
        "Link check gateway: {} (concurrency {}, on error: {:?})",
        config.check_gateway(),
        config.check_concurrency,
        config.on_check_error
    );
    if !config.display_quirk {
        warn!("Digest display quirk disabled; output differs from legacy clients");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_serve_health() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = Config {
            auth_key: "token".to_string(),
            ..Config::default()
        };

        let server = tokio::spawn(serve(listener, config));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let resp = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());

        server.abort();
    }

    #[tokio::test]
    async fn test_run_server_rejects_bad_address() {
        let config = Config {
            auth_key: "token".to_string(),
            bind_address: "not an address".to_string(),
            ..Config::default()
        };

        let err = run_server(config).await.unwrap_err();
        assert!(matches!(err, ServerError::Address(_)));
    }
}
