//! HTTP surface over the gateway.

pub mod error;
pub mod handlers;
pub mod routes;

pub use error::AppError;

use crate::gateway::FileGateway;
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn FileGateway>,
}

impl AppState {
    pub fn new(gateway: impl FileGateway + 'static) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

/// Serves the API until Ctrl+C.
pub async fn serve(bind: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "ftp gateway listening");

    axum::serve(listener, routes::create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
