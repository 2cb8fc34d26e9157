//! JSON API for browsing collected matches and triggering collection.
//!
//! Read endpoints are pure reads over the store; `POST /collect` runs one
//! collection cycle synchronously and returns its summary.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::collector::Collector;
use crate::config::Settings;
use crate::storage::Store;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    /// `None` when no API credential is configured; read endpoints still
    /// work, collection triggers answer 503.
    pub collector: Option<Arc<Collector>>,
    pub settings: Arc<Settings>,
}

/// Start the web server. The host may be an IP address or a name like
/// `localhost`; it is resolved before binding.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = resolve_addr(host, port).await?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn resolve_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| anyhow::anyhow!("no address found for {host}:{port}"))
}
