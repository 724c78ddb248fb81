//! Admin diagnostics API.
//!
//! Read-only views of the aggregate. Every handler reads through the
//! aggregator lock, so responses are consistent with the exported gauges.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::aggregator::ClusterState;
use self::handlers::*;

pub fn setup_admin_router(state: Arc<ClusterState>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/records", get(get_records))
        .route("/admin/errors", get(get_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until shutdown.
pub async fn serve_admin(
    listener: TcpListener,
    state: Arc<ClusterState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
