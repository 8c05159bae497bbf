//! Admin diagnostics.
//!
//! A separate listener exposing the compiled site and the live connection
//! registry, protected by a bearer key.

pub mod auth;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::manifest::SiteManifest;
use crate::net::ConnectionRegistry;

use self::auth::admin_auth_middleware;
use self::handlers::{get_connections, get_connections_json, get_manifest, get_status};

/// State shared by the admin handlers.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub site: Arc<SiteManifest>,
    pub registry: Arc<ConnectionRegistry>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/manifest", get(get_manifest))
        .route("/admin/connections", get(get_connections))
        .route("/admin/connections.json", get(get_connections_json))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin router on `addr` until `shutdown` fires.
pub async fn serve_admin(
    addr: SocketAddr,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "Admin listener bound");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
