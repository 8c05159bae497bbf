//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the site handler
//! - Wire up middleware (tracing, timeouts, request ID)
//! - Serve HTTP/1.1 and HTTP/2 per connection with hyper
//! - Feed connection lifecycle events into the registry
//! - Idle timeout and graceful drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::any, Router};
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tower::ServiceExt;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use crate::config::{SpaConfig, TimeoutConfig};
use crate::http::handler::{serve_site, AppState};
use crate::manifest::SiteManifest;
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::net::{ConnState, ConnectionActivity, ConnectionId, ConnectionRegistry};
use crate::observability::metrics;

/// HTTP server for the compiled site.
pub struct HttpServer {
    router: Router,
    registry: Arc<ConnectionRegistry>,
    timeouts: TimeoutConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(
        config: &SpaConfig,
        site: Arc<SiteManifest>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        let router = build_router(AppState::new(site), &config.timeouts);
        Self {
            router,
            registry,
            timeouts: config.timeouts.clone(),
        }
    }

    /// Replace the router, e.g. to add layers in front of the site handler.
    pub fn map_router(mut self, f: impl FnOnce(Router) -> Router) -> Self {
        self.router = f(self.router);
        self
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Run the server until `shutdown` fires, then drain open connections.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let (drain_tx, drain_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let conn = ConnectionTask {
                            router: self.router.clone(),
                            registry: Arc::clone(&self.registry),
                            timeouts: self.timeouts.clone(),
                            drain: drain_rx.clone(),
                            _permit: permit,
                        };
                        connections.spawn(conn.serve(stream, peer));
                    }
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                },
            }
        }

        let _ = drain_tx.send(true);
        let open = connections.len();
        let drained = tokio::time::timeout(self.timeouts.write(), async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => tracing::info!(connections = open, "Connections drained"),
            Err(_) => {
                tracing::warn!(
                    remaining = connections.len(),
                    live = self.registry.len(),
                    "Drain deadline passed, aborting connections"
                );
                connections.abort_all();
                // Aborted tasks drop their futures before join_next reports them.
                while connections.join_next().await.is_some() {}
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, timeouts: &TimeoutConfig) -> Router {
    Router::new()
        .route("/", any(serve_site))
        .route("/{*path}", any(serve_site))
        .with_state(state)
        .layer(TimeoutLayer::new(timeouts.write()))
        .layer(RequestBodyTimeoutLayer::new(timeouts.read()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
}

/// Everything one connection task owns.
struct ConnectionTask {
    router: Router,
    registry: Arc<ConnectionRegistry>,
    timeouts: TimeoutConfig,
    drain: watch::Receiver<bool>,
    _permit: ConnectionPermit,
}

impl ConnectionTask {
    async fn serve(mut self, stream: TcpStream, peer: SocketAddr) {
        let connection = ConnectionId::new();
        let context = match self.registry.accept(connection, peer) {
            Ok(context) => context,
            Err(e) => {
                tracing::error!(connection = %connection, peer = %peer, error = %e, "Connection tracking failed");
                return;
            }
        };

        let activity = Arc::new(ConnectionActivity::new(connection, Arc::clone(&self.registry)));
        activity.transition(ConnState::New);
        metrics::set_live_connections(self.registry.len());
        let closer = CloseOnDrop {
            activity: Arc::clone(&activity),
            registry: Arc::clone(&self.registry),
        };

        tracing::debug!(
            connection = %connection,
            connection_key = %context.key,
            peer = %peer,
            "Connection opened"
        );

        let router = self.router.clone();
        let requests = Arc::clone(&activity);
        let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
            let guard = requests.begin_request();
            request.extensions_mut().insert(context);
            let router = router.clone();
            async move {
                let response = router.oneshot(request).await;
                drop(guard);
                response
            }
        });

        let mut builder = Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.timeouts.read_header())
            .max_buf_size(self.timeouts.max_header_bytes);
        builder
            .http2()
            .timer(TokioTimer::new())
            .max_header_list_size(u32::try_from(self.timeouts.max_header_bytes).unwrap_or(u32::MAX));

        let conn = builder.serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        let idle_timeout = self.timeouts.idle();
        let mut closing = false;
        loop {
            let deadline = activity.idle_deadline(idle_timeout);
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(e) = result {
                        tracing::debug!(connection = %connection, error = %e, "Connection error");
                    }
                    break;
                }
                _ = tokio::time::sleep_until(deadline), if !closing => {
                    if activity.idle_expired(idle_timeout) {
                        tracing::debug!(connection = %connection, "Idle timeout");
                        conn.as_mut().graceful_shutdown();
                        closing = true;
                    }
                }
                _ = self.drain.changed(), if !closing => {
                    conn.as_mut().graceful_shutdown();
                    closing = true;
                }
            }
        }

        drop(closer);
        tracing::debug!(connection = %connection, connection_key = %context.key, "Connection closed");
    }
}

/// Logs `Closed` when the connection task ends, including when it is
/// aborted or unwinds.
struct CloseOnDrop {
    activity: Arc<ConnectionActivity>,
    registry: Arc<ConnectionRegistry>,
}

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.activity.close();
        metrics::set_live_connections(self.registry.len());
    }
}
