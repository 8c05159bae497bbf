//! SPA static-asset server.
//!
//! # Architecture Overview
//!
//! ```text
//!     startup (blocking pool)
//!     ┌────────────────────────────────────────────────────────┐
//!     │ web root ─▶ load (ngsw / filesystem) ─▶ manifest        │
//!     │            walk, encode, fingerprint    priority sort,  │
//!     │                                         checksum, index │
//!     └───────────────────────────┬────────────────────────────┘
//!                                 │ Arc<SiteManifest>
//!                                 ▼
//!     Client ─▶ net::listener ─▶ http::server ─▶ http::handler ─▶ Client
//!                    │               │           push, 304, negotiate
//!                    ▼               ▼
//!              net::tracker ◀── per-connection state log
//!                    │
//!                    ▼
//!              admin (status, manifest, connections)
//! ```

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use spa_server::admin::{serve_admin, AdminState};
use spa_server::config::{load_config, validate_config, ConfigError, SpaConfig};
use spa_server::lifecycle::signals::wait_for_signal;
use spa_server::lifecycle::startup::load_manifest;
use spa_server::net::Listener;
use spa_server::observability::{logging, metrics};
use spa_server::{ConnectionRegistry, HttpServer, LoadMode, Shutdown};

/// Serve a single-page application's static assets.
#[derive(Debug, Parser)]
#[command(name = "spa-server", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the application's files.
    #[arg(long)]
    web_root: Option<PathBuf>,

    /// How assets are discovered.
    #[arg(long, value_enum)]
    mode: Option<LoadMode>,

    /// Address to listen on, e.g. 0.0.0.0:8080.
    #[arg(long)]
    addr: Option<String>,
}

impl Cli {
    fn resolve(self) -> Result<SpaConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SpaConfig::default(),
        };

        if let Some(web_root) = self.web_root {
            config.site.web_root = web_root;
        }
        if let Some(mode) = self.mode {
            config.site.mode = mode;
        }
        if let Some(addr) = self.addr {
            config.listener.bind_address = addr;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Cli::parse().resolve()?;

    logging::init_logging(&config.observability.log_level)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "spa-server starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        web_root = %config.site.web_root.display(),
        mode = %config.site.mode,
        idle_secs = config.timeouts.idle_secs,
        write_secs = config.timeouts.write_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let site = load_manifest(&config.site).await?;
    let registry = Arc::new(ConnectionRegistry::new());
    let shutdown = Arc::new(Shutdown::new());

    let admin = if config.admin.enabled {
        let addr: SocketAddr = config.admin.bind_address.parse()?;
        let state = AdminState {
            site: Arc::clone(&site),
            registry: Arc::clone(&registry),
            api_key: Arc::from(config.admin.api_key.as_str()),
        };
        Some(tokio::spawn(serve_admin(addr, state, shutdown.subscribe())))
    } else {
        None
    };

    let listener = Listener::bind(&config.listener).await?;
    let server = HttpServer::new(&config, site, Arc::clone(&registry));
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let signals = Arc::clone(&shutdown);
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => {
                tracing::info!(signal = ?signal, "Signal received");
                signals.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for signals"),
        }
    });

    server_task.await??;
    shutdown.trigger();
    if let Some(admin) = admin {
        admin.await??;
    }

    tracing::info!(live_connections = registry.len(), "Shutdown complete");
    Ok(())
}
