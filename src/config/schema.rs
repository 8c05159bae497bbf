//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::load::LoadMode;

/// Root configuration for the SPA server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SpaConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Which site to serve and how to discover it.
    pub site: SiteConfig,

    /// Transport timeouts and limits.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Site configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory holding every servable file.
    pub web_root: PathBuf,

    /// Asset discovery mode.
    pub mode: LoadMode,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            web_root: PathBuf::from("."),
            mode: LoadMode::default(),
        }
    }
}

/// Timeout configuration for the HTTP transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Close a keep-alive connection after this long without a request.
    pub idle_secs: u64,

    /// Deadline for reading a request body.
    pub read_secs: u64,

    /// Deadline for reading request headers (HTTP/1).
    pub read_header_secs: u64,

    /// Deadline for producing a response.
    pub write_secs: u64,

    /// Upper bound on request header size.
    pub max_header_bytes: usize,
}

impl TimeoutConfig {
    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn read_header(&self) -> Duration {
        Duration::from_secs(self.read_header_secs)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            idle_secs: 60,
            read_secs: 30,
            read_header_secs: 5,
            write_secs: 30,
            max_header_bytes: 1 << 20,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin diagnostics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin listener.
    pub enabled: bool,

    /// API key for authentication (Bearer token). Required when enabled.
    pub api_key: String,

    /// Admin listener bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
