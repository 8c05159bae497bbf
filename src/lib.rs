//! SPA static-asset server library.
//!
//! Compiles a single-page application's web root into an immutable manifest
//! of precompressed assets, then serves it with conditional GET, encoding
//! negotiation and a push-once-per-checksum strategy, while tracking the
//! lifecycle of every connection.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load;
pub mod manifest;
pub mod net;
pub mod observability;

pub use config::schema::SpaConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load::{load_site, LoadError, LoadMode};
pub use manifest::SiteManifest;
pub use net::ConnectionRegistry;
