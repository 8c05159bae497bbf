//! Startup orchestration.
//!
//! # Responsibilities
//! - Compile the site before any listener is bound
//! - Keep the async runtime responsive while assets are compressed
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Compilation runs on the blocking pool; rayon parallelizes inside it

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::SiteConfig;
use crate::load::{load_site, LoadError};
use crate::manifest::SiteManifest;

/// Error type for startup.
#[derive(Debug)]
pub enum StartupError {
    /// The site could not be compiled.
    Load(LoadError),
    /// The compile task panicked or was cancelled.
    Join(tokio::task::JoinError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Load(e) => write!(f, "Failed to load site: {}", e),
            StartupError::Join(e) => write!(f, "Site compilation task failed: {}", e),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::Load(e) => Some(e),
            StartupError::Join(e) => Some(e),
        }
    }
}

impl From<LoadError> for StartupError {
    fn from(e: LoadError) -> Self {
        StartupError::Load(e)
    }
}

/// Compile the configured site on a blocking thread.
pub async fn load_manifest(site: &SiteConfig) -> Result<Arc<SiteManifest>, StartupError> {
    let web_root: PathBuf = site.web_root.clone();
    let mode = site.mode;
    let started = Instant::now();

    let manifest = tokio::task::spawn_blocking(move || load_site(&web_root, mode))
        .await
        .map_err(StartupError::Join)??;

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        assets = manifest.len(),
        "Site compiled"
    );
    Ok(Arc::new(manifest))
}
