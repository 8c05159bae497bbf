//! Site loading subsystem (the manifest compiler).
//!
//! # Data Flow
//! ```text
//! SiteConfig { web_root, mode }
//!     → ngsw.rs       (descriptor groups, then unlisted files as lazy)
//!     → filesystem.rs (walk the web root, every file prefetched)
//!     → URL list, deduplicated, discovery order
//!     → manifest::build_asset for each URL (in parallel)
//!     → SiteManifest::new (priority sort, checksum, URL index)
//! ```
//!
//! # Design Decisions
//! - The URL list is fixed before any asset is built, so parallel builds
//!   cannot change ordering or dedupe results
//! - First error aborts the load; a partial site is never published

pub mod filesystem;
pub mod ngsw;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::{build_asset, Asset, ContentEncoding, Provenance, SiteManifest};

/// Errors raised while compiling a site.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("web root {} is not a readable directory", .0.display())]
    WebRoot(PathBuf),

    #[error("failed to read descriptor {}: {source}", .path.display())]
    DescriptorIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed descriptor {}: {source}", .path.display())]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to walk web root: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid asset url {0:?}")]
    InvalidUrl(String),

    #[error("asset {url} not found at {}", .path.display())]
    AssetNotFound { url: String, path: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to {encoding} encode {url}: {source}")]
    Encode {
        url: String,
        encoding: ContentEncoding,
        #[source]
        source: io::Error,
    },
}

/// How the set of URLs is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// `ngsw.json` descriptor plus every other file as lazy.
    Ngsw,
    /// Every file under the web root, prefetched.
    #[default]
    Filesystem,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Ngsw => f.write_str("ngsw"),
            LoadMode::Filesystem => f.write_str("filesystem"),
        }
    }
}

impl FromStr for LoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ngsw" => Ok(LoadMode::Ngsw),
            "filesystem" => Ok(LoadMode::Filesystem),
            other => Err(format!("unsupported mode: {other} (try ngsw or filesystem)")),
        }
    }
}

/// A URL scheduled for building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAsset {
    pub url: String,
    pub lazy: bool,
    pub provenance: Provenance,
}

/// Compile the site under `web_root` with the given mode.
pub fn load_site(web_root: &Path, mode: LoadMode) -> Result<SiteManifest, LoadError> {
    if !web_root.is_dir() {
        return Err(LoadError::WebRoot(web_root.to_path_buf()));
    }

    let site = match mode {
        LoadMode::Ngsw => ngsw::load(web_root)?,
        LoadMode::Filesystem => filesystem::load(web_root)?,
    };

    tracing::info!(
        web_root = %web_root.display(),
        mode = %mode,
        index = %site.index_url(),
        checksum = %site.checksum(),
        assets = site.len(),
        "Site loaded"
    );
    for asset in site.assets() {
        tracing::debug!(
            lazy = asset.lazy,
            provenance = %asset.provenance,
            "{}@{} {}",
            asset.source_path.display(),
            asset.fingerprint,
            asset.content_type
        );
    }

    Ok(site)
}

/// Build every planned asset and assemble the manifest.
pub(crate) fn compile(
    web_root: &Path,
    index_url: String,
    planned: Vec<PlannedAsset>,
) -> Result<SiteManifest, LoadError> {
    let assets = planned
        .par_iter()
        .map(|p| build_asset(web_root, &p.url, p.lazy, p.provenance))
        .collect::<Result<Vec<Asset>, LoadError>>()?;

    Ok(SiteManifest::new(index_url, assets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses() {
        assert_eq!("ngsw".parse::<LoadMode>().unwrap(), LoadMode::Ngsw);
        assert_eq!("filesystem".parse::<LoadMode>().unwrap(), LoadMode::Filesystem);
        assert!("s3".parse::<LoadMode>().is_err());
    }

    #[test]
    fn missing_web_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_site(&dir.path().join("nope"), LoadMode::Filesystem).unwrap_err();
        assert!(matches!(err, LoadError::WebRoot(_)));
    }
}
