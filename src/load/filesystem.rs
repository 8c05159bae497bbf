//! Filesystem-driven loading.
//!
//! Every regular file under the web root becomes an asset. Entries whose
//! base name starts with `.` or `_` are private and skipped along with
//! everything below them.

use std::collections::HashSet;
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::load::{compile, LoadError, PlannedAsset};
use crate::manifest::{url, Provenance, SiteManifest};

/// Index page used when no descriptor declares one.
pub const DEFAULT_INDEX: &str = "/index.html";

/// Load every file under `web_root` as a prefetched asset.
pub fn load(web_root: &Path) -> Result<SiteManifest, LoadError> {
    let mut seen = HashSet::new();
    let planned = discover(web_root)?
        .into_iter()
        .filter(|u| seen.insert(u.clone()))
        .map(|url| PlannedAsset {
            url,
            lazy: false,
            provenance: Provenance::Filesystem,
        })
        .collect();

    compile(web_root, DEFAULT_INDEX.to_string(), planned)
}

/// URLs of every servable file under `web_root`, in lexical walk order.
pub fn discover(web_root: &Path) -> Result<Vec<String>, LoadError> {
    let mut urls = Vec::new();

    let walker = WalkDir::new(web_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_private(e));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(web_root)
            .map_err(|_| LoadError::InvalidUrl(entry.path().display().to_string()))?;
        urls.push(url::from_relative_path(relative));
    }

    Ok(urls)
}

fn is_private(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.') || name.starts_with('_'))
        .unwrap_or(false)
}
