//! Angular service worker (`ngsw.json`) driven loading.
//!
//! # Responsibilities
//! - Parse the descriptor at `<web_root>/ngsw.json`
//! - Plan descriptor URLs in group-then-URL order with their install mode
//! - Add every other file under the web root as lazy
//!
//! # Design Decisions
//! - `patterns` and `updateMode` are accepted but not interpreted
//! - URLs are cleaned the same way filesystem URLs are and dedupe on their
//!   decoded form, so `/a%20b.txt` and `/a b.txt` name one file

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::load::{compile, filesystem, LoadError, PlannedAsset};
use crate::manifest::{url, Provenance, SiteManifest};

/// Descriptor file name, relative to the web root.
pub const DESCRIPTOR_FILE: &str = "ngsw.json";

/// Install/update eagerness of an asset group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    #[default]
    Prefetch,
    Lazy,
}

/// Root of an `ngsw.json` descriptor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub config_version: u32,
    #[serde(default)]
    pub timestamp: u64,
    pub index: String,
    #[serde(default)]
    pub asset_groups: Vec<AssetGroup>,
}

/// A named group of URLs sharing an install mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetGroup {
    pub name: String,
    #[serde(default)]
    pub install_mode: InstallMode,
    #[serde(default)]
    pub update_mode: Option<InstallMode>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Read and parse `<web_root>/ngsw.json`.
pub fn read_descriptor(web_root: &Path) -> Result<Descriptor, LoadError> {
    let path = web_root.join(DESCRIPTOR_FILE);
    let content = fs::read(&path).map_err(|e| LoadError::DescriptorIo {
        path: path.clone(),
        source: e,
    })?;
    serde_json::from_slice(&content).map_err(|e| LoadError::DescriptorParse { path, source: e })
}

/// Plan the assets for a descriptor: declared URLs first, then every
/// undeclared file under the web root as lazy.
pub fn plan(descriptor: &Descriptor, web_root: &Path) -> Result<Vec<PlannedAsset>, LoadError> {
    let mut seen = HashSet::new();
    let mut planned = Vec::new();

    for group in &descriptor.asset_groups {
        let lazy = group.install_mode == InstallMode::Lazy;
        for raw in &group.urls {
            let url = url::clean(raw);
            if !seen.insert(url::decode(&url).into_owned()) {
                continue;
            }
            planned.push(PlannedAsset {
                url,
                lazy,
                provenance: Provenance::Manifest,
            });
        }
    }

    for url in filesystem::discover(web_root)? {
        if !seen.insert(url::decode(&url).into_owned()) {
            continue;
        }
        planned.push(PlannedAsset {
            url,
            lazy: true,
            provenance: Provenance::Filesystem,
        });
    }

    Ok(planned)
}

/// Load a site described by `<web_root>/ngsw.json`.
pub fn load(web_root: &Path) -> Result<SiteManifest, LoadError> {
    let descriptor = read_descriptor(web_root)?;

    tracing::debug!(
        config_version = descriptor.config_version,
        timestamp = descriptor.timestamp,
        index = %descriptor.index,
        groups = descriptor.asset_groups.len(),
        "Descriptor parsed"
    );

    let planned = plan(&descriptor, web_root)?;
    compile(web_root, url::clean(&descriptor.index), planned)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"{
        "configVersion": 1,
        "timestamp": 1589500800000,
        "index": "/index.html",
        "assetGroups": [
            {
                "name": "app",
                "installMode": "prefetch",
                "updateMode": "prefetch",
                "urls": ["/index.html", "/main.js", "/styles.css"],
                "patterns": []
            },
            {
                "name": "assets",
                "installMode": "lazy",
                "updateMode": "prefetch",
                "urls": ["/assets/logo.svg", "/main.js"],
                "patterns": ["/assets/**"]
            }
        ]
    }"#;

    fn web_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join(DESCRIPTOR_FILE), DESCRIPTOR).unwrap();
        fs::write(root.join("index.html"), "<!doctype html><html></html>").unwrap();
        fs::write(root.join("main.js"), "console.log('app');").unwrap();
        fs::write(root.join("styles.css"), "body{}").unwrap();
        fs::write(root.join("favicon.ico"), [0u8, 0, 1, 0]).unwrap();
        fs::create_dir(root.join("assets")).unwrap();
        fs::write(root.join("assets/logo.svg"), "<svg/>").unwrap();
        dir
    }

    #[test]
    fn descriptor_urls_keep_install_mode() {
        let dir = web_root();
        let site = load(dir.path()).unwrap();

        let main = site.lookup("/main.js").unwrap();
        assert!(!main.lazy, "first declaration wins");
        assert_eq!(main.provenance, Provenance::Manifest);

        let logo = site.lookup("/assets/logo.svg").unwrap();
        assert!(logo.lazy);
        assert_eq!(logo.provenance, Provenance::Manifest);
    }

    #[test]
    fn undeclared_files_are_lazy() {
        let dir = web_root();
        let site = load(dir.path()).unwrap();

        let favicon = site.lookup("/favicon.ico").unwrap();
        assert!(favicon.lazy);
        assert_eq!(favicon.provenance, Provenance::Filesystem);

        let descriptor = site.lookup("/ngsw.json").unwrap();
        assert!(descriptor.lazy);
        assert_eq!(site.len(), 6);
    }

    #[test]
    fn plan_order_is_groups_then_walk() {
        let dir = web_root();
        let descriptor = read_descriptor(dir.path()).unwrap();
        let urls: Vec<_> = plan(&descriptor, dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "/index.html",
                "/main.js",
                "/styles.css",
                "/assets/logo.svg",
                "/favicon.ico",
                "/ngsw.json",
            ]
        );
    }

    #[test]
    fn index_comes_from_descriptor() {
        let dir = web_root();
        let site = load(dir.path()).unwrap();
        assert_eq!(site.index_url(), "/index.html");
    }

    #[test]
    fn missing_descriptor_aborts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::DescriptorIo { .. }));
    }

    #[test]
    fn malformed_descriptor_aborts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DESCRIPTOR_FILE), "{ not json").unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::DescriptorParse { .. }));
    }

    #[test]
    fn declared_but_missing_asset_aborts() {
        let dir = web_root();
        fs::remove_file(dir.path().join("styles.css")).unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::AssetNotFound { .. }));
    }

    #[test]
    fn encoded_descriptor_urls_match_walked_files() {
        let dir = web_root();
        fs::write(dir.path().join("my logo.png"), [0x89u8, b'P', b'N', b'G']).unwrap();
        let descriptor = Descriptor {
            config_version: 1,
            timestamp: 0,
            index: "/index.html".to_string(),
            asset_groups: vec![AssetGroup {
                name: "media".to_string(),
                install_mode: InstallMode::Prefetch,
                update_mode: None,
                urls: vec!["/my%20logo.png".to_string()],
                patterns: Vec::new(),
            }],
        };

        let planned = plan(&descriptor, dir.path()).unwrap();
        let logos: Vec<_> = planned.iter().filter(|p| p.url.contains("logo.png")).collect();
        assert_eq!(logos.len(), 1);
        assert!(!logos[0].lazy);
        assert_eq!(logos[0].provenance, Provenance::Manifest);
    }
}
