//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use spa_server::http::{PushError, Pusher};
use spa_server::{load_site, LoadMode, SiteManifest};
use tempfile::TempDir;

pub const DESCRIPTOR: &str = r#"{
    "configVersion": 1,
    "timestamp": 1589500800000,
    "index": "/index.html",
    "assetGroups": [
        {
            "name": "app",
            "installMode": "prefetch",
            "updateMode": "prefetch",
            "urls": ["/index.html", "/main.js", "/styles.css"]
        },
        {
            "name": "assets",
            "installMode": "lazy",
            "updateMode": "prefetch",
            "urls": ["/assets/logo.svg"],
            "patterns": ["/assets/**"]
        }
    ]
}"#;

pub const INDEX_HTML: &str = "<!doctype html><html><head><title>app</title></head><body></body></html>";
pub const APP_INDEX_HTML: &str = "<!doctype html><html><body>nested app</body></html>";
pub const STYLES_CSS: &str = "body { margin: 0; }\n";

/// Highly compressible script so compressed variants win.
pub fn main_js() -> String {
    "console.log('hello world');\n".repeat(200)
}

/// A web root with a descriptor, prefetched and lazy assets, and a nested app.
pub fn web_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_site(dir.path());
    dir
}

pub fn write_site(root: &Path) {
    fs::write(root.join("ngsw.json"), DESCRIPTOR).unwrap();
    fs::write(root.join("index.html"), INDEX_HTML).unwrap();
    fs::write(root.join("main.js"), main_js()).unwrap();
    fs::write(root.join("styles.css"), STYLES_CSS).unwrap();
    fs::write(root.join("favicon.ico"), [0u8, 0, 1, 0, 1, 0]).unwrap();
    fs::create_dir_all(root.join("assets")).unwrap();
    fs::write(root.join("assets/logo.svg"), "<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();
    fs::create_dir_all(root.join("app")).unwrap();
    fs::write(root.join("app/index.html"), APP_INDEX_HTML).unwrap();
    fs::write(root.join(".env"), "SECRET=1").unwrap();
}

/// Compile `root` in descriptor mode.
pub fn compile(root: &Path) -> Arc<SiteManifest> {
    Arc::new(load_site(root, LoadMode::Ngsw).unwrap())
}

/// Pusher recording every target it is asked to push.
#[derive(Debug, Clone, Default)]
pub struct RecordingPusher {
    pushed: Arc<Mutex<Vec<String>>>,
}

impl RecordingPusher {
    pub fn pushed(&self) -> Vec<String> {
        self.pushed.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.pushed.lock().unwrap().clear();
    }
}

impl Pusher for RecordingPusher {
    fn push(&self, target: &str) -> Result<(), PushError> {
        self.pushed.lock().unwrap().push(target.to_string());
        Ok(())
    }
}
