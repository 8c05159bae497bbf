//! Site manifest subsystem.
//!
//! # Data Flow
//! ```text
//! URL (from ngsw.json or the filesystem walk)
//!     → asset.rs (resolve file, read bytes, fingerprint)
//!     → content_type.rs (extension lookup, sniffing, JS alias collapse)
//!     → encoder.rs (identity / gzip / deflate at best compression)
//!     → Asset (variants sorted smallest-first)
//!     → SiteManifest (priority order, checksum, URL index)
//! ```
//!
//! # Design Decisions
//! - Everything here is immutable once built and shared via Arc
//! - Asset order follows the critical rendering path: HTML, CSS, JavaScript, rest
//! - The checksum only depends on fingerprints and their order

pub mod asset;
pub mod content_type;
pub mod encoder;
pub mod url;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub use asset::build_asset;
pub use content_type::priority;

/// Content encodings an asset is precomputed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
}

impl ContentEncoding {
    /// Every encoding, in the order variants are produced.
    pub const ALL: [ContentEncoding; 3] = [
        ContentEncoding::Identity,
        ContentEncoding::Gzip,
        ContentEncoding::Deflate,
    ];

    /// Token used in `Accept-Encoding` / `Content-Encoding`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
        }
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an asset's URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Declared in the ngsw.json descriptor.
    Manifest,
    /// Discovered by walking the web root.
    Filesystem,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Manifest => f.write_str("manifest"),
            Provenance::Filesystem => f.write_str("filesystem"),
        }
    }
}

/// A single encoding of a single asset.
#[derive(Debug, Clone)]
pub struct EncodedVariant {
    pub encoding: ContentEncoding,
    pub bytes: Bytes,
}

impl EncodedVariant {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A loaded and encoded asset.
#[derive(Debug, Clone)]
pub struct Asset {
    /// Normalized absolute URL path, e.g. `/main.js`.
    pub url: String,
    /// File the bytes were read from.
    pub source_path: PathBuf,
    /// Installed on demand (true) or prefetched (false).
    pub lazy: bool,
    pub provenance: Provenance,
    pub last_modified: DateTime<Utc>,
    /// Lower-cased MIME type.
    pub content_type: String,
    /// base64(SHA-256) of the identity bytes. Served as the ETag.
    pub fingerprint: String,
    /// Sorted ascending by byte length. Exactly one identity entry.
    pub variants: Vec<EncodedVariant>,
}

impl Asset {
    /// Rendering-path priority of this asset's content type.
    pub fn priority(&self) -> u8 {
        priority(&self.content_type)
    }

    /// The uncompressed variant.
    pub fn identity(&self) -> Option<&EncodedVariant> {
        self.variants
            .iter()
            .find(|v| v.encoding == ContentEncoding::Identity)
    }
}

/// A compiled site: every asset, its lookup index and the aggregate checksum.
#[derive(Debug)]
pub struct SiteManifest {
    index_url: String,
    checksum: String,
    assets: Vec<Asset>,
    /// URL → position in `assets`.
    url_index: HashMap<String, usize>,
}

impl SiteManifest {
    /// Build a manifest from assets in discovery order.
    ///
    /// Sorts by rendering priority (stable), computes the checksum over the
    /// sorted fingerprints and builds the URL index, aliasing a directory to
    /// its `index.html` when the directory has no entry of its own. The index
    /// is keyed by percent-decoded URLs.
    pub fn new(index_url: impl Into<String>, mut assets: Vec<Asset>) -> Self {
        assets.sort_by_key(Asset::priority);

        let checksum = checksum(assets.iter().map(|a| a.fingerprint.as_str()));

        let mut url_index = HashMap::with_capacity(assets.len() + 1);
        for (i, asset) in assets.iter().enumerate() {
            url_index.entry(url::decode(&asset.url).into_owned()).or_insert(i);
        }

        for (i, asset) in assets.iter().enumerate() {
            if url::base_name(&asset.url) != "index.html" {
                continue;
            }
            let dir = url::parent_dir(&asset.url);
            url_index.entry(url::decode(dir).into_owned()).or_insert(i);
        }

        Self {
            index_url: index_url.into(),
            checksum,
            assets,
            url_index,
        }
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Assets in priority order.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Resolve a percent-decoded URL path, including directory aliases.
    pub fn lookup(&self, url: &str) -> Option<&Asset> {
        self.url_index.get(url).map(|&i| &self.assets[i])
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// base64(SHA-256) over the given fingerprints, fed in order.
pub fn checksum<'a>(fingerprints: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for fingerprint in fingerprints {
        hasher.update(fingerprint.as_bytes());
    }
    BASE64.encode(hasher.finalize())
}
