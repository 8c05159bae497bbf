//! Asset construction.
//!
//! # Responsibilities
//! - Resolve a URL to a file under the web root
//! - Read the file once and derive every encoded variant from those bytes
//! - Fingerprint the uncompressed content (the ETag)
//! - Classify the content type
//!
//! # Design Decisions
//! - Any failure aborts the whole site load; there are no partial assets
//! - Variants are sorted smallest-first so negotiation can take the first match

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::load::LoadError;
use crate::manifest::{content_type, encoder, Asset, ContentEncoding, EncodedVariant, Provenance};

/// Build a single asset for `url` from the file under `web_root`.
pub fn build_asset(
    web_root: &Path,
    url: &str,
    lazy: bool,
    provenance: Provenance,
) -> Result<Asset, LoadError> {
    let source_path = resolve(web_root, url)?;

    let metadata = fs::metadata(&source_path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::AssetNotFound {
            url: url.to_string(),
            path: source_path.clone(),
        },
        _ => LoadError::Io {
            path: source_path.clone(),
            source: e,
        },
    })?;
    if metadata.is_dir() {
        return Err(LoadError::AssetNotFound {
            url: url.to_string(),
            path: source_path,
        });
    }
    let last_modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let raw = fs::read(&source_path).map_err(|e| LoadError::Io {
        path: source_path.clone(),
        source: e,
    })?;

    let content_type = content_type::detect(&source_path, &raw);
    let fingerprint = fingerprint(&raw);

    let mut variants = Vec::with_capacity(ContentEncoding::ALL.len());
    for encoding in ContentEncoding::ALL {
        let bytes = encoder::encode(encoding, &raw).map_err(|e| LoadError::Encode {
            url: url.to_string(),
            encoding,
            source: e,
        })?;
        variants.push(EncodedVariant {
            encoding,
            bytes: Bytes::from(bytes),
        });
    }
    variants.sort_by_key(EncodedVariant::len);

    Ok(Asset {
        url: url.to_string(),
        source_path,
        lazy,
        provenance,
        last_modified,
        content_type,
        fingerprint,
        variants,
    })
}

/// base64(SHA-256) of the uncompressed bytes.
pub fn fingerprint(raw: &[u8]) -> String {
    BASE64.encode(Sha256::digest(raw))
}

/// Join the percent-decoded URL segments onto the web root.
fn resolve(web_root: &Path, url: &str) -> Result<PathBuf, LoadError> {
    let decoded = urlencoding::decode(url).map_err(|_| LoadError::InvalidUrl(url.to_string()))?;

    let mut path = web_root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(LoadError::InvalidUrl(url.to_string())),
            s => path.push(s),
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_sorted_variants_with_one_identity() {
        let dir = tempfile::tempdir().unwrap();
        let body = "body { color: red; }\n".repeat(200);
        fs::write(dir.path().join("styles.css"), &body).unwrap();

        let asset = build_asset(dir.path(), "/styles.css", false, Provenance::Filesystem).unwrap();

        assert_eq!(asset.url, "/styles.css");
        assert_eq!(asset.content_type, "text/css");
        assert_eq!(asset.fingerprint, fingerprint(body.as_bytes()));
        assert_eq!(
            asset
                .variants
                .iter()
                .filter(|v| v.encoding == ContentEncoding::Identity)
                .count(),
            1
        );
        assert!(asset.variants.windows(2).all(|w| w[0].len() <= w[1].len()));
        assert_eq!(asset.identity().unwrap().bytes.as_ref(), body.as_bytes());
        assert_ne!(asset.variants[0].encoding, ContentEncoding::Identity);
    }

    #[test]
    fn tiny_files_keep_identity_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let asset = build_asset(dir.path(), "/a.txt", true, Provenance::Manifest).unwrap();
        assert_eq!(asset.variants[0].encoding, ContentEncoding::Identity);
        assert!(asset.lazy);
        assert_eq!(asset.provenance, Provenance::Manifest);
    }

    #[test]
    fn percent_encoded_urls_resolve() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("my assets")).unwrap();
        fs::write(dir.path().join("my assets").join("logo.svg"), "<svg/>").unwrap();

        let asset =
            build_asset(dir.path(), "/my%20assets/logo.svg", false, Provenance::Manifest).unwrap();
        assert_eq!(asset.source_path, dir.path().join("my assets").join("logo.svg"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_asset(dir.path(), "/missing.js", false, Provenance::Manifest).unwrap_err();
        assert!(matches!(err, LoadError::AssetNotFound { .. }));
    }
}
