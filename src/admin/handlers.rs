use axum::{extract::State, http::header, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::admin::AdminState;
use crate::manifest::{ContentEncoding, Provenance};
use crate::net::connection::RecordSnapshot;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub index: String,
    pub checksum: String,
    pub assets: usize,
    pub live_connections: usize,
}

#[derive(Debug, Serialize)]
pub struct VariantSummary {
    pub encoding: ContentEncoding,
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct AssetSummary {
    pub url: String,
    pub content_type: String,
    pub fingerprint: String,
    pub lazy: bool,
    pub provenance: Provenance,
    pub last_modified: DateTime<Utc>,
    pub variants: Vec<VariantSummary>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        index: state.site.index_url().to_string(),
        checksum: state.site.checksum().to_string(),
        assets: state.site.len(),
        live_connections: state.registry.len(),
    })
}

/// Every asset in manifest order.
pub async fn get_manifest(State(state): State<AdminState>) -> Json<Vec<AssetSummary>> {
    let assets = state
        .site
        .assets()
        .iter()
        .map(|asset| AssetSummary {
            url: asset.url.clone(),
            content_type: asset.content_type.clone(),
            fingerprint: asset.fingerprint.clone(),
            lazy: asset.lazy,
            provenance: asset.provenance,
            last_modified: asset.last_modified,
            variants: asset
                .variants
                .iter()
                .map(|v| VariantSummary {
                    encoding: v.encoding,
                    size: v.len(),
                })
                .collect(),
        })
        .collect();

    Json(assets)
}

/// Text rendering of every live connection record.
pub async fn get_connections(State(state): State<AdminState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.registry.render(),
    )
}

pub async fn get_connections_json(State(state): State<AdminState>) -> Json<Vec<RecordSnapshot>> {
    Json(state.registry.snapshots())
}
