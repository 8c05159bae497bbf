//! Site request handler.
//!
//! Every request runs the push step, then resolves and serves an asset,
//! then emits one access record.
//!
//! ```text
//! request
//!     → push::push_assets (page loads only, push-capable transports only)
//!     → SiteManifest::lookup → 404
//!     → If-None-Match == fingerprint → 304
//!     → negotiate::select → 200 with the smallest acceptable variant
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::response::{IntoResponse, Response};

use crate::http::negotiate::{self, AcceptEncoding};
use crate::http::push::{self, PushCapability, PushDetails, PUSH_COOKIE_NAME};
use crate::http::request::{self, RequestDetails};
use crate::http::response::{self, ServeDetails, ServeError};
use crate::manifest::SiteManifest;
use crate::net::ConnectionContext;
use crate::observability::metrics;

/// Shared state of the site handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub site: Arc<SiteManifest>,
}

impl AppState {
    pub fn new(site: Arc<SiteManifest>) -> Self {
        Self { site }
    }
}

/// Axum entry point for every site route.
pub async fn serve_site(State(state): State<AppState>, req: Request<Body>) -> Response {
    let start_time = Instant::now();
    let site = &state.site;

    let details = RequestDetails::from_request(&req);
    let connection = req.extensions().get::<ConnectionContext>().copied();
    let pusher = req
        .extensions()
        .get::<PushCapability>()
        .map(|capability| Arc::clone(&capability.0));
    let headers = req.headers();

    let outcome = push::push_assets(
        site,
        &details.path,
        pusher.as_deref(),
        request::cookie(headers, PUSH_COOKIE_NAME),
    );

    let (mut response, serve) = match serve_asset(site, &details.path, headers) {
        Ok(served) => served,
        Err(e) => {
            tracing::error!(
                request_id = %request::request_id(headers),
                path = %details.path,
                error = %e,
                "Failed to serve asset"
            );
            let response = e.into_response();
            let serve = ServeDetails {
                status: response.status().as_u16(),
                size: 0,
            };
            (response, serve)
        }
    };

    if let Some(cookie) = outcome.set_cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }

    log_access(headers, &details, connection, &outcome.details, serve);
    metrics::record_request(&details.method, serve.status, start_time);
    if outcome.details.push_attempted {
        metrics::record_push(outcome.details.assets.len());
    }

    response
}

/// Resolve `path` and build its response.
pub fn serve_asset(
    site: &SiteManifest,
    path: &str,
    headers: &HeaderMap,
) -> Result<(Response, ServeDetails), ServeError> {
    let Some(asset) = site.lookup(path) else {
        let details = ServeDetails {
            status: 404,
            size: response::NOT_FOUND_BODY.len(),
        };
        return Ok((response::not_found(), details));
    };

    if !asset.fingerprint.is_empty() {
        let if_none_match = headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok());
        if if_none_match == Some(asset.fingerprint.as_str()) {
            let details = ServeDetails { status: 304, size: 0 };
            return Ok((response::not_modified(), details));
        }
    }

    let accept = AcceptEncoding::parse(
        headers
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok()),
    );
    let variant = negotiate::select(&asset.variants, &accept).ok_or_else(|| {
        ServeError::NoAcceptableEncoding {
            url: asset.url.clone(),
        }
    })?;

    let details = ServeDetails {
        status: 200,
        size: variant.len(),
    };
    Ok((response::asset_response(asset, variant)?, details))
}

fn log_access(
    headers: &HeaderMap,
    details: &RequestDetails,
    connection: Option<ConnectionContext>,
    push: &PushDetails,
    serve: ServeDetails,
) {
    let connection_key = connection
        .map(|c| c.key.to_string())
        .unwrap_or_default();

    tracing::info!(
        request_id = %request::request_id(headers),
        connection_key = %connection_key,
        method = %details.method,
        host = %details.host,
        path = %details.path,
        status = serve.status,
        size = serve.size,
        request_triggers_push = ?push.request_triggers_push,
        client_supports_push = ?push.client_supports_push,
        client_needs_assets = ?push.client_needs_assets,
        push_attempted = push.push_attempted,
        server_checksum = %push.server_checksum,
        client_checksum = push.client_checksum.as_deref().unwrap_or(""),
        pushed = ?push.assets,
        "{}",
        details
    );
}
