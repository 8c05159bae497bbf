//! Response construction.
//!
//! # Responsibilities
//! - Build asset responses from a precomputed variant
//! - Build the fixed 404 / 304 / 500 responses
//! - Map serve failures to status codes
//!
//! # Design Decisions
//! - Bodies are `Bytes` clones of the manifest, never copied
//! - `Content-Encoding` is omitted for identity

use axum::body::Body;
use axum::http::header::{self, HeaderValue, InvalidHeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::manifest::{Asset, ContentEncoding, EncodedVariant};

/// Body of every 404.
pub const NOT_FOUND_BODY: &str = "404 page not found";

/// Failures that turn a request into a 500.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("no acceptable encoding for {url}")]
    NoAcceptableEncoding { url: String },

    #[error("invalid header value for {url}: {source}")]
    InvalidHeader {
        url: String,
        #[source]
        source: InvalidHeaderValue,
    },
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error").into_response()
    }
}

/// Outcome of serving, recorded in the access log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServeDetails {
    pub status: u16,
    pub size: usize,
}

pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        NOT_FOUND_BODY,
    )
        .into_response()
}

pub fn not_modified() -> Response {
    StatusCode::NOT_MODIFIED.into_response()
}

/// 200 carrying `variant` of `asset`.
pub fn asset_response(asset: &Asset, variant: &EncodedVariant) -> Result<Response, ServeError> {
    let invalid = |source| ServeError::InvalidHeader {
        url: asset.url.clone(),
        source,
    };

    let mut response = Response::new(Body::from(variant.bytes.clone()));
    let headers = response.headers_mut();

    headers.insert(header::ETAG, HeaderValue::from_str(&asset.fingerprint).map_err(invalid)?);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&asset.content_type).map_err(invalid)?,
    );
    if variant.encoding != ContentEncoding::Identity {
        headers.insert(
            header::CONTENT_ENCODING,
            HeaderValue::from_static(variant.encoding.as_str()),
        );
    }
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(variant.len()));

    Ok(response)
}
