//! Request inspection.
//!
//! # Responsibilities
//! - Decode the request path the way asset URLs are stored
//! - Extract host and request ID for the access log
//! - Read individual cookies
//!
//! # Design Decisions
//! - Request ID is added by tower-http before the handler runs
//! - A path that does not decode to UTF-8 is looked up verbatim and misses

use std::fmt;

use axum::http::{header, HeaderMap, HeaderName, Request};
use serde::Serialize;

use crate::manifest::url;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request identity recorded in the access log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestDetails {
    pub method: String,
    pub path: String,
    pub host: String,
}

impl RequestDetails {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().to_string(),
            path: decoded_path(request.uri().path()),
            host: host(request),
        }
    }
}

impl fmt::Display for RequestDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.method, self.host, self.path)
    }
}

/// Percent-decoded URL path.
pub fn decoded_path(raw: &str) -> String {
    url::decode(raw).into_owned()
}

/// `Host` header, falling back to the URI authority (HTTP/2).
pub fn host<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

/// Correlation ID assigned by the request ID layer.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Value of cookie `name`, searching every `Cookie` header.
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method};

    #[test]
    fn path_is_percent_decoded() {
        assert_eq!(decoded_path("/assets/my%20logo.svg"), "/assets/my logo.svg");
        assert_eq!(decoded_path("/plain"), "/plain");
        assert_eq!(decoded_path("/bad%FF"), "/bad%FF");
    }

    #[test]
    fn cookie_found_among_many() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; lang=en"));
        headers.append(header::COOKIE, HeaderValue::from_static("_spa_push=abc=="));

        assert_eq!(cookie(&headers, "lang"), Some("en"));
        assert_eq!(cookie(&headers, "_spa_push"), Some("abc=="));
        assert_eq!(cookie(&headers, "missing"), None);
    }

    #[test]
    fn details_use_host_header() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/a%2Eb")
            .header(header::HOST, "example.com")
            .body(())
            .unwrap();
        let details = RequestDetails::from_request(&request);
        assert_eq!(details.to_string(), "GET example.com/a.b");
    }

    #[test]
    fn host_falls_back_to_authority() {
        let request = Request::builder()
            .uri("https://example.org/")
            .body(())
            .unwrap();
        assert_eq!(host(&request), "example.org");
    }
}
