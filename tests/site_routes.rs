//! In-process tests of the site router.

use std::io::Read;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::{Extension, Router};
use flate2::read::{DeflateDecoder, GzDecoder};
use tower::ServiceExt;

use spa_server::config::TimeoutConfig;
use spa_server::http::handler::AppState;
use spa_server::http::push::push_cookie;
use spa_server::http::server::build_router;
use spa_server::http::{PushCapability, X_REQUEST_ID};
use spa_server::SiteManifest;

mod common;

use common::RecordingPusher;

fn router(site: &Arc<SiteManifest>) -> Router {
    build_router(AppState::new(Arc::clone(site)), &TimeoutConfig::default())
}

fn push_router(site: &Arc<SiteManifest>, pusher: &RecordingPusher) -> Router {
    router(site).layer(Extension(PushCapability::new(pusher.clone())))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

#[tokio::test]
async fn index_serves_html() {
    let dir = common::web_root();
    let site = common::compile(dir.path());

    let response = router(&site).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    assert_eq!(response.headers()[header::VARY], "Accept-Encoding");
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(body(response).await, common::INDEX_HTML.as_bytes());
}

#[tokio::test]
async fn unknown_path_is_404() {
    let dir = common::web_root();
    let site = common::compile(dir.path());

    let response = router(&site).oneshot(get("/missing.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response).await, b"404 page not found");
}

#[tokio::test]
async fn private_files_are_not_served() {
    let dir = common::web_root();
    let site = common::compile(dir.path());

    let response = router(&site).oneshot(get("/.env")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn matching_etag_is_not_modified() {
    let dir = common::web_root();
    let site = common::compile(dir.path());
    let etag = site.lookup("/main.js").unwrap().fingerprint.clone();

    let request = Request::builder()
        .uri("/main.js")
        .header(header::IF_NONE_MATCH, &etag)
        .body(Body::empty())
        .unwrap();
    let response = router(&site).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(body(response).await.is_empty());
}

#[tokio::test]
async fn stale_etag_gets_full_response() {
    let dir = common::web_root();
    let site = common::compile(dir.path());

    let request = Request::builder()
        .uri("/main.js")
        .header(header::IF_NONE_MATCH, "stale")
        .body(Body::empty())
        .unwrap();
    let response = router(&site).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let etag = response.headers()[header::ETAG].to_str().unwrap().to_string();
    assert_eq!(etag, site.lookup("/main.js").unwrap().fingerprint);
}

#[tokio::test]
async fn gzip_is_negotiated() {
    let dir = common::web_root();
    let site = common::compile(dir.path());

    let request = Request::builder()
        .uri("/main.js")
        .header(header::ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .unwrap();
    let response = router(&site).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/javascript");

    let compressed = body(response).await;
    assert!(compressed.len() < common::main_js().len());

    let mut decoded = String::new();
    GzDecoder::new(&compressed[..]).read_to_string(&mut decoded).unwrap();
    assert_eq!(decoded, common::main_js());
}

#[tokio::test]
async fn smallest_acceptable_encoding_wins() {
    let dir = common::web_root();
    let site = common::compile(dir.path());
    let asset = site.lookup("/main.js").unwrap();
    let smallest = asset.variants[0].encoding;

    let request = Request::builder()
        .uri("/main.js")
        .header(header::ACCEPT_ENCODING, "gzip, deflate, br")
        .body(Body::empty())
        .unwrap();
    let response = router(&site).oneshot(request).await.unwrap();

    assert_eq!(response.headers()[header::CONTENT_ENCODING], smallest.as_str());
    let compressed = body(response).await;
    assert_eq!(compressed.len(), asset.variants[0].len());

    if smallest.as_str() == "deflate" {
        let mut decoded = String::new();
        DeflateDecoder::new(&compressed[..]).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, common::main_js());
    }
}

#[tokio::test]
async fn refused_encodings_fall_back_to_identity() {
    let dir = common::web_root();
    let site = common::compile(dir.path());

    let request = Request::builder()
        .uri("/main.js")
        .header(header::ACCEPT_ENCODING, "gzip;q=0, deflate;q=0")
        .body(Body::empty())
        .unwrap();
    let response = router(&site).oneshot(request).await.unwrap();

    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(body(response).await, common::main_js().as_bytes());
}

#[tokio::test]
async fn directory_resolves_to_its_index() {
    let dir = common::web_root();
    let site = common::compile(dir.path());

    let response = router(&site).oneshot(get("/app")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, common::APP_INDEX_HTML.as_bytes());
}

#[tokio::test]
async fn percent_encoded_paths_resolve() {
    let dir = common::web_root();
    std::fs::write(dir.path().join("my file.txt"), "spaced").unwrap();
    let site = common::compile(dir.path());

    let response = router(&site).oneshot(get("/my%20file.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, b"spaced");
}

#[tokio::test]
async fn first_page_load_pushes_prefetched_assets() {
    let dir = common::web_root();
    let site = common::compile(dir.path());
    let pusher = RecordingPusher::default();

    let response = push_router(&site, &pusher).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::SET_COOKIE].to_str().unwrap(),
        push_cookie(site.checksum())
    );
    assert_eq!(pusher.pushed(), vec!["/styles.css", "/main.js"]);
}

#[tokio::test]
async fn matching_cookie_suppresses_push() {
    let dir = common::web_root();
    let site = common::compile(dir.path());
    let pusher = RecordingPusher::default();
    let app = push_router(&site, &pusher);

    let first = app.clone().oneshot(get("/index.html")).await.unwrap();
    let set_cookie = first.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    assert_eq!(pusher.pushed().len(), 2);
    pusher.clear();

    let request = Request::builder()
        .uri("/index.html")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let second = app.oneshot(request).await.unwrap();

    assert_eq!(second.status(), StatusCode::OK);
    assert!(second.headers().get(header::SET_COOKIE).is_none());
    assert!(pusher.pushed().is_empty());
}

#[tokio::test]
async fn outdated_cookie_pushes_again() {
    let dir = common::web_root();
    let site = common::compile(dir.path());
    let pusher = RecordingPusher::default();

    let request = Request::builder()
        .uri("/")
        .header(header::COOKIE, "theme=dark; _spa_push=previous-release")
        .body(Body::empty())
        .unwrap();
    let response = push_router(&site, &pusher).oneshot(request).await.unwrap();

    assert!(response.headers().get(header::SET_COOKIE).is_some());
    assert_eq!(pusher.pushed().len(), 2);
}

#[tokio::test]
async fn route_like_paths_push_even_when_missing() {
    let dir = common::web_root();
    let site = common::compile(dir.path());
    let pusher = RecordingPusher::default();

    let response = push_router(&site, &pusher).oneshot(get("/dashboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    assert_eq!(pusher.pushed(), vec!["/styles.css", "/main.js"]);
}

#[tokio::test]
async fn asset_requests_never_push() {
    let dir = common::web_root();
    let site = common::compile(dir.path());
    let pusher = RecordingPusher::default();

    let response = push_router(&site, &pusher).oneshot(get("/main.js")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(pusher.pushed().is_empty());
}

#[tokio::test]
async fn no_push_capability_means_no_cookie() {
    let dir = common::web_root();
    let site = common::compile(dir.path());

    let response = router(&site).oneshot(get("/")).await.unwrap();
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn request_ids_are_generated_and_propagated() {
    let dir = common::web_root();
    let site = common::compile(dir.path());

    let generated = router(&site).oneshot(get("/")).await.unwrap();
    let id = generated.headers()[X_REQUEST_ID].to_str().unwrap();
    assert_eq!(id.len(), 36);

    let request = Request::builder()
        .uri("/")
        .header(X_REQUEST_ID, "caller-supplied")
        .body(Body::empty())
        .unwrap();
    let echoed = router(&site).oneshot(request).await.unwrap();
    assert_eq!(echoed.headers()[X_REQUEST_ID], "caller-supplied");
}
