//! Push-once-per-checksum strategy.
//!
//! # Responsibilities
//! - Decide whether a request is a page load that should push
//! - Compare the client's push cookie with the site checksum
//! - Push every prefetched, non-page asset in manifest order
//! - Describe what happened for the access log
//!
//! # Design Decisions
//! - Push support is a capability the transport inserts into request
//!   extensions; requests without it skip pushing entirely
//! - Individual push failures are ignored, the response never depends on them

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderValue;
use serde::Serialize;
use thiserror::Error;

use crate::manifest::{url, SiteManifest};

/// Cookie remembering the checksum the client last received pushes for.
pub const PUSH_COOKIE_NAME: &str = "_spa_push";

/// One year, in seconds.
pub const PUSH_COOKIE_MAX_AGE: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("server push is not supported on this connection")]
    Unsupported,
    #[error("push of {target} rejected: {reason}")]
    Rejected { target: String, reason: String },
}

/// Transport hook able to push a GET for `target` to the client.
pub trait Pusher: Send + Sync {
    fn push(&self, target: &str) -> Result<(), PushError>;
}

/// Request extension marking a push-capable connection.
#[derive(Clone)]
pub struct PushCapability(pub Arc<dyn Pusher>);

impl PushCapability {
    pub fn new(pusher: impl Pusher + 'static) -> Self {
        Self(Arc::new(pusher))
    }
}

impl fmt::Debug for PushCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PushCapability")
    }
}

/// Push decision record, logged with every request.
///
/// The three flags are unset when the decision stopped before reaching them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushDetails {
    pub request_triggers_push: Option<bool>,
    pub client_supports_push: Option<bool>,
    pub client_needs_assets: Option<bool>,
    pub push_attempted: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub server_checksum: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_checksum: Option<String>,
    pub assets: Vec<String>,
}

/// Result of the push step: what happened and the cookie to set, if any.
#[derive(Debug, Default)]
pub struct PushOutcome {
    pub details: PushDetails,
    pub set_cookie: Option<HeaderValue>,
}

/// Page loads push: the index itself and any extensionless route.
pub fn triggers_push(path: &str, index_url: &str) -> bool {
    path == index_url || url::extension(path).is_empty()
}

/// `Set-Cookie` value recording `checksum`.
pub fn push_cookie(checksum: &str) -> String {
    format!(
        "{PUSH_COOKIE_NAME}={checksum}; Path=/; Max-Age={PUSH_COOKIE_MAX_AGE}; SameSite=Strict"
    )
}

/// Run the push step for a request to `path`.
pub fn push_assets(
    site: &SiteManifest,
    path: &str,
    pusher: Option<&dyn Pusher>,
    client_checksum: Option<&str>,
) -> PushOutcome {
    let mut details = PushDetails {
        server_checksum: site.checksum().to_string(),
        ..Default::default()
    };

    if !triggers_push(path, site.index_url()) {
        details.request_triggers_push = Some(false);
        return PushOutcome { details, set_cookie: None };
    }
    details.request_triggers_push = Some(true);

    let Some(pusher) = pusher else {
        details.client_supports_push = Some(false);
        return PushOutcome { details, set_cookie: None };
    };
    details.client_supports_push = Some(true);

    details.client_checksum = client_checksum.map(str::to_string);
    if client_checksum == Some(site.checksum()) {
        details.client_needs_assets = Some(false);
        return PushOutcome { details, set_cookie: None };
    }
    details.client_needs_assets = Some(true);

    // base64 checksums are always valid header text.
    let set_cookie = HeaderValue::from_str(&push_cookie(site.checksum())).ok();

    details.push_attempted = true;
    for asset in site.assets() {
        if asset.lazy || triggers_push(&asset.url, site.index_url()) {
            continue;
        }

        details.assets.push(asset.url.clone());
        if let Err(e) = pusher.push(&asset.url) {
            tracing::debug!(target_url = %asset.url, error = %e, "Push failed");
        }
    }

    PushOutcome { details, set_cookie }
}
