//! URL path helpers.
//!
//! Asset URLs are absolute, slash-separated and lexically clean, no matter
//! whether they came from the descriptor or the filesystem walk. Segments
//! are kept percent-encoded; lookups compare decoded forms.

use std::borrow::Cow;
use std::path::Path;

/// Lexically clean a URL path: collapse duplicate slashes, resolve `.` and
/// `..`, and make it absolute. `..` never climbs above the root.
pub fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// URL for a file relative to the web root, each segment percent-encoded.
pub fn from_relative_path(relative: &Path) -> String {
    let joined = relative
        .components()
        .map(|c| urlencoding::encode(&c.as_os_str().to_string_lossy()).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    clean(&joined)
}

/// Percent-decode a URL path. Input that does not decode to UTF-8 is
/// returned verbatim.
pub fn decode(url: &str) -> Cow<'_, str> {
    urlencoding::decode(url).unwrap_or(Cow::Borrowed(url))
}

/// Last path segment.
pub fn base_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Parent directory of a URL; `/` for top-level entries.
pub fn parent_dir(url: &str) -> &str {
    match url.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &url[..i],
    }
}

/// Extension of the last segment including the dot, or `""`.
pub fn extension(url: &str) -> &str {
    let base = base_name(url);
    match base.rfind('.') {
        Some(i) => &base[i..],
        None => "",
    }
}
