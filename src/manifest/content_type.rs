//! Content type classification.
//!
//! # Responsibilities
//! - Look up the MIME type by file extension
//! - Sniff the leading bytes when the extension is unknown
//! - Collapse JavaScript aliases to `text/javascript`
//! - Rank content types along the critical rendering path

use std::path::Path;

/// Fallback for content that cannot be classified.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Canonical JavaScript type.
pub const JAVASCRIPT: &str = "text/javascript";

const JAVASCRIPT_ALIASES: &[&str] = &[
    "application/javascript",
    "application/ecmascript",
    "application/x-ecmascript",
    "application/x-javascript",
    "text/javascript",
    "text/ecmascript",
    "text/javascript1.0",
    "text/javascript1.1",
    "text/javascript1.2",
    "text/javascript1.3",
    "text/javascript1.4",
    "text/javascript1.5",
    "text/jscript",
    "text/livescript",
    "text/x-ecmascript",
    "text/x-javascript",
];

/// Bytes considered when sniffing.
const SNIFF_LEN: usize = 512;

/// Determine the content type of a file from its path and contents.
pub fn detect(path: &Path, data: &[u8]) -> String {
    let by_extension = match path.extension() {
        Some(_) => mime_guess::from_path(path).first_raw().unwrap_or_default(),
        None => "",
    };

    let raw = if by_extension.is_empty() {
        sniff(data)
    } else {
        by_extension
    };

    canonicalize(raw)
}

/// Lower-case a MIME type and collapse JavaScript aliases.
pub fn canonicalize(content_type: &str) -> String {
    let lowered = content_type.trim().to_ascii_lowercase();
    let essence = lowered.split(';').next().unwrap_or_default().trim();

    if essence.is_empty() {
        return OCTET_STREAM.to_string();
    }
    if JAVASCRIPT_ALIASES.contains(&essence) {
        return JAVASCRIPT.to_string();
    }
    lowered
}

/// Sort priority based on the critical rendering path. Lower sorts first.
pub fn priority(content_type: &str) -> u8 {
    if content_type.starts_with("text/html") {
        0
    } else if content_type.starts_with("text/css") {
        1
    } else if content_type.starts_with(JAVASCRIPT) {
        2
    } else {
        3
    }
}

const HTML_SIGNATURES: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

const EXACT_SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"\x00asm", "application/wasm"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
];

/// Guess a content type from leading bytes.
///
/// A subset of the WHATWG MIME sniffing table: markup, common image, font
/// and archive signatures, then text vs. binary.
pub fn sniff(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    let start = data
        .iter()
        .position(|&b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(data.len());
    let trimmed = &data[start..];

    for signature in HTML_SIGNATURES {
        if html_signature_matches(trimmed, signature) {
            return "text/html; charset=utf-8";
        }
    }
    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    for &(signature, content_type) in EXACT_SIGNATURES {
        if data.starts_with(signature) {
            return content_type;
        }
    }
    if data.len() >= 14 && &data[..4] == b"RIFF" && &data[8..14] == b"WEBPVP" {
        return "image/webp";
    }

    if data.iter().any(|&b| is_binary(b)) {
        return OCTET_STREAM;
    }
    "text/plain; charset=utf-8"
}

fn html_signature_matches(data: &[u8], signature: &[u8]) -> bool {
    if data.len() <= signature.len() {
        return false;
    }
    let (head, rest) = data.split_at(signature.len());
    if !head.eq_ignore_ascii_case(signature) {
        return false;
    }
    matches!(rest[0], b' ' | b'>')
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f)
}
