//! `Accept-Encoding` negotiation.
//!
//! Codings are matched case-insensitively with their quality values. A
//! coding is acceptable when it is listed with `q > 0`, or when it is not
//! listed and `*` is present with `q > 0`. `identity` is always acceptable
//! so every asset has a servable variant.

use crate::manifest::{ContentEncoding, EncodedVariant};

/// Parsed `Accept-Encoding` header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptEncoding {
    /// (lower-cased coding, quality) in header order.
    codings: Vec<(String, f32)>,
}

impl AcceptEncoding {
    /// Parse a header value. A missing header accepts identity only.
    pub fn parse(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Self::default();
        };

        let codings = header
            .split(',')
            .filter_map(|item| {
                let mut parts = item.split(';');
                let coding = parts.next()?.trim().to_ascii_lowercase();
                if coding.is_empty() {
                    return None;
                }

                let mut quality = 1.0;
                for param in parts {
                    let Some((name, value)) = param.split_once('=') else {
                        continue;
                    };
                    if name.trim().eq_ignore_ascii_case("q") {
                        quality = value.trim().parse::<f32>().unwrap_or(0.0).clamp(0.0, 1.0);
                    }
                }

                let coding = if coding == "x-gzip" { "gzip".to_string() } else { coding };
                Some((coding, quality))
            })
            .collect();

        Self { codings }
    }

    fn quality(&self, coding: &str) -> Option<f32> {
        self.codings
            .iter()
            .find(|(name, _)| name == coding)
            .map(|&(_, q)| q)
    }

    /// Whether `encoding` may be sent to this client.
    pub fn accepts(&self, encoding: ContentEncoding) -> bool {
        if encoding == ContentEncoding::Identity {
            return true;
        }

        match self.quality(encoding.as_str()) {
            Some(q) => q > 0.0,
            None => self.quality("*").is_some_and(|q| q > 0.0),
        }
    }
}

/// First acceptable variant in the given (smallest-first) order.
pub fn select<'a>(variants: &'a [EncodedVariant], accept: &AcceptEncoding) -> Option<&'a EncodedVariant> {
    variants.iter().find(|v| accept.accepts(v.encoding))
}
