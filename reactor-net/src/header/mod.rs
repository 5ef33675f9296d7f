//! Header codec and parameter converter (§4.C1).
//!
//! [`Header`] is the decoded representation of one HTTP header value.
//! [`decode`]/[`encode`] round-trip a handful of structured header
//! families (`Accept`, `Content-Type`, `Cookie`, `Set-Cookie`,
//! `Content-Disposition`, `Authorization`); every other header is
//! carried as an opaque raw value.

mod accept;
mod authorization;
mod content_disposition;
mod content_type;
mod cookie;
pub mod params;

pub use accept::{best_match, parse_language_ranges, parse_media_ranges, LanguageRange, MediaRange};
pub use authorization::Authorization;
pub use content_disposition::ContentDisposition;
pub use content_type::{parse as parse_content_type, ContentType};
pub use cookie::{Cookie, SetCookie};

use crate::error::{Error, Result};

/// The decoded form of a header value, when the name is one the codec
/// understands. Headers outside this set stay `Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Accept(Vec<MediaRange>),
    AcceptLanguage(Vec<LanguageRange>),
    ContentType(ContentType),
    Cookie(Vec<Cookie>),
    SetCookie(SetCookie),
    ContentDisposition(ContentDisposition),
    Authorization(Authorization),
    Raw,
}

/// Header names forbidden in plain HTTP/1.x wire form (§3 Header invariants).
pub const PSEUDO_HEADERS: &[&str] = &[":authority", ":method", ":path", ":scheme", ":status"];

/// Hop-by-hop headers stripped on an HTTP/1.x → HTTP/2 upgrade (§3).
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
];

/// A single decoded header: the lower-cased name, the raw wire value, and
/// its structured form (if the codec understands `name`).
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub name: String,
    pub raw_value: String,
    pub decoded: Decoded,
}

/// Decodes a header value; fails with `MALFORMED_HEADER` on a syntactic
/// violation in one of the structured families.
pub fn decode(name: &str, raw_value: &str) -> Result<Header> {
    let lower = name.to_ascii_lowercase();
    let decoded = match lower.as_str() {
        "accept" => Decoded::Accept(accept::parse_media_ranges(raw_value)?),
        "accept-language" => Decoded::AcceptLanguage(accept::parse_language_ranges(raw_value)?),
        "content-type" => Decoded::ContentType(content_type::parse(raw_value)?),
        "cookie" => Decoded::Cookie(cookie::parse_cookie_header(raw_value)?),
        "set-cookie" => Decoded::SetCookie(cookie::parse_set_cookie(raw_value)?),
        "content-disposition" => {
            Decoded::ContentDisposition(content_disposition::parse(raw_value)?)
        }
        "authorization" => Decoded::Authorization(authorization::parse(raw_value)?),
        _ => Decoded::Raw,
    };
    Ok(Header {
        name: lower,
        raw_value: raw_value.to_string(),
        decoded,
    })
}

/// Canonical wire form of a header. For the structured families this
/// re-serializes the decoded form (preserving parameter order only where
/// meaningful); for `Raw` it returns the original value unchanged.
pub fn encode(header: &Header) -> String {
    match &header.decoded {
        Decoded::Accept(ranges) => accept::encode_media_ranges(ranges),
        Decoded::AcceptLanguage(ranges) => accept::encode_language_ranges(ranges),
        Decoded::ContentType(ct) => content_type::encode(ct),
        Decoded::Cookie(cookies) => cookie::encode_cookie_header(cookies),
        Decoded::SetCookie(sc) => cookie::encode_set_cookie(sc),
        Decoded::ContentDisposition(cd) => content_disposition::encode(cd),
        Decoded::Authorization(a) => authorization::encode(a),
        Decoded::Raw => header.raw_value.clone(),
    }
}

/// Parses a quoted-string or token parameter value, unescaping
/// backslash-escapes inside a quoted-string. Used by Content-Type/
/// Content-Disposition/Cookie parameter parsing.
pub(crate) fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        let inner = &trimmed[1..trimmed.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        out
    } else {
        trimmed.to_string()
    }
}

/// Re-escapes a value as a quoted-string only when necessary (it contains
/// characters outside the HTTP token grammar).
pub(crate) fn quote_if_needed(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c));
    if needs_quoting {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

pub(crate) fn malformed(what: &str) -> Error {
    Error::malformed_header(what)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_header_round_trips_raw() {
        let h = decode("X-Custom", "hello").unwrap();
        assert_eq!(h.name, "x-custom");
        assert_eq!(encode(&h), "hello");
    }

    #[test]
    fn quote_if_needed_only_quotes_non_tokens() {
        assert_eq!(quote_if_needed("simple"), "simple");
        assert_eq!(quote_if_needed("has space"), "\"has space\"");
        assert_eq!(quote_if_needed("a\"b"), "\"a\\\"b\"");
    }
}
