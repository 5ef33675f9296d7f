//! H2C upgrade detection (§4.C3): "a request carrying `Connection:
//! upgrade, http2-settings` plus exactly one `HTTP2-Settings` header
//! triggers a `101 Switching Protocols` response."

use crate::error::{Error, ErrorKind, Result};
use crate::http1::RequestHead;
use base64::Engine;

/// The decoded `HTTP2-Settings` payload of a validated upgrade request.
pub struct H2cUpgrade {
    pub settings_payload: Vec<u8>,
}

/// Returns `Some` only when the request is eligible for H2C upgrade;
/// `None` for an ordinary HTTP/1.x request with no upgrade headers.
/// Returns a classified error for a malformed upgrade attempt (§4.C3
/// "Malformed upgrade requests produce `400` and close the connection").
pub fn detect_h2c_upgrade(head: &RequestHead) -> Result<Option<H2cUpgrade>> {
    let connection = match head.headers.get(http::header::CONNECTION) {
        Some(v) => v,
        None => return Ok(None),
    };
    let connection = connection
        .to_str()
        .map_err(|_| Error::new(ErrorKind::BadRequest, "non-ASCII Connection header"))?;
    let tokens: Vec<&str> = connection.split(',').map(str::trim).collect();
    let wants_upgrade = tokens.iter().any(|t| t.eq_ignore_ascii_case("upgrade"));
    let names_settings = tokens.iter().any(|t| t.eq_ignore_ascii_case("http2-settings"));
    if !wants_upgrade || !names_settings {
        return Ok(None);
    }

    let upgrade = head
        .headers
        .get(http::header::UPGRADE)
        .and_then(|v| v.to_str().ok());
    if !matches!(upgrade, Some(u) if u.eq_ignore_ascii_case("h2c")) {
        return Err(Error::new(ErrorKind::UpgradeRefused, "Upgrade header does not name h2c"));
    }

    let mut settings_headers = head.headers.get_all("http2-settings").iter();
    let first = settings_headers
        .next()
        .ok_or_else(|| Error::new(ErrorKind::BadRequest, "missing HTTP2-Settings header"))?;
    if settings_headers.next().is_some() {
        return Err(Error::new(ErrorKind::BadRequest, "multiple HTTP2-Settings headers"));
    }

    let raw = first
        .to_str()
        .map_err(|_| Error::new(ErrorKind::BadRequest, "non-ASCII HTTP2-Settings header"))?;
    let settings_payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(raw)
        .map_err(|_| Error::new(ErrorKind::BadRequest, "invalid base64url HTTP2-Settings payload"))?;

    Ok(Some(H2cUpgrade { settings_payload }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http1::parse_request_head;

    #[test]
    fn detects_a_valid_upgrade_request() {
        let raw = b"GET / HTTP/1.1\r\nHost: x\r\nConnection: Upgrade, HTTP2-Settings\r\nUpgrade: h2c\r\nHTTP2-Settings: AAMAAABkAAQAAP__\r\n\r\n";
        let (head, _) = parse_request_head(raw, 8000, 100).unwrap().unwrap();
        let upgrade = detect_h2c_upgrade(&head).unwrap();
        assert!(upgrade.is_some());
    }

    #[test]
    fn ordinary_request_is_not_an_upgrade() {
        let raw = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        let (head, _) = parse_request_head(raw, 8000, 100).unwrap().unwrap();
        assert!(detect_h2c_upgrade(&head).unwrap().is_none());
    }

    #[test]
    fn duplicate_settings_header_is_rejected() {
        let raw = b"GET / HTTP/1.1\r\nHost: x\r\nConnection: upgrade, http2-settings\r\nUpgrade: h2c\r\nHTTP2-Settings: AAA\r\nHTTP2-Settings: BBB\r\n\r\n";
        let (head, _) = parse_request_head(raw, 8000, 100).unwrap().unwrap();
        assert!(detect_h2c_upgrade(&head).is_err());
    }
}
