//! WebSocket upgrade handshake (RFC 6455 §1.3) for the HTTP client.

use crate::error::{Error, ErrorKind, Result};
use base64::Engine;
use sha1::{Digest, Sha1};

const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// A client-generated `Sec-WebSocket-Key` and the accept value the server
/// must echo back for the upgrade to be considered valid.
pub struct UpgradeRequest {
    pub key: String,
}

impl UpgradeRequest {
    pub fn new(random_16_bytes: [u8; 16]) -> Self {
        Self {
            key: base64::engine::general_purpose::STANDARD.encode(random_16_bytes),
        }
    }

    pub fn expected_accept(&self) -> String {
        compute_accept(&self.key)
    }

    /// Validates the `Sec-WebSocket-Accept` header the server returned in
    /// its `101 Switching Protocols` response.
    pub fn validate_accept(&self, server_accept: &str) -> Result<()> {
        if server_accept == self.expected_accept() {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::UpgradeRefused, "Sec-WebSocket-Accept did not match the expected value"))
        }
    }
}

fn compute_accept(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_the_rfc_6455_example_accept_value() {
        // RFC 6455 §1.3 worked example.
        let accept = compute_accept("dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn rejects_a_mismatched_accept_value() {
        let upgrade = UpgradeRequest { key: "dGhlIHNhbXBsZSBub25jZQ==".to_string() };
        assert!(upgrade.validate_accept("not-the-right-value").is_err());
        assert!(upgrade.validate_accept(&upgrade.expected_accept()).is_ok());
    }
}
