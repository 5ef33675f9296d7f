//! `Authorization` header decoding (§4.C1 [SUPPLEMENT], RFC 7235 grammar).

use super::malformed;
use crate::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Bearer(String),
    Basic { username: String, password: String },
    Unknown { scheme: String, value: String },
}

pub fn parse(raw: &str) -> Result<Authorization> {
    let (scheme, value) = raw
        .split_once(' ')
        .ok_or_else(|| malformed("authorization header missing scheme"))?;

    match scheme.to_ascii_lowercase().as_str() {
        "bearer" => Ok(Authorization::Bearer(value.trim().to_string())),
        "basic" => {
            let decoded = STANDARD
                .decode(value.trim())
                .map_err(|_| malformed("invalid base64 in Basic authorization"))?;
            let text = String::from_utf8(decoded)
                .map_err(|_| malformed("Basic authorization is not valid UTF-8"))?;
            let (username, password) = text
                .split_once(':')
                .ok_or_else(|| malformed("Basic authorization missing ':'"))?;
            Ok(Authorization::Basic {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        _ => Ok(Authorization::Unknown {
            scheme: scheme.to_string(),
            value: value.trim().to_string(),
        }),
    }
}

pub fn encode(auth: &Authorization) -> String {
    match auth {
        Authorization::Bearer(token) => format!("Bearer {token}"),
        Authorization::Basic { username, password } => {
            let raw = format!("{username}:{password}");
            format!("Basic {}", STANDARD.encode(raw))
        }
        Authorization::Unknown { scheme, value } => format!("{scheme} {value}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_token() {
        let auth = parse("Bearer abc.def.ghi").unwrap();
        assert_eq!(auth, Authorization::Bearer("abc.def.ghi".into()));
    }

    #[test]
    fn basic_round_trips() {
        let auth = Authorization::Basic {
            username: "alice".into(),
            password: "s3cret".into(),
        };
        let encoded = encode(&auth);
        let reparsed = parse(&encoded).unwrap();
        assert_eq!(auth, reparsed);
    }
}
