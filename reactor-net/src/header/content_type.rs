//! `Content-Type` parsing and encoding (§4.C1).

use super::{malformed, quote_if_needed, unquote};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub r#type: String,
    pub subtype: String,
    /// Parameters in declaration order (`charset`, `boundary`, etc).
    pub params: Vec<(String, String)>,
}

impl ContentType {
    pub fn normalized(&self) -> String {
        format!("{}/{}", self.r#type.to_ascii_lowercase(), self.subtype.to_ascii_lowercase())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_wildcard(&self) -> bool {
        self.r#type == "*" || self.subtype == "*"
    }
}

pub fn parse(raw: &str) -> Result<ContentType> {
    let mut parts = raw.split(';').map(str::trim);
    let type_subtype = parts.next().ok_or_else(|| malformed("empty content-type"))?;
    let (t, s) = type_subtype
        .split_once('/')
        .ok_or_else(|| malformed("content-type missing '/'"))?;
    if t.is_empty() || s.is_empty() {
        return Err(malformed("content-type has empty type or subtype"));
    }
    let mut params = Vec::new();
    for param in parts {
        if param.is_empty() {
            continue;
        }
        let (k, v) = param
            .split_once('=')
            .ok_or_else(|| malformed("content-type parameter missing '='"))?;
        params.push((k.trim().to_string(), unquote(v.trim())));
    }
    Ok(ContentType {
        r#type: t.to_string(),
        subtype: s.to_string(),
        params,
    })
}

pub fn encode(ct: &ContentType) -> String {
    let mut s = format!("{}/{}", ct.r#type, ct.subtype);
    for (k, v) in &ct.params {
        s.push_str(&format!("; {k}={}", quote_if_needed(v)));
    }
    s
}
