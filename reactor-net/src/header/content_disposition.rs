//! `Content-Disposition` parsing and encoding (§4.C1), the header multipart
//! parts (§4.C2) carry to convey the `name`/`filename` of a form field.

use super::{malformed, quote_if_needed, unquote};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    pub disposition_type: String,
    pub name: Option<String>,
    pub filename: Option<String>,
}

pub fn parse(raw: &str) -> Result<ContentDisposition> {
    let mut parts = raw.split(';').map(str::trim);
    let disposition_type = parts
        .next()
        .ok_or_else(|| malformed("empty content-disposition"))?
        .to_string();

    let mut name = None;
    let mut filename = None;
    for param in parts {
        if let Some((k, v)) = param.split_once('=') {
            match k.trim().to_ascii_lowercase().as_str() {
                "name" => name = Some(unquote(v.trim())),
                "filename" => filename = Some(unquote(v.trim())),
                _ => {}
            }
        }
    }

    Ok(ContentDisposition {
        disposition_type,
        name,
        filename,
    })
}

pub fn encode(cd: &ContentDisposition) -> String {
    let mut s = cd.disposition_type.clone();
    if let Some(name) = &cd.name {
        s.push_str(&format!("; name={}", quote_if_needed(name)));
    }
    if let Some(filename) = &cd.filename {
        s.push_str(&format!("; filename={}", quote_if_needed(filename)));
    }
    s
}
