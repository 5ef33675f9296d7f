//! `Cookie` / `Set-Cookie` parsing and encoding (§4.C1).

use super::{malformed, quote_if_needed, unquote};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
}

/// `Cookie: a=1; b=2` — semicolon-separated name=value pairs.
pub fn parse_cookie_header(raw: &str) -> Result<Vec<Cookie>> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| malformed("cookie pair missing '='"))?;
            Ok(Cookie {
                name: name.trim().to_string(),
                value: unquote(value.trim()),
            })
        })
        .collect()
}

pub fn encode_cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// `Set-Cookie: name=value; Domain=...; Path=...; Max-Age=...; Secure; HttpOnly; SameSite=...`
pub fn parse_set_cookie(raw: &str) -> Result<SetCookie> {
    let mut parts = raw.split(';').map(str::trim);
    let first = parts.next().ok_or_else(|| malformed("empty set-cookie"))?;
    let (name, value) = first
        .split_once('=')
        .ok_or_else(|| malformed("set-cookie missing name=value"))?;

    let mut sc = SetCookie {
        name: name.trim().to_string(),
        value: unquote(value.trim()),
        ..Default::default()
    };

    for attr in parts {
        if attr.is_empty() {
            continue;
        }
        if let Some((k, v)) = attr.split_once('=') {
            let key = k.trim().to_ascii_lowercase();
            let v = v.trim();
            match key.as_str() {
                "domain" => sc.domain = Some(v.to_string()),
                "path" => sc.path = Some(v.to_string()),
                "max-age" => {
                    sc.max_age = Some(v.parse().map_err(|_| malformed("invalid Max-Age"))?)
                }
                "samesite" => sc.same_site = Some(v.to_string()),
                _ => {}
            }
        } else {
            match attr.trim().to_ascii_lowercase().as_str() {
                "secure" => sc.secure = true,
                "httponly" => sc.http_only = true,
                _ => {}
            }
        }
    }

    Ok(sc)
}

pub fn encode_set_cookie(sc: &SetCookie) -> String {
    let mut s = format!("{}={}", sc.name, quote_if_needed(&sc.value));
    if let Some(domain) = &sc.domain {
        s.push_str(&format!("; Domain={domain}"));
    }
    if let Some(path) = &sc.path {
        s.push_str(&format!("; Path={path}"));
    }
    if let Some(max_age) = sc.max_age {
        s.push_str(&format!("; Max-Age={max_age}"));
    }
    if sc.secure {
        s.push_str("; Secure");
    }
    if sc.http_only {
        s.push_str("; HttpOnly");
    }
    if let Some(same_site) = &sc.same_site {
        s.push_str(&format!("; SameSite={same_site}"));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_cookies() {
        let cookies = parse_cookie_header("a=1; b=2").unwrap();
        assert_eq!(cookies, vec![
            Cookie { name: "a".into(), value: "1".into() },
            Cookie { name: "b".into(), value: "2".into() },
        ]);
    }

    #[test]
    fn set_cookie_round_trips_attributes() {
        let sc = parse_set_cookie("session=abc; Domain=example.com; Path=/; Max-Age=3600; Secure; HttpOnly; SameSite=Strict").unwrap();
        assert_eq!(sc.domain.as_deref(), Some("example.com"));
        assert_eq!(sc.max_age, Some(3600));
        assert!(sc.secure && sc.http_only);
        let encoded = encode_set_cookie(&sc);
        let reparsed = parse_set_cookie(&encoded).unwrap();
        assert_eq!(sc, reparsed);
    }
}
