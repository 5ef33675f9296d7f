//! Request-line and header parsing (§4.C3, §6 "strict LF handling, 8000-byte
//! default header line cap").

use crate::error::{Error, ErrorKind, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
}

#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub raw_target: String,
    pub version: HttpVersion,
    pub headers: HeaderMap,
}

/// Scans `buf` for a complete request head (terminated by a blank line).
/// Returns `Ok(None)` when more bytes are needed, `Ok(Some((head,
/// consumed)))` on success, or a classified error (§4.C3 "decoder errors
/// classify into `URI_TOO_LONG → 414`, `HEADERS_TOO_LARGE → 431`, else
/// `400`").
pub fn parse_request_head(
    buf: &[u8],
    max_header_line_bytes: usize,
    max_header_count: usize,
) -> Result<Option<(RequestHead, usize)>> {
    let end = match memchr::memmem::find(buf, b"\r\n\r\n") {
        Some(idx) => idx,
        None => {
            if buf.len() > max_header_line_bytes * (max_header_count + 1) {
                return Err(Error::new(ErrorKind::HeadersTooLarge, "request head exceeded size cap before terminator"));
            }
            return Ok(None);
        }
    };

    let head_bytes = &buf[..end];
    let mut lines = split_lines(head_bytes)?;
    if lines.is_empty() {
        return Err(Error::new(ErrorKind::BadRequest, "empty request"));
    }
    let request_line = lines.remove(0);
    if request_line.len() > max_header_line_bytes {
        return Err(Error::new(ErrorKind::UriTooLong, "request line exceeded configured cap"));
    }
    if lines.len() > max_header_count {
        return Err(Error::new(ErrorKind::HeadersTooLarge, "too many header lines"));
    }

    let (method, raw_target, version) = parse_request_line(request_line)?;

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.len() > max_header_line_bytes {
            return Err(Error::new(ErrorKind::HeadersTooLarge, "header line exceeded configured cap"));
        }
        let (name, value) = parse_header_line(line)?;
        headers.append(name, value);
    }

    Ok(Some((
        RequestHead {
            method,
            raw_target,
            version,
            headers,
        },
        end + 4,
    )))
}

/// Splits on bare `\r\n`, rejecting a lone `\n` (strict LF handling per §6).
fn split_lines(head: &[u8]) -> Result<Vec<&str>> {
    if head.contains(&b'\n') && !is_strictly_crlf(head) {
        return Err(Error::new(ErrorKind::BadRequest, "bare LF not permitted"));
    }
    head.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .map(|line| std::str::from_utf8(line).map_err(|_| Error::new(ErrorKind::BadRequest, "non-UTF-8 header bytes")))
        .collect()
}

fn is_strictly_crlf(head: &[u8]) -> bool {
    let mut i = 0;
    while i < head.len() {
        if head[i] == b'\n' {
            if i == 0 || head[i - 1] != b'\r' {
                return false;
            }
        }
        i += 1;
    }
    true
}

fn parse_request_line(line: &str) -> Result<(Method, String, HttpVersion)> {
    let mut parts = line.splitn(3, ' ');
    let method = parts
        .next()
        .ok_or_else(|| Error::new(ErrorKind::BadRequest, "missing method"))?;
    let target = parts
        .next()
        .ok_or_else(|| Error::new(ErrorKind::BadRequest, "missing request target"))?;
    let version = parts
        .next()
        .ok_or_else(|| Error::new(ErrorKind::BadRequest, "missing HTTP version"))?;

    let method = method
        .parse::<Method>()
        .map_err(|_| Error::new(ErrorKind::BadRequest, "unknown method"))?;
    let version = match version {
        "HTTP/1.1" => HttpVersion::Http11,
        "HTTP/1.0" => HttpVersion::Http10,
        _ => return Err(Error::new(ErrorKind::BadRequest, "unsupported HTTP version")),
    };
    Ok((method, target.to_string(), version))
}

fn parse_header_line(line: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| Error::new(ErrorKind::BadRequest, "header line missing ':'"))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|_| Error::new(ErrorKind::BadRequest, "invalid header name"))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|_| Error::new(ErrorKind::BadRequest, "invalid header value"))?;
    Ok((name, value))
}
