//! §3 "Request — immutable after headers frozen."

use crate::error::{Error, ErrorKind, Result};
use crate::header::Cookie;
use bytes::Bytes;
use futures::Stream;
use http::{HeaderMap, Method};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A request body, single-subscription like a multipart [`crate::body::Part`]
/// (§9: "arena-scoped buffer ownership tied to the Exchange lifetime").
/// Cloning a [`Request`] clones this handle cheaply (an `Arc` bump); only
/// one clone may ever subscribe to the underlying stream.
#[derive(Clone)]
pub struct RequestBody {
    taken: Arc<AtomicBool>,
    inner: Arc<std::sync::Mutex<Option<BodyStream>>>,
}

impl RequestBody {
    pub fn new(stream: BodyStream) -> Self {
        Self {
            taken: Arc::new(AtomicBool::new(false)),
            inner: Arc::new(std::sync::Mutex::new(Some(stream))),
        }
    }

    /// Takes ownership of the underlying stream. Fails with
    /// `STREAM_CONTENTION` if another clone already subscribed.
    pub fn subscribe(&self) -> Result<BodyStream> {
        if self.taken.swap(true, Ordering::SeqCst) {
            return Err(Error::new(
                ErrorKind::StreamContention,
                "request body already subscribed",
            ));
        }
        self.inner
            .lock()
            .expect("request body mutex poisoned")
            .take()
            .ok_or_else(|| Error::new(ErrorKind::StreamContention, "request body already taken"))
    }
}

/// One decoded query parameter or repeated occurrence of one. Order and
/// duplicates are preserved (§3 "decoded query parameters (ordered, may
/// repeat)").
pub type QueryParam = (String, String);

#[derive(Clone)]
pub struct Request {
    pub method: Method,
    pub scheme: String,
    pub authority: String,
    pub raw_path: String,
    pub query: Option<String>,
    pub normalized_path: String,
    pub query_params: Vec<QueryParam>,
    pub cookies: Vec<Cookie>,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
    pub tls_certificates: Option<Vec<Vec<u8>>>,
    pub body: Option<RequestBody>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Whether `method` is one whose body §3 calls "present iff method
    /// allows a body" — GET/HEAD never carry a semantically meaningful
    /// body; everything else may.
    pub fn method_allows_body(method: &Method) -> bool {
        !matches!(*method, Method::GET | Method::HEAD)
    }
}

#[derive(Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    scheme: String,
    authority: String,
    raw_path: String,
    query: Option<String>,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    local_addr: Option<SocketAddr>,
    tls_certificates: Option<Vec<Vec<u8>>>,
    body: Option<RequestBody>,
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Sets the raw request-target path and query, splitting on the first
    /// `?` and normalizing `.`/`..` segments and duplicate slashes into
    /// `normalized_path` (§3 "normalized absolute path").
    pub fn path_and_query(mut self, raw: &str) -> Self {
        let (path, query) = match raw.split_once('?') {
            Some((p, q)) => (p, Some(q.to_string())),
            None => (raw, None),
        };
        self.raw_path = path.to_string();
        self.query = query;
        self
    }

    pub fn header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn local_addr(mut self, addr: SocketAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }

    pub fn tls_certificates(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.tls_certificates = Some(chain);
        self
    }

    pub fn body(mut self, stream: BodyStream) -> Self {
        self.body = Some(RequestBody::new(stream));
        self
    }

    pub fn build(self) -> Request {
        let normalized_path = normalize_path(&self.raw_path);
        let query_params = self
            .query
            .as_deref()
            .map(parse_query_params)
            .unwrap_or_default();
        let cookies = self
            .headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|raw| crate::header::decode("cookie", raw).ok())
            .flat_map(|h| match h.decoded {
                crate::header::Decoded::Cookie(cookies) => cookies,
                _ => Vec::new(),
            })
            .collect();

        Request {
            method: self.method.unwrap_or(Method::GET),
            scheme: self.scheme,
            authority: self.authority,
            raw_path: self.raw_path,
            query: self.query,
            normalized_path,
            query_params,
            cookies,
            headers: self.headers,
            remote_addr: self.remote_addr,
            local_addr: self.local_addr,
            tls_certificates: self.tls_certificates,
            body: self.body,
        }
    }
}

fn normalize_path(raw_path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw_path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

fn parse_query_params(query: &str) -> Vec<QueryParam> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(k), percent_decode(v))
        })
        .collect()
}

fn percent_decode(value: &str) -> String {
    percent_encoding::percent_decode_str(&value.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(normalize_path("/a/./b/../c"), "/a/c");
        assert_eq!(normalize_path("/a//b"), "/a/b");
    }

    #[test]
    fn preserves_repeated_query_keys_in_order() {
        let req = Request::builder()
            .method(Method::GET)
            .path_and_query("/search?tag=a&tag=b&q=rust")
            .build();
        assert_eq!(
            req.query_params,
            vec![
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
                ("q".to_string(), "rust".to_string()),
            ]
        );
    }

    #[test]
    fn body_can_only_be_subscribed_once() {
        let stream: BodyStream = Box::pin(futures::stream::empty());
        let body = RequestBody::new(stream);
        let clone = body.clone();
        assert!(body.subscribe().is_ok());
        assert!(clone.subscribe().is_err());
    }

    #[test]
    fn get_and_head_do_not_allow_a_body() {
        assert!(!Request::method_allows_body(&Method::GET));
        assert!(!Request::method_allows_body(&Method::HEAD));
        assert!(Request::method_allows_body(&Method::POST));
    }
}
