//! §3 "Response — mutable until the first byte of body is committed."

use crate::error::{Error, ErrorKind, Result};
use crate::sse::Event;
use bytes::Bytes;
use futures::Stream;
use http::{HeaderMap, StatusCode};
use std::path::PathBuf;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;
pub type StringStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;
pub type EventStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

/// The body variants named in §3: "{empty, raw byte chunks, string chunks,
/// resource, server-sent events stream}".
pub enum BodyProducer {
    Empty,
    Raw(ByteStream),
    Strings(StringStream),
    Resource(PathBuf),
    Sse(EventStream),
}

impl Default for BodyProducer {
    fn default() -> Self {
        BodyProducer::Empty
    }
}

pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    trailers: Option<HeaderMap>,
    body: BodyProducer,
    committed: bool,
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            trailers: None,
            body: BodyProducer::Empty,
            committed: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.trailers.as_ref()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Sets the status code. Errs with `INTERNAL` once committed (§3
    /// "mutable until the first byte of body is committed").
    pub fn set_status(&mut self, status: StatusCode) -> Result<()> {
        self.ensure_uncommitted()?;
        self.status = status;
        Ok(())
    }

    pub fn set_header(&mut self, name: http::HeaderName, value: http::HeaderValue) -> Result<()> {
        self.ensure_uncommitted()?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Sets trailers. Only meaningful on a chunked HTTP/1.x transfer or on
    /// HTTP/2 (§3 "optional trailers (only when transfer is chunked or
    /// HTTP/2)"); the connection engine is responsible for dropping them
    /// on a non-chunked HTTP/1.x response.
    pub fn set_trailers(&mut self, trailers: HeaderMap) {
        self.trailers = Some(trailers);
    }

    /// Commits the response with the given body producer. Once committed,
    /// status and headers may no longer change.
    pub fn commit(&mut self, body: BodyProducer) -> Result<()> {
        self.ensure_uncommitted()?;
        self.body = body;
        self.committed = true;
        Ok(())
    }

    pub fn body(&self) -> &BodyProducer {
        &self.body
    }

    pub fn into_body(self) -> BodyProducer {
        self.body
    }

    fn ensure_uncommitted(&self) -> Result<()> {
        if self.committed {
            Err(Error::new(
                ErrorKind::Internal,
                "response already committed",
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
