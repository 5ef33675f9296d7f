//! Server-sent events (§4.C5): serializes a stream of [`Event`]s into
//! `text/event-stream` framing.

use bytes::{BufMut, Bytes, BytesMut};

/// One `text/event-stream` event. Fields are emitted only when present,
/// in the order `id`, `event`, `retry`, `data`, per §4.C5.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub id: Option<String>,
    pub event: Option<String>,
    pub retry: Option<u64>,
    pub data: Option<String>,
    pub comment: Option<String>,
}

impl Event {
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            ..Default::default()
        }
    }

    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: Some(data.into()),
            ..Default::default()
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            comment: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_retry(mut self, retry_ms: u64) -> Self {
        self.retry = Some(retry_ms);
        self
    }

    /// Encodes this event as the wire frame, including the terminating
    /// blank line. `data` is split on `\n` into one `data:` line each
    /// (§4.C5 "one or more `data:` lines (split on LF)").
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        if let Some(comment) = &self.comment {
            for line in comment.split('\n') {
                buf.put_slice(b":");
                buf.put_slice(line.as_bytes());
                buf.put_slice(b"\n");
            }
        }
        if let Some(id) = &self.id {
            buf.put_slice(b"id:");
            buf.put_slice(id.as_bytes());
            buf.put_slice(b"\n");
        }
        if let Some(event) = &self.event {
            buf.put_slice(b"event:");
            buf.put_slice(event.as_bytes());
            buf.put_slice(b"\n");
        }
        if let Some(retry) = self.retry {
            buf.put_slice(b"retry:");
            buf.put_slice(retry.to_string().as_bytes());
            buf.put_slice(b"\n");
        }
        if let Some(data) = &self.data {
            for line in data.split('\n') {
                buf.put_slice(b"data:");
                buf.put_slice(line.as_bytes());
                buf.put_slice(b"\n");
            }
        }
        buf.put_slice(b"\n");
        buf.freeze()
    }
}

/// The HTTP version an emitter is serving. On HTTP/1.1 the emitter sets
/// `Connection: keep-alive`; on HTTP/2, streams are already multiplexed
/// and no keep-alive header is set (§4.C5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http1,
    Http2,
}

/// Response headers an emitter must set before the first event is
/// flushed (§4.C5: `Cache-Control: no-cache`, plus `Connection:
/// keep-alive` on HTTP/1.1 only).
pub fn response_headers(transport: Transport) -> Vec<(&'static str, &'static str)> {
    let mut headers = vec![
        ("content-type", "text/event-stream"),
        ("cache-control", "no-cache"),
    ];
    if transport == Transport::Http1 {
        headers.push(("connection", "keep-alive"));
    }
    headers
}

/// Encodes a finite batch of events back to back, as a connection engine
/// would do per flush cycle. Each event is flushed independently on the
/// wire; this helper exists for tests and for producers that buffer a
/// handful of events before yielding to the engine.
pub fn encode_batch(events: &[Event]) -> Bytes {
    let mut buf = BytesMut::new();
    for event in events {
        buf.put(event.encode());
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_fields_in_order_with_terminating_blank_line() {
        let event = Event::named("update", "hello").with_id("1").with_retry(3000);
        let encoded = String::from_utf8(event.encode().to_vec()).unwrap();
        assert_eq!(encoded, "id:1\nevent:update\nretry:3000\ndata:hello\n\n");
    }

    #[test]
    fn multiline_data_becomes_one_data_line_per_input_line() {
        let event = Event::data("line one\nline two");
        let encoded = String::from_utf8(event.encode().to_vec()).unwrap();
        assert_eq!(encoded, "data:line one\ndata:line two\n\n");
    }

    #[test]
    fn comment_only_event_has_no_data_line() {
        let event = Event::comment("keep-alive ping");
        let encoded = String::from_utf8(event.encode().to_vec()).unwrap();
        assert_eq!(encoded, ":keep-alive ping\n\n");
    }

    #[test]
    fn http1_transport_sets_keep_alive_http2_does_not() {
        let h1 = response_headers(Transport::Http1);
        let h2 = response_headers(Transport::Http2);
        assert!(h1.contains(&("connection", "keep-alive")));
        assert!(!h2.iter().any(|(k, _)| *k == "connection"));
    }
}
