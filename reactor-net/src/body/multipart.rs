//! `multipart/form-data` streaming decoder (§4.C2).
//!
//! Consumes an async byte source and the boundary parameter from the
//! request's `Content-Type`, and yields a lazy, finite, non-restartable
//! sequence of [`Part`]s. Each part's body is single-subscription: taking
//! it twice, or taking it after the decoder has already moved past the
//! part, fails with `STREAM_CONTENTION`.

use crate::error::{Error, ErrorKind, Result};
use crate::header::ContentDisposition;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncRead;
use tokio::sync::Mutex as AsyncMutex;

const READ_CHUNK: usize = 8192;

/// Type-erased async byte source, so `Part`/`PartBody` — which outlive the
/// call site that picked a concrete reader type — stay non-generic.
type ErasedReader = Pin<Box<dyn AsyncRead + Send>>;

struct Shared {
    source: ErasedReader,
    buffer: BytesMut,
    boundary_marker: Vec<u8>, // b"--<boundary>"
    eof: bool,
    closed: bool,
}

impl Shared {
    async fn fill(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        let mut tmp = [0u8; READ_CHUNK];
        use tokio::io::AsyncReadExt;
        let n = self
            .source
            .read(&mut tmp)
            .await
            .map_err(|e| Error::new(ErrorKind::Internal, format!("multipart read error: {e}")))?;
        if n == 0 {
            self.eof = true;
            Ok(false)
        } else {
            self.buffer.extend_from_slice(&tmp[..n]);
            Ok(true)
        }
    }

    /// Reads and discards bytes until the next boundary line, without
    /// surfacing them as a `Part`. Used to silently release a part's
    /// remaining body when the caller never subscribed to it.
    async fn drain_to_next_boundary(&mut self) -> Result<()> {
        loop {
            if find_boundary(&self.buffer, &self.boundary_marker).is_some() {
                return Ok(());
            }
            if !self.fill().await? {
                return Err(Error::new(
                    ErrorKind::BadRequest,
                    "multipart stream ended before boundary",
                ));
            }
        }
    }

    /// Pulls the next chunk of the current part's body, stopping at (and
    /// not including) the boundary delimiter.
    async fn next_body_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(pos) = find_boundary(&self.buffer, &self.boundary_marker) {
                if pos == 0 {
                    return Ok(None);
                }
                let chunk = self.buffer.split_to(pos).freeze();
                return Ok(Some(chunk));
            }
            // Keep enough trailing bytes unconsumed that a boundary split
            // across fill() calls is never missed; emit everything else.
            let safe = self.buffer.len().saturating_sub(self.boundary_marker.len() + 2);
            if safe > 0 {
                let chunk = self.buffer.split_to(safe).freeze();
                return Ok(Some(chunk));
            }
            if !self.fill().await? {
                return Err(Error::new(
                    ErrorKind::BadRequest,
                    "multipart stream ended before boundary",
                ));
            }
        }
    }

    /// Consumes the boundary line itself (`--boundary\r\n` or the
    /// terminal `--boundary--`), returning whether it was terminal.
    async fn consume_boundary_line(&mut self) -> Result<bool> {
        loop {
            if let Some(pos) = find_boundary(&self.buffer, &self.boundary_marker) {
                let after = pos + self.boundary_marker.len();
                loop {
                    if self.buffer.len() >= after + 2 {
                        let is_terminal = &self.buffer[after..after + 2] == b"--";
                        let line_end = find_crlf(&self.buffer, after)
                            .ok_or_else(|| Error::new(ErrorKind::BadRequest, "malformed boundary line"))?;
                        self.buffer = self.buffer.split_off(line_end + 2);
                        return Ok(is_terminal);
                    }
                    if !self.fill().await? {
                        return Err(Error::new(ErrorKind::BadRequest, "truncated boundary line"));
                    }
                }
            }
            if !self.fill().await? {
                return Err(Error::new(ErrorKind::BadRequest, "missing multipart boundary"));
            }
        }
    }

    async fn read_headers(&mut self) -> Result<Vec<(String, String)>> {
        let mut headers = Vec::new();
        loop {
            let line_end = loop {
                if let Some(end) = find_crlf(&self.buffer, 0) {
                    break end;
                }
                if !self.fill().await? {
                    return Err(Error::new(ErrorKind::BadRequest, "truncated part headers"));
                }
            };
            let line = self.buffer.split_to(line_end).freeze();
            self.buffer = self.buffer.split_off(2); // drop CRLF
            if line.is_empty() {
                return Ok(headers);
            }
            let text = std::str::from_utf8(&line)
                .map_err(|_| Error::new(ErrorKind::MalformedHeader, "non-UTF-8 part header"))?;
            let (name, value) = text
                .split_once(':')
                .ok_or_else(|| Error::new(ErrorKind::MalformedHeader, "part header missing ':'"))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
}

fn find_boundary(buf: &[u8], marker: &[u8]) -> Option<usize> {
    memchr::memmem::find(buf, marker)
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    memchr::memmem::find(&buf[from.min(buf.len())..], b"\r\n").map(|p| p + from)
}

/// A lazy streaming decoder over one `multipart/form-data` body.
pub struct MultipartDecoder {
    shared: Arc<AsyncMutex<Shared>>,
    active_part: Arc<AtomicBool>,
    done: bool,
}

impl MultipartDecoder {
    pub fn new<R: AsyncRead + Send + 'static>(source: R, boundary: &str) -> Self {
        let mut marker = b"--".to_vec();
        marker.extend_from_slice(boundary.as_bytes());
        Self {
            shared: Arc::new(AsyncMutex::new(Shared {
                source: Box::pin(source),
                buffer: BytesMut::new(),
                boundary_marker: marker,
                eof: false,
                closed: false,
            })),
            active_part: Arc::new(AtomicBool::new(false)),
            done: false,
        }
    }

    /// Advances to the next part. Any unread bytes of the previous part's
    /// body are silently released first (§4.C2 invariant).
    pub async fn next_part(&mut self) -> Result<Option<Part>> {
        if self.done {
            return Ok(None);
        }
        let mut shared = self.shared.lock().await;
        if shared.closed {
            self.done = true;
            return Ok(None);
        }
        if self.active_part.swap(false, Ordering::SeqCst) {
            shared.drain_to_next_boundary().await?;
        }
        let terminal = shared.consume_boundary_line().await?;
        if terminal {
            shared.closed = true;
            self.done = true;
            return Ok(None);
        }
        let headers = shared.read_headers().await?;
        drop(shared);

        let mut name = None;
        let mut filename = None;
        if let Some((_, value)) = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-disposition"))
        {
            if let Ok(cd) = crate::header::decode("content-disposition", value) {
                if let crate::header::Decoded::ContentDisposition(ContentDisposition {
                    name: n,
                    filename: f,
                    ..
                }) = cd.decoded
                {
                    name = n;
                    filename = f;
                }
            }
        }

        self.active_part.store(true, Ordering::SeqCst);
        Ok(Some(Part {
            headers,
            name,
            filename,
            shared: self.shared.clone(),
            active_part: self.active_part.clone(),
            taken: Arc::new(AtomicBool::new(false)),
        }))
    }
}

/// One decoded multipart part: headers plus a single-subscription byte
/// stream body.
pub struct Part {
    pub headers: Vec<(String, String)>,
    pub name: Option<String>,
    pub filename: Option<String>,
    shared: Arc<AsyncMutex<Shared>>,
    active_part: Arc<AtomicBool>,
    taken: Arc<AtomicBool>,
}

impl Part {
    /// Subscribes to this part's body. Returns `STREAM_CONTENTION` if
    /// already subscribed.
    pub fn body(&self) -> Result<PartBody> {
        if self.taken.swap(true, Ordering::SeqCst) {
            return Err(Error::new(
                ErrorKind::StreamContention,
                "multipart part body already subscribed",
            ));
        }
        Ok(PartBody {
            shared: self.shared.clone(),
            active_part: self.active_part.clone(),
            finished: false,
            fut: None,
        })
    }
}

type NextChunkFuture =
    Pin<Box<dyn Future<Output = Result<Option<Bytes>>> + Send>>;

/// The byte stream for one [`Part`]'s body.
impl std::fmt::Debug for PartBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartBody").field("finished", &self.finished).finish()
    }
}

pub struct PartBody {
    shared: Arc<AsyncMutex<Shared>>,
    active_part: Arc<AtomicBool>,
    finished: bool,
    fut: Option<NextChunkFuture>,
}

impl Stream for PartBody {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        if self.fut.is_none() {
            let shared = self.shared.clone();
            self.fut = Some(Box::pin(async move {
                let mut guard = shared.lock().await;
                guard.next_body_chunk().await
            }));
        }
        let fut = self.fut.as_mut().unwrap();
        match fut.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                self.fut = None;
                match result {
                    Ok(Some(chunk)) => Poll::Ready(Some(Ok(chunk))),
                    Ok(None) => {
                        self.finished = true;
                        self.active_part.store(false, Ordering::SeqCst);
                        Poll::Ready(None)
                    }
                    Err(e) => {
                        self.finished = true;
                        Poll::Ready(Some(Err(e)))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Cursor;
    use std::task::{Context as StdContext, Poll as StdPoll};
    use tokio::io::ReadBuf;

    /// Wraps a synchronous in-memory reader as `AsyncRead`; every poll
    /// completes immediately since the underlying `Cursor` never blocks.
    struct TestReader(Cursor<Vec<u8>>);

    impl AsyncRead for TestReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut StdContext<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> StdPoll<std::io::Result<()>> {
            use std::io::Read;
            let mut tmp = vec![0u8; buf.remaining()];
            let n = self.0.read(&mut tmp)?;
            buf.put_slice(&tmp[..n]);
            StdPoll::Ready(Ok(()))
        }
    }

    fn sample() -> Vec<u8> {
        concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"field1\"\r\n",
            "\r\n",
            "value1\r\n",
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "hello world\r\n",
            "--BOUNDARY--\r\n",
        )
        .as_bytes()
        .to_vec()
    }

    #[tokio::test]
    async fn decodes_all_parts_in_order() {
        let cursor = TestReader(Cursor::new(sample()));
        let mut decoder = MultipartDecoder::new(cursor, "BOUNDARY");

        let part1 = decoder.next_part().await.unwrap().unwrap();
        assert_eq!(part1.name.as_deref(), Some("field1"));
        let body1: Vec<u8> = part1
            .body()
            .unwrap()
            .map(|c| c.unwrap().to_vec())
            .collect::<Vec<_>>()
            .await
            .concat();
        assert_eq!(body1, b"value1");

        let part2 = decoder.next_part().await.unwrap().unwrap();
        assert_eq!(part2.name.as_deref(), Some("file"));
        assert_eq!(part2.filename.as_deref(), Some("a.txt"));
        let body2: Vec<u8> = part2
            .body()
            .unwrap()
            .map(|c| c.unwrap().to_vec())
            .collect::<Vec<_>>()
            .await
            .concat();
        assert_eq!(body2, b"hello world");

        assert!(decoder.next_part().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unread_part_is_silently_released_before_next() {
        let cursor = TestReader(Cursor::new(sample()));
        let mut decoder = MultipartDecoder::new(cursor, "BOUNDARY");

        let _part1 = decoder.next_part().await.unwrap().unwrap();
        // Never touch part1's body.
        let part2 = decoder.next_part().await.unwrap().unwrap();
        assert_eq!(part2.name.as_deref(), Some("file"));
    }

    #[tokio::test]
    async fn double_subscription_fails_with_stream_contention() {
        let cursor = TestReader(Cursor::new(sample()));
        let mut decoder = MultipartDecoder::new(cursor, "BOUNDARY");
        let part1 = decoder.next_part().await.unwrap().unwrap();
        let _first = part1.body().unwrap();
        let err = part1.body().unwrap_err();
        assert_eq!(err.kind, ErrorKind::StreamContention);
    }
}
