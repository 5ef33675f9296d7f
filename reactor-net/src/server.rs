//! The server façade: binds a listener, drives the HTTP/1.x and HTTP/2
//! connection engines against a [`Router`], and shuts down gracefully.

use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::exchange::{run_chain, BodyProducer, ErrorHandler, Exchange, Handler, Interceptor, Request};
use crate::http1::{detect_h2c_upgrade, parse_request_head, ChunkedDecoder, ChunkedEvent, HttpVersion, PipelineQueue};
use crate::http2::{Frame, FrameType, FlowWindow, HpackDecoder, HpackEncoder, Settings, StreamTable, FLAG_ACK, FLAG_END_HEADERS, FLAG_END_STREAM};
use crate::router::{MatchInput, Router, RouteBuilder};
use bytes::{Bytes, BytesMut};
use http::{Method, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const H2_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Writes a plain-text error response, classified only by the error's HTTP
/// status mapping (§4.C12 "default error handler").
struct DefaultErrorHandler;

#[async_trait::async_trait]
impl ErrorHandler for DefaultErrorHandler {
    async fn handle_error(&self, error_exchange: crate::exchange::ErrorExchange) -> Result<Exchange> {
        let crate::exchange::ErrorExchange { request, mut response, context, error } = error_exchange;
        response.set_status(error.kind.status_code())?;
        response.set_header(http::header::CONTENT_TYPE, http::HeaderValue::from_static("text/plain; charset=utf-8"))?;
        let body = Bytes::from(error.message.clone());
        response.commit(BodyProducer::Raw(Box::pin(futures::stream::once(async move { Ok(body) }))))?;
        Ok(Exchange::from_parts(request, response, context, crate::exchange::Disposition::Failed(error.to_string())))
    }
}

/// Hosts the connection engines and dispatches matched requests into a
/// [`Router`]. Constructed with [`Server::new`], wired up with
/// [`Server::route`]/[`Server::intercept`], then consumed by [`Server::serve`].
pub struct Server {
    config: Config,
    router: Router<Arc<dyn Handler>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            router: Router::new(),
            interceptors: Vec::new(),
            error_handler: Arc::new(DefaultErrorHandler),
        }
    }

    pub fn route(mut self, builder: RouteBuilder, handler: Arc<dyn Handler>) -> Self {
        self.router.insert(builder, handler);
        self
    }

    pub fn intercept(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Binds `addr` and serves until a shutdown signal arrives, then
    /// drains in-flight connections before returning.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let shared = Arc::new(Shared {
            router: self.router,
            interceptors: self.interceptors,
            error_handler: self.error_handler,
            config: self.config,
        });

        let listener = TcpListener::bind(addr).await.map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
        tracing::info!(%addr, "reactor-net server listening");

        let mut connections = tokio::task::JoinSet::new();
        let mut shutdown = Box::pin(shutdown_signal());

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, peer) = accepted.map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
                    let shared = Arc::clone(&shared);
                    connections.spawn(async move {
                        if let Err(error) = serve_connection(socket, peer, shared).await {
                            tracing::debug!(%peer, %error, "connection terminated");
                        }
                    });
                }
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received, draining in-flight connections");
                    break;
                }
            }
        }

        drop(listener);
        while connections.join_next().await.is_some() {}
        tracing::info!("server shutdown complete");
        Ok(())
    }
}

struct Shared {
    router: Router<Arc<dyn Handler>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    error_handler: Arc<dyn ErrorHandler>,
    config: Config,
}

/// Resolves a route, runs the interceptor chain and handler, and falls
/// back to the configured [`ErrorHandler`] on failure (§4.C10 + §4.C11
/// wired together, §4.C12).
async fn dispatch(shared: &Shared, request: Request) -> Result<Exchange> {
    let content_type = request
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| crate::header::parse_content_type(raw).ok());
    let accept = request.headers.get(http::header::ACCEPT).and_then(|v| v.to_str().ok());
    let accept_language = request.headers.get(http::header::ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok());

    let input = MatchInput {
        path: &request.normalized_path,
        method: &request.method,
        content_type: content_type.as_ref(),
        accept,
        accept_language,
    };
    let handler = shared.router.resolve(&input).cloned();
    let exchange = Exchange::new(request);
    tracing::debug!(request_id = %exchange.context.request_id(), path = %exchange.request.normalized_path, "dispatching request");

    let outcome = match handler {
        Some(handler) => run_chain(&shared.interceptors, handler.as_ref(), exchange).await,
        None => Err(Error::new(ErrorKind::NotFound, "no route matched this request")),
    };

    match outcome {
        Ok(exchange) => Ok(exchange),
        Err(error) => {
            let placeholder = Exchange::new(Request::builder().build());
            let error_exchange = match placeholder.into_error_exchange(error) {
                Ok(error_exchange) => error_exchange,
                Err(exchange) => return Ok(exchange),
            };
            shared.error_handler.handle_error(error_exchange).await
        }
    }
}

// ---------------------------------------------------------------------
// HTTP/1.x connection driving
// ---------------------------------------------------------------------

async fn serve_connection(mut socket: TcpStream, peer: SocketAddr, shared: Arc<Shared>) -> Result<()> {
    let local = socket.local_addr().ok();
    let mut buf = BytesMut::new();
    let mut read_chunk = [0u8; 8192];

    while buf.len() < H2_PREFACE.len() {
        let n = socket
            .read(&mut read_chunk)
            .await
            .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&read_chunk[..n]);
    }

    if buf.starts_with(H2_PREFACE) {
        serve_http2(socket, buf, peer, local, shared).await
    } else {
        serve_http1(socket, buf, peer, local, shared).await
    }
}

async fn serve_http1(
    mut socket: TcpStream,
    mut buf: BytesMut,
    peer: SocketAddr,
    local: Option<SocketAddr>,
    shared: Arc<Shared>,
) -> Result<()> {
    let pipeline = PipelineQueue::new();
    let mut read_chunk = [0u8; 8192];
    let max_header_line_bytes = shared.config.http1.max_header_line_bytes;
    let max_header_count = shared.config.http1.max_header_count;

    loop {
        let (head, consumed) = loop {
            match parse_request_head(&buf, max_header_line_bytes, max_header_count) {
                Ok(Some(parsed)) => break parsed,
                Ok(None) => {
                    let n = socket
                        .read(&mut read_chunk)
                        .await
                        .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
                    if n == 0 {
                        return Ok(());
                    }
                    buf.extend_from_slice(&read_chunk[..n]);
                }
                Err(error) => {
                    write_status_only(&mut socket, error.kind.status_code()).await?;
                    return Ok(());
                }
            }
        };
        let _ = buf.split_to(consumed);

        if let Ok(Some(_upgrade)) = detect_h2c_upgrade(&head) {
            write_switching_protocols(&mut socket).await?;
            return serve_http2(socket, buf, peer, local, shared).await;
        }

        let content_length: Option<usize> = head
            .headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let is_chunked = head
            .headers
            .get(http::header::TRANSFER_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("chunked"))
            .unwrap_or(false);

        let body_bytes = if is_chunked {
            let mut decoder = ChunkedDecoder::new();
            decoder.feed(&buf);
            buf.clear();
            let mut collected = BytesMut::new();
            loop {
                match decoder.next_event()? {
                    Some(ChunkedEvent::Data(chunk)) => collected.extend_from_slice(&chunk),
                    Some(ChunkedEvent::End(_trailers)) => break,
                    None => {
                        let n = socket
                            .read(&mut read_chunk)
                            .await
                            .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
                        if n == 0 {
                            break;
                        }
                        decoder.feed(&read_chunk[..n]);
                    }
                }
            }
            collected.freeze()
        } else if let Some(len) = content_length {
            while buf.len() < len {
                let n = socket
                    .read(&mut read_chunk)
                    .await
                    .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&read_chunk[..n]);
            }
            let take = len.min(buf.len());
            buf.split_to(take).freeze()
        } else {
            Bytes::new()
        };

        let keep_alive = head.version == HttpVersion::Http11
            && !head
                .headers
                .get(http::header::CONNECTION)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.eq_ignore_ascii_case("close"))
                .unwrap_or(false);

        let mut builder = Request::builder()
            .method(head.method.clone())
            .scheme("http")
            .path_and_query(&head.raw_target)
            .remote_addr(peer);
        if let Some(local) = local {
            builder = builder.local_addr(local);
        }
        for (name, value) in head.headers.iter() {
            builder = builder.header(name.clone(), value.clone());
        }
        if let Some(host) = head.headers.get(http::header::HOST).and_then(|v| v.to_str().ok()) {
            builder = builder.authority(host);
        }
        if Request::method_allows_body(&head.method) && !body_bytes.is_empty() {
            builder = builder.body(Box::pin(futures::stream::once(async move { Ok(body_bytes) })));
        }
        let request = builder.build();

        let ticket = pipeline.next_ticket();
        let exchange = dispatch(&shared, request).await?;
        ticket.wait_turn().await;
        write_response(&mut socket, exchange, keep_alive).await?;
        ticket.complete();

        if !keep_alive {
            return Ok(());
        }
    }
}

async fn write_status_only<W: AsyncWriteExt + Unpin>(socket: &mut W, status: StatusCode) -> Result<()> {
    let line = format!(
        "HTTP/1.1 {} {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    socket
        .write_all(line.as_bytes())
        .await
        .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))
}

async fn write_switching_protocols<W: AsyncWriteExt + Unpin>(socket: &mut W) -> Result<()> {
    socket
        .write_all(b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: h2c\r\n\r\n")
        .await
        .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))
}

async fn write_response<W: AsyncWriteExt + Unpin>(socket: &mut W, exchange: Exchange, keep_alive: bool) -> Result<()> {
    let status = exchange.response.status();
    let mut header_block = String::new();
    header_block.push_str(&format!("HTTP/1.1 {} {}\r\n", status.as_u16(), status.canonical_reason().unwrap_or("")));
    for (name, value) in exchange.response.headers().iter() {
        header_block.push_str(name.as_str());
        header_block.push_str(": ");
        header_block.push_str(value.to_str().unwrap_or(""));
        header_block.push_str("\r\n");
    }

    let body_bytes = render_body(exchange.response.into_body()).await?;
    header_block.push_str(&format!("content-length: {}\r\n", body_bytes.len()));
    header_block.push_str(if keep_alive { "connection: keep-alive\r\n" } else { "connection: close\r\n" });
    header_block.push_str("\r\n");

    socket
        .write_all(header_block.as_bytes())
        .await
        .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
    socket
        .write_all(&body_bytes)
        .await
        .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
    Ok(())
}

/// Buffers a [`BodyProducer`] into one chunk of bytes. Streaming bodies
/// (`Raw`/`Strings`/`Sse`) are drained to completion rather than written
/// incrementally — acceptable for the request/response sizes this engine
/// targets, but it does mean a response never starts flushing before its
/// producer has finished.
async fn render_body(body: BodyProducer) -> Result<Bytes> {
    use futures::StreamExt;
    match body {
        BodyProducer::Empty => Ok(Bytes::new()),
        BodyProducer::Raw(mut stream) => {
            let mut collected = BytesMut::new();
            while let Some(chunk) = stream.next().await {
                collected.extend_from_slice(&chunk?);
            }
            Ok(collected.freeze())
        }
        BodyProducer::Strings(mut stream) => {
            let mut collected = String::new();
            while let Some(chunk) = stream.next().await {
                collected.push_str(&chunk?);
            }
            Ok(Bytes::from(collected))
        }
        BodyProducer::Resource(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|_| Error::new(ErrorKind::NotFound, "resource not found")),
        BodyProducer::Sse(mut stream) => {
            let mut events = Vec::new();
            while let Some(event) = stream.next().await {
                events.push(event);
            }
            Ok(crate::sse::encode_batch(&events))
        }
    }
}

// ---------------------------------------------------------------------
// HTTP/2 connection driving (h2c upgrade and prior-knowledge)
// ---------------------------------------------------------------------

async fn serve_http2(
    mut socket: TcpStream,
    mut buf: BytesMut,
    peer: SocketAddr,
    _local: Option<SocketAddr>,
    shared: Arc<Shared>,
) -> Result<()> {
    let mut read_chunk = [0u8; 8192];

    while buf.len() < H2_PREFACE.len() {
        let n = socket
            .read(&mut read_chunk)
            .await
            .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&read_chunk[..n]);
    }
    if !buf.starts_with(H2_PREFACE) {
        return Err(Error::new(ErrorKind::BadRequest, "missing HTTP/2 connection preface"));
    }
    let _ = buf.split_to(H2_PREFACE.len());

    let local_settings = Settings::from_config(&shared.config.http2);
    socket
        .write_all(&Frame::new(FrameType::Settings, 0, 0, local_settings.encode()).encode())
        .await
        .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;

    let mut peer_settings = Settings::default();
    let mut hpack_decoder = HpackDecoder::new(peer_settings.header_table_size as usize);
    let mut hpack_encoder = HpackEncoder::new(local_settings.header_table_size as usize);
    let mut streams = StreamTable::new(local_settings.max_concurrent_streams);
    let mut connection_window = FlowWindow::new(local_settings.initial_window_size, shared.config.http2.window_update_threshold_pct);

    loop {
        let (frame, consumed) = loop {
            match Frame::decode(&buf, local_settings.max_frame_size) {
                Ok(Some(parsed)) => break parsed,
                Ok(None) => {
                    let n = socket
                        .read(&mut read_chunk)
                        .await
                        .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
                    if n == 0 {
                        return Ok(());
                    }
                    buf.extend_from_slice(&read_chunk[..n]);
                }
                Err(_) => return Ok(()),
            }
        };
        let _ = buf.split_to(consumed);

        match frame.header.frame_type {
            FrameType::Settings => {
                if !frame.has_flag(FLAG_ACK) {
                    peer_settings.apply_frame_payload(&frame.payload)?;
                    socket
                        .write_all(&Frame::new(FrameType::Settings, FLAG_ACK, 0, Bytes::new()).encode())
                        .await
                        .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
                }
            }
            FrameType::Data => {
                if connection_window.record_inbound(frame.payload.len() as u32) {
                    let increment = connection_window.take_window_update();
                    let mut payload = BytesMut::with_capacity(4);
                    payload.extend_from_slice(&increment.to_be_bytes());
                    socket
                        .write_all(&Frame::new(FrameType::WindowUpdate, 0, 0, payload.freeze()).encode())
                        .await
                        .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
                }
            }
            FrameType::Headers => {
                streams.open(frame.header.stream_id).ok();
                let headers = hpack_decoder.decode(&frame.payload)?;
                let request = headers_to_request(&headers, peer);
                let exchange = dispatch(&shared, request).await?;
                let response_headers = response_to_headers(&exchange);
                let body = render_body(exchange.response.into_body()).await.unwrap_or_default();

                let header_block = hpack_encoder.encode(&response_headers);
                socket
                    .write_all(&Frame::new(FrameType::Headers, FLAG_END_HEADERS, frame.header.stream_id, header_block).encode())
                    .await
                    .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
                socket
                    .write_all(&Frame::new(FrameType::Data, FLAG_END_STREAM, frame.header.stream_id, body).encode())
                    .await
                    .map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;
                streams.mark_end_stream_received(frame.header.stream_id);
                streams.mark_end_stream_sent(frame.header.stream_id);
            }
            FrameType::GoAway => return Ok(()),
            FrameType::RstStream => streams.reset(frame.header.stream_id),
            FrameType::WindowUpdate | FrameType::Ping | FrameType::Priority | FrameType::PushPromise | FrameType::Continuation | FrameType::Unknown(_) => {}
        }
    }
}

fn headers_to_request(headers: &[(String, String)], peer: SocketAddr) -> Request {
    let mut method = Method::GET;
    let mut path = "/".to_string();
    let mut authority = String::new();
    let mut scheme = "https".to_string();
    let mut builder = Request::builder().remote_addr(peer);
    for (name, value) in headers {
        match name.as_str() {
            ":method" => method = Method::from_bytes(value.as_bytes()).unwrap_or(Method::GET),
            ":path" => path = value.clone(),
            ":authority" => authority = value.clone(),
            ":scheme" => scheme = value.clone(),
            _ => {
                if let (Ok(name), Ok(value)) = (http::HeaderName::from_bytes(name.as_bytes()), http::HeaderValue::from_str(value)) {
                    builder = builder.header(name, value);
                }
            }
        }
    }
    builder.method(method).scheme(scheme).authority(authority).path_and_query(&path).build()
}

fn response_to_headers(exchange: &Exchange) -> Vec<(String, String)> {
    let mut headers = vec![(":status".to_string(), exchange.response.status().as_u16().to_string())];
    for (name, value) in exchange.response.headers().iter() {
        if let Ok(value) = value.to_str() {
            headers.push((name.as_str().to_string(), value.to_string()));
        }
    }
    headers
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_exposes_the_config_it_was_built_with() {
        let config = Config::default();
        let server = Server::new(config.clone());
        assert_eq!(server.config().http1.max_header_line_bytes, config.http1.max_header_line_bytes);
    }
}
