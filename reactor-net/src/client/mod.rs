//! HTTP client & endpoint pool (§4.C7): per-endpoint connection pooling,
//! a short-circuiting interceptor chain, and WebSocket upgrade.

mod interceptor;
mod pool;
mod websocket;

pub use interceptor::{run_client_chain, ClientInterceptor};
pub use pool::{Capacity, EndpointPool, Lease};
pub use websocket::UpgradeRequest;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::exchange::{Exchange, Request};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// A single outbound request/response round trip, built and short-circuited
/// the same way interceptors short-circuit on the server side.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, lease: &Lease, request: Request) -> Result<http::Response<bytes::Bytes>>;
}

/// Ties a [`ClientConfig`] to one [`EndpointPool`] per endpoint and runs
/// the client-side interceptor chain ahead of dispatch.
pub struct Client {
    config: ClientConfig,
    pools: DashMap<SocketAddr, Arc<EndpointPool>>,
    interceptors: Vec<Arc<dyn ClientInterceptor>>,
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            pools: DashMap::new(),
            interceptors: Vec::new(),
            transport,
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn ClientInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    fn pool_for(&self, endpoint: SocketAddr) -> Arc<EndpointPool> {
        Arc::clone(&self.pools.entry(endpoint).or_insert_with(|| {
            Arc::new(EndpointPool::new(
                endpoint,
                self.config.max_connections_per_endpoint,
                Duration::from_secs(self.config.idle_timeout_secs),
            ))
        }))
    }

    /// Runs the interceptor chain, then (unless an interceptor already
    /// committed a response) acquires a pooled connection and dispatches.
    pub async fn send(&self, endpoint: SocketAddr, capacity: Capacity, request: Request) -> Result<Exchange> {
        let exchange = Exchange::new(request);
        let exchange = run_client_chain(&self.interceptors, exchange).await?;
        if exchange.response.is_committed() {
            return Ok(exchange);
        }

        let pool = self.pool_for(endpoint);
        let lease = pool
            .acquire(capacity, Duration::from_secs(self.config.acquire_timeout_secs))
            .await?;
        tracing::debug!(endpoint = %lease.endpoint(), "dispatching request over pooled connection");
        let raw_response = self.transport.send(&lease, exchange.request.clone()).await?;
        let (parts, body) = raw_response.into_parts();
        let mut exchange = exchange;
        exchange.response.set_status(parts.status)?;
        for (name, value) in parts.headers.iter() {
            exchange.response.set_header(name.clone(), value.clone())?;
        }
        exchange.response.commit(crate::exchange::BodyProducer::Raw(Box::pin(futures::stream::once(
            async move { Ok(body) },
        ))))?;
        exchange.complete();
        Ok(exchange)
    }

    /// Periodic maintenance hook: evicts idle connections from every pool
    /// this client has opened. Intended to run on a `tokio::time::interval`
    /// owned by the caller.
    pub async fn reap_idle_connections(&self) {
        for entry in self.pools.iter() {
            entry.value().reap_idle().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::BodyProducer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, _lease: &Lease, _request: Request) -> Result<http::Response<bytes::Bytes>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(http::Response::builder().status(200).body(bytes::Bytes::from_static(b"ok")).unwrap())
        }
    }

    #[tokio::test]
    async fn dispatches_through_the_pool_when_no_interceptor_short_circuits() {
        let transport = Arc::new(EchoTransport { calls: AtomicUsize::new(0) });
        let client = Client::new(ClientConfig::default(), transport.clone());
        let request = Request::builder().method(http::Method::GET).authority("example.test").build();
        let exchange = client
            .send("127.0.0.1:9001".parse().unwrap(), Capacity::Http1, request)
            .await
            .unwrap();
        assert_eq!(exchange.response.status(), http::StatusCode::OK);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn an_interceptor_commit_skips_the_transport_entirely() {
        let transport = Arc::new(EchoTransport { calls: AtomicUsize::new(0) });
        let cache_hit: Arc<dyn ClientInterceptor> = Arc::new(|mut exchange: Exchange| async move {
            exchange.response.commit(BodyProducer::Empty)?;
            Ok(exchange)
        });
        let client = Client::new(ClientConfig::default(), transport.clone()).with_interceptor(cache_hit);
        let request = Request::builder().build();
        client
            .send("127.0.0.1:9002".parse().unwrap(), Capacity::Http1, request)
            .await
            .unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
