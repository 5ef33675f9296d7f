//! # reactor-net
//!
//! A modular reactive network stack: an HTTP/1.x and HTTP/2 connection
//! engine, a gRPC framing layer over HTTP/2, an HTTP client with a
//! per-origin connection pool, a service discovery pipeline with
//! pluggable resolvers and traffic load-balancers, and a request router.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reactor_net::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load_for_service("example")?;
//!     let addr = "0.0.0.0:8080".parse().unwrap();
//!     Server::new(config).serve(addr).await
//! }
//! ```

pub mod balancer;
pub mod body;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod exchange;
pub mod grpc;
pub mod header;
pub mod http1;
pub mod http2;
pub mod integration;
pub mod router;
pub mod server;
pub mod sse;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::balancer::{LoadBalancer, Random, RoundRobin, TrafficPolicy, WeightedRandom};
    pub use crate::body::{decode_urlencoded, MultipartDecoder, Part as MultipartPart};
    pub use crate::config::Config;
    pub use crate::discovery::{
        CachingDiscoveryService, CompositeDiscoveryService, DiscoveryService, Service,
        ServiceID, ServiceInstance,
    };
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::exchange::{Exchange, ErrorExchange, Handler, Request, Response};
    pub use crate::header::{self, Header};
    pub use crate::router::Router;
    pub use crate::server::Server;

    pub use bytes::Bytes;
    pub use http::{Method, StatusCode, Uri};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}
