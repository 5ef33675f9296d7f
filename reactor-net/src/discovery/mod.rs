//! Service discovery pipeline (§4.C8): scheme-dispatched resolvers,
//! composite fan-out, TTL caching with scheduled refresh, and graceful
//! instance draining.

mod caching;
mod composite;
mod config_discovery;
mod dns_discovery;
mod instance;
mod service;
mod service_id;

pub use caching::CachingDiscoveryService;
pub use composite::CompositeDiscoveryService;
pub use config_discovery::{ConfigDiscoveryService, HostPortListReader, ServiceDescriptorReader};
pub use dns_discovery::{DnsDiscoveryService, HostResolver, SystemResolver};
pub use instance::ServiceInstance;
pub use service::Service;
pub use service_id::ServiceID;

use crate::balancer::TrafficPolicy;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A resolver from a [`ServiceID`] to a live [`Service`] (§4.C8). Scheme
/// matching is case-sensitive; an unsupported scheme fails with
/// `ILLEGAL_SCHEME`.
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    fn supported_schemes(&self) -> &[&str];

    async fn resolve(&self, id: &ServiceID, policy: TrafficPolicy) -> Result<Arc<Service>>;

    /// Re-reads the current instance set for an already-resolved service,
    /// without constructing a new `Service`. Used by [`CachingDiscoveryService`]'s
    /// scheduled refresh.
    async fn refresh(&self, service: &Service) -> Result<Vec<ServiceInstance>>;
}
