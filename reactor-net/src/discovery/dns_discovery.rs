use super::instance::ServiceInstance;
use super::service::Service;
use super::service_id::ServiceID;
use super::DiscoveryService;
use crate::balancer::TrafficPolicy;
use crate::error::{Error, ErrorKind, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;

/// Resolves a host to socket addresses. The default implementation defers
/// to the OS resolver via `tokio::net::lookup_host`; tests inject a
/// deterministic stub.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>>;
}

pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        tokio::net::lookup_host((host, port))
            .await
            .map(|it| it.collect())
            .map_err(Error::from)
    }
}

/// Resolves the ServiceID's host to a set of socket addresses via an
/// injected resolver; each address becomes one [`ServiceInstance`]
/// (§4.C8 "AbstractDnsDiscoveryService").
pub struct DnsDiscoveryService {
    scheme: &'static str,
    default_port: u16,
    resolver: Arc<dyn HostResolver>,
    policy: TrafficPolicy,
}

impl DnsDiscoveryService {
    pub fn new(
        scheme: &'static str,
        default_port: u16,
        resolver: Arc<dyn HostResolver>,
        policy: TrafficPolicy,
    ) -> Self {
        Self {
            scheme,
            default_port,
            resolver,
            policy,
        }
    }

    fn host_port(id: &ServiceID) -> Result<(String, u16)> {
        let authority = id
            .authority()
            .ok_or_else(|| Error::new(ErrorKind::IllegalScheme, "DNS discovery requires an authority"))?;
        match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port
                    .parse()
                    .map_err(|_| Error::new(ErrorKind::BadRequest, format!("invalid port in '{authority}'")))?;
                Ok((host.to_string(), port))
            }
            None => Ok((authority.to_string(), 0)),
        }
    }
}

#[async_trait]
impl DiscoveryService for DnsDiscoveryService {
    fn supported_schemes(&self) -> &[&str] {
        std::slice::from_ref(&self.scheme)
    }

    async fn resolve(&self, id: &ServiceID, _policy: TrafficPolicy) -> Result<Arc<Service>> {
        let instances = self.refresh_for(id).await?;
        Ok(Service::new(id.clone(), self.policy, instances))
    }

    async fn refresh(&self, service: &Service) -> Result<Vec<ServiceInstance>> {
        self.refresh_for(service.id()).await
    }
}

impl DnsDiscoveryService {
    async fn refresh_for(&self, id: &ServiceID) -> Result<Vec<ServiceInstance>> {
        let (host, port) = Self::host_port(id)?;
        let port = if port == 0 { self.default_port } else { port };
        let addrs = self.resolver.lookup(&host, port).await?;
        Ok(addrs.into_iter().map(ServiceInstance::new).collect())
    }
}
