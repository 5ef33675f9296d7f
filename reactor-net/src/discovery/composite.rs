use super::service::Service;
use super::service_id::ServiceID;
use super::DiscoveryService;
use crate::balancer::TrafficPolicy;
use crate::error::{Error, ErrorKind, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Dispatches to the first child whose `supported_schemes()` contains the
/// requested scheme, in construction order (§4.C8 "CompositeDiscoveryService").
pub struct CompositeDiscoveryService {
    children: Vec<Arc<dyn DiscoveryService>>,
}

impl CompositeDiscoveryService {
    pub fn new(children: Vec<Arc<dyn DiscoveryService>>) -> Self {
        Self { children }
    }

    fn child_for(&self, scheme: &str) -> Option<&Arc<dyn DiscoveryService>> {
        self.children
            .iter()
            .find(|c| c.supported_schemes().iter().any(|s| *s == scheme))
    }
}

#[async_trait]
impl DiscoveryService for CompositeDiscoveryService {
    fn supported_schemes(&self) -> &[&str] {
        &[]
    }

    async fn resolve(&self, id: &ServiceID, policy: TrafficPolicy) -> Result<Arc<Service>> {
        match self.child_for(id.scheme()) {
            Some(child) => child.resolve(id, policy).await,
            None => Err(Error::new(
                ErrorKind::IllegalScheme,
                format!("no discovery service supports scheme '{}'", id.scheme()),
            )),
        }
    }

    async fn refresh(&self, service: &Service) -> Result<Vec<super::instance::ServiceInstance>> {
        match self.child_for(service.id().scheme()) {
            Some(child) => child.refresh(service).await,
            None => Err(Error::new(
                ErrorKind::IllegalScheme,
                format!("no discovery service supports scheme '{}'", service.id().scheme()),
            )),
        }
    }
}
