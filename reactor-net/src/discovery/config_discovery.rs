use super::instance::ServiceInstance;
use super::service::Service;
use super::service_id::ServiceID;
use super::DiscoveryService;
use crate::balancer::TrafficPolicy;
use crate::error::{Error, ErrorKind, Result};
use async_trait::async_trait;
use figment::Figment;
use std::sync::Arc;

/// Parses the raw property value for one service into its instance
/// addresses. A configuration discovery backend supplies this.
pub trait ServiceDescriptorReader: Send + Sync {
    fn read(&self, raw: &str) -> Result<Vec<ServiceInstance>>;
}

/// Comma-separated `host:port` pairs — the descriptor shape used by the
/// end-to-end scenario in §8 S5 (`"svc1-host1:1234,svc1-host2:5678"`).
pub struct HostPortListReader;

impl ServiceDescriptorReader for HostPortListReader {
    fn read(&self, raw: &str) -> Result<Vec<ServiceInstance>> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|pair| {
                use std::net::ToSocketAddrs;
                pair.to_socket_addrs()
                    .ok()
                    .and_then(|mut it| it.next())
                    .map(ServiceInstance::new)
                    .ok_or_else(|| {
                        Error::new(ErrorKind::BadRequest, format!("invalid host:port '{pair}'"))
                    })
            })
            .collect()
    }
}

/// Resolves services by reading the property `<prefix>.<serviceName>` from a
/// configuration source (§4.C8 "AbstractConfigurationDiscoveryService"). A
/// missing property yields an empty-instance `Service`, not a failure.
pub struct ConfigDiscoveryService {
    scheme: &'static str,
    prefix: String,
    source: Figment,
    reader: Arc<dyn ServiceDescriptorReader>,
    policy: TrafficPolicy,
}

impl ConfigDiscoveryService {
    pub fn new(
        scheme: &'static str,
        prefix: impl Into<String>,
        source: Figment,
        reader: Arc<dyn ServiceDescriptorReader>,
        policy: TrafficPolicy,
    ) -> Self {
        Self {
            scheme,
            prefix: prefix.into(),
            source,
            reader,
            policy,
        }
    }

    fn property_key(&self, service_name: &str) -> String {
        format!("{}.{}", self.prefix, service_name)
    }

    fn read_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>> {
        let key = self.property_key(service_name);
        match self.source.find_value(&key) {
            Ok(value) => {
                let raw = value.as_str().ok_or_else(|| {
                    Error::new(ErrorKind::BadRequest, format!("property '{key}' is not a string"))
                })?;
                self.reader.read(raw)
            }
            Err(_) => Ok(Vec::new()),
        }
    }

    /// The service name this discovery service resolves by convention is
    /// the ServiceID's authority (or, for opaque IDs, the first path
    /// segment of the request target).
    fn service_name(id: &ServiceID) -> String {
        id.authority()
            .map(str::to_string)
            .unwrap_or_else(|| id.request_target().trim_start_matches('/').to_string())
    }
}

#[async_trait]
impl DiscoveryService for ConfigDiscoveryService {
    fn supported_schemes(&self) -> &[&str] {
        std::slice::from_ref(&self.scheme)
    }

    async fn resolve(&self, id: &ServiceID, _policy: TrafficPolicy) -> Result<Arc<Service>> {
        let instances = self.read_instances(&Self::service_name(id))?;
        Ok(Service::new(id.clone(), self.policy, instances))
    }

    async fn refresh(&self, service: &Service) -> Result<Vec<ServiceInstance>> {
        self.read_instances(&Self::service_name(service.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;

    #[tokio::test]
    async fn resolves_two_instances_from_property() {
        let source = Figment::new().merge(Serialized::default(
            "sample.service.svc1",
            "svc1-host1:1234,svc1-host2:5678",
        ));
        let svc = ConfigDiscoveryService::new(
            "config",
            "sample.service",
            source,
            Arc::new(HostPortListReader),
            TrafficPolicy::RoundRobin,
        );
        let id = ServiceID::parse("config://svc1/").unwrap();
        let service = svc.resolve(&id, TrafficPolicy::RoundRobin).await.unwrap();
        assert_eq!(service.instance_count(), 2);
    }

    #[tokio::test]
    async fn missing_property_yields_empty_instance_set() {
        let svc = ConfigDiscoveryService::new(
            "config",
            "sample.service",
            Figment::new(),
            Arc::new(HostPortListReader),
            TrafficPolicy::RoundRobin,
        );
        let id = ServiceID::parse("config://missing/").unwrap();
        let service = svc.resolve(&id, TrafficPolicy::RoundRobin).await.unwrap();
        assert!(service.is_empty());
    }

    #[tokio::test]
    async fn refresh_picks_up_updated_property() {
        let source = Figment::new().merge(Serialized::default(
            "sample.service.svc1",
            "svc1-host1:1234,svc1-host2:5678",
        ));
        let svc = ConfigDiscoveryService::new(
            "config",
            "sample.service",
            source,
            Arc::new(HostPortListReader),
            TrafficPolicy::RoundRobin,
        );
        let id = ServiceID::parse("config://svc1/").unwrap();
        let service = svc.resolve(&id, TrafficPolicy::RoundRobin).await.unwrap();
        assert_eq!(service.instance_count(), 2);

        let updated = Figment::new()
            .merge(Serialized::default("sample.service.svc1", "svc1-host1:1234"));
        let svc2 = ConfigDiscoveryService::new(
            "config",
            "sample.service",
            updated,
            Arc::new(HostPortListReader),
            TrafficPolicy::RoundRobin,
        );
        let refreshed = svc2.refresh(&service).await.unwrap();
        let old = service.apply_refresh(refreshed);
        assert_eq!(old.len(), 2);
        assert_eq!(service.instance_count(), 1);
    }
}
