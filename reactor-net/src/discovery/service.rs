use super::instance::ServiceInstance;
use super::service_id::ServiceID;
use crate::balancer::{LoadBalancer, Random, RoundRobin, TrafficPolicy, WeightedRandom};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct Inner {
    instances: Vec<ServiceInstance>,
    balancer: Option<Arc<dyn LoadBalancer<ServiceInstance>>>,
    last_refreshed: DateTime<Utc>,
}

/// A live handle to a named service: its current instance set, traffic
/// policy, and owned load-balancer (§3 "Service"). Refresh is serialized
/// under a lock; `get_instance` is wait-free — it reads the current
/// load-balancer reference and delegates.
pub struct Service {
    id: ServiceID,
    policy: TrafficPolicy,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Service {
    pub fn new(id: ServiceID, policy: TrafficPolicy, instances: Vec<ServiceInstance>) -> Arc<Self> {
        let balancer = build_balancer(policy, &instances);
        Arc::new(Self {
            id,
            policy,
            inner: Mutex::new(Inner {
                instances,
                balancer,
                last_refreshed: Utc::now(),
            }),
        })
    }

    pub fn id(&self) -> &ServiceID {
        &self.id
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().instances.is_empty()
    }

    pub fn instance_count(&self) -> usize {
        self.inner.lock().instances.len()
    }

    pub fn last_refreshed(&self) -> DateTime<Utc> {
        self.inner.lock().last_refreshed
    }

    /// Wait-free: reads the current load-balancer reference and delegates.
    pub fn get_instance(&self) -> Option<ServiceInstance> {
        let guard = self.inner.lock();
        guard.balancer.as_ref().map(|lb| lb.next().clone())
    }

    /// Swaps in a new instance set under the service lock, records
    /// `last_refreshed`, and hands the old instances back to the caller for
    /// graceful draining (§4.C8 refresh algorithm). Returns the instances
    /// that were replaced.
    pub fn apply_refresh(&self, new_instances: Vec<ServiceInstance>) -> Vec<ServiceInstance> {
        let balancer = build_balancer(self.policy, &new_instances);
        let mut guard = self.inner.lock();
        let old = std::mem::replace(&mut guard.instances, new_instances);
        guard.balancer = balancer;
        guard.last_refreshed = Utc::now();
        old
    }

    /// Abruptly drops all instances with no drain.
    pub fn shutdown(&self) {
        let mut guard = self.inner.lock();
        guard.instances.clear();
        guard.balancer = None;
    }

    /// Waits up to `deadline` for in-flight calls on the current instances
    /// to complete, then escalates to [`Service::shutdown`]. With no
    /// transport layer wired in, draining degenerates to a bounded sleep
    /// (§5 "shutdownGracefully ... waits ... bounded by a configurable
    /// deadline, then escalates to shutdown").
    pub async fn shutdown_gracefully(&self, deadline: Duration) {
        tokio::time::sleep(deadline).await;
        self.shutdown();
    }
}

fn build_balancer(
    policy: TrafficPolicy,
    instances: &[ServiceInstance],
) -> Option<Arc<dyn LoadBalancer<ServiceInstance>>> {
    if instances.is_empty() {
        return None;
    }
    let snapshot = instances.to_vec();
    Some(match policy {
        TrafficPolicy::RoundRobin => Arc::new(RoundRobin::new(snapshot)),
        TrafficPolicy::Random => Arc::new(Random::new(snapshot)),
        TrafficPolicy::WeightedRandom => {
            let weights = snapshot.iter().map(|instance| instance.weight as u64).collect();
            Arc::new(WeightedRandom::new(snapshot, weights))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn addr(port: u16) -> ServiceInstance {
        ServiceInstance::new(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    #[test]
    fn refresh_swaps_instances_and_returns_old_set() {
        let id = ServiceID::parse("config://svc/path").unwrap();
        let svc = Service::new(id, TrafficPolicy::RoundRobin, vec![addr(1), addr(2)]);
        let old = svc.apply_refresh(vec![addr(3)]);
        assert_eq!(old, vec![addr(1), addr(2)]);
        assert_eq!(svc.instance_count(), 1);
    }

    #[test]
    fn empty_instance_set_has_no_balancer() {
        let id = ServiceID::parse("config://svc/path").unwrap();
        let svc = Service::new(id, TrafficPolicy::RoundRobin, vec![]);
        assert!(svc.get_instance().is_none());
    }

    #[test]
    fn weighted_random_policy_honors_each_instance_weight() {
        let heavy = ServiceInstance::with_weight(SocketAddr::from(([127, 0, 0, 1], 1)), 99);
        let light = ServiceInstance::with_weight(SocketAddr::from(([127, 0, 0, 1], 2)), 1);
        let id = ServiceID::parse("config://svc/path").unwrap();
        let svc = Service::new(id, TrafficPolicy::WeightedRandom, vec![heavy.clone(), light]);

        let mut heavy_hits = 0;
        for _ in 0..2_000 {
            if svc.get_instance().unwrap() == heavy {
                heavy_hits += 1;
            }
        }
        assert!(heavy_hits > 1_800, "expected the 99-weight instance to dominate, got {heavy_hits}/2000");
    }
}
