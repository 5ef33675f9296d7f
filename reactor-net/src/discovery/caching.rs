use super::service::Service;
use super::service_id::ServiceID;
use super::DiscoveryService;
use crate::balancer::TrafficPolicy;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Wraps a delegate discovery service with a `ServiceID -> Service` cache
/// and a scheduled per-service refresh (§4.C8 "CachingDiscoveryService").
/// Concurrent `resolve` calls for the same ServiceID observe the same
/// `Arc<Service>`. A service reduced to zero instances after refresh is
/// evicted and its old instances are drained.
pub struct CachingDiscoveryService {
    delegate: Arc<dyn DiscoveryService>,
    cache: Arc<DashMap<ServiceID, Arc<Service>>>,
    resolve_locks: DashMap<ServiceID, Arc<tokio::sync::Mutex<()>>>,
    ttl: Duration,
    drain_deadline: Duration,
    refresh_tasks: DashMap<ServiceID, JoinHandle<()>>,
}

impl CachingDiscoveryService {
    pub fn new(delegate: Arc<dyn DiscoveryService>, ttl: Duration, drain_deadline: Duration) -> Self {
        Self {
            delegate,
            cache: Arc::new(DashMap::new()),
            resolve_locks: DashMap::new(),
            ttl,
            drain_deadline,
            refresh_tasks: DashMap::new(),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn schedule_refresh(&self, id: ServiceID) {
        let delegate = self.delegate.clone();
        let cache = self.cache.clone();
        let ttl = self.ttl;
        let drain_deadline = self.drain_deadline;
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(ttl);
            tick.tick().await; // first tick fires immediately; skip it
            loop {
                tick.tick().await;
                let Some(service) = cache.get(&task_id).map(|e| e.value().clone()) else {
                    return;
                };
                let Ok(new_instances) = delegate.refresh(&service).await else {
                    continue;
                };
                if new_instances.is_empty() {
                    let old = service.apply_refresh(Vec::new());
                    cache.remove(&task_id);
                    let drained = service.clone();
                    tokio::spawn(async move {
                        drained.shutdown_gracefully(drain_deadline).await;
                    });
                    let _ = old;
                    return;
                }
                let old = service.apply_refresh(new_instances);
                if !old.is_empty() {
                    let drain_target = Service::new(task_id.clone(), TrafficPolicy::RoundRobin, old);
                    tokio::spawn(async move {
                        drain_target.shutdown_gracefully(drain_deadline).await;
                    });
                }
            }
        });
        self.refresh_tasks.insert(id, handle);
    }
}

impl Drop for CachingDiscoveryService {
    fn drop(&mut self) {
        for entry in self.refresh_tasks.iter() {
            entry.value().abort();
        }
    }
}

#[async_trait]
impl DiscoveryService for CachingDiscoveryService {
    fn supported_schemes(&self) -> &[&str] {
        self.delegate.supported_schemes()
    }

    async fn resolve(&self, id: &ServiceID, policy: TrafficPolicy) -> Result<Arc<Service>> {
        if let Some(existing) = self.cache.get(id) {
            return Ok(existing.value().clone());
        }
        // Double-checked locking per ServiceID: the first caller resolves
        // and populates the cache, concurrent callers for the same ID wait
        // on the same lock and then observe the now-cached Service.
        let lock = self
            .resolve_locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;
        if let Some(existing) = self.cache.get(id) {
            return Ok(existing.value().clone());
        }
        let service = self.delegate.resolve(id, policy).await?;
        self.cache.insert(id.clone(), service.clone());
        self.schedule_refresh(id.clone());
        Ok(service)
    }

    async fn refresh(&self, service: &Service) -> Result<Vec<super::instance::ServiceInstance>> {
        self.delegate.refresh(service).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::instance::ServiceInstance;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDelegate {
        scheme: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DiscoveryService for CountingDelegate {
        fn supported_schemes(&self) -> &[&str] {
            std::slice::from_ref(&self.scheme)
        }

        async fn resolve(&self, id: &ServiceID, policy: TrafficPolicy) -> Result<Arc<Service>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Service::new(
                id.clone(),
                policy,
                vec![ServiceInstance::new(SocketAddr::from(([127, 0, 0, 1], 1)))],
            ))
        }

        async fn refresh(&self, _service: &Service) -> Result<Vec<ServiceInstance>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn concurrent_resolve_returns_same_service_reference() {
        let delegate = Arc::new(CountingDelegate {
            scheme: "config",
            calls: AtomicUsize::new(0),
        });
        let caching = Arc::new(CachingDiscoveryService::new(
            delegate.clone(),
            Duration::from_secs(30),
            Duration::from_secs(5),
        ));
        let id = ServiceID::parse("config://svc/").unwrap();

        let a = caching.clone();
        let b = caching.clone();
        let id_a = id.clone();
        let id_b = id.clone();
        let (s1, s2) = tokio::join!(
            async move { a.resolve(&id_a, TrafficPolicy::RoundRobin).await.unwrap() },
            async move { b.resolve(&id_b, TrafficPolicy::RoundRobin).await.unwrap() },
        );
        assert!(Arc::ptr_eq(&s1, &s2));
        assert_eq!(delegate.calls.load(Ordering::SeqCst), 1);
    }
}
