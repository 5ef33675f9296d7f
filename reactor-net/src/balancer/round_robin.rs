use super::LoadBalancer;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A monotonically increasing counter modulo the instance count. Fair over
/// `k * len()` picks: each instance is returned exactly `k` times, provided
/// `len()` divides the sample size (§9 Open Question 2).
pub struct RoundRobin<I> {
    instances: Vec<I>,
    counter: AtomicUsize,
}

impl<I> RoundRobin<I> {
    pub fn new(instances: Vec<I>) -> Self {
        assert!(!instances.is_empty(), "load balancer requires a non-empty instance set");
        Self {
            instances,
            counter: AtomicUsize::new(0),
        }
    }
}

impl<I: Send + Sync> LoadBalancer<I> for RoundRobin<I> {
    fn next(&self) -> &I {
        let i = self.counter.fetch_add(1, Ordering::Relaxed) % self.instances.len();
        &self.instances[i]
    }

    fn len(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_all_instances() {
        let lb = RoundRobin::new(vec!["a", "b", "c"]);
        let picks: Vec<&str> = (0..6).map(|_| *lb.next()).collect();
        assert_eq!(picks, vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn fair_under_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let lb = Arc::new(RoundRobin::new((0..4).collect::<Vec<usize>>()));
        let mut handles = Vec::new();
        let counts = Arc::new(
            (0..4)
                .map(|_| AtomicUsize::new(0))
                .collect::<Vec<_>>(),
        );
        for _ in 0..4 {
            let lb = lb.clone();
            let counts = counts.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    let i = *lb.next();
                    counts[i].fetch_add(1, Ordering::Relaxed);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        for c in counts.iter() {
            assert_eq!(c.load(Ordering::Relaxed), 1000);
        }
    }
}
