use super::LoadBalancer;
use rand::Rng;

/// Uniform random selection over the instance snapshot.
pub struct Random<I> {
    instances: Vec<I>,
}

impl<I> Random<I> {
    pub fn new(instances: Vec<I>) -> Self {
        assert!(!instances.is_empty(), "load balancer requires a non-empty instance set");
        Self { instances }
    }
}

impl<I: Send + Sync> LoadBalancer<I> for Random<I> {
    fn next(&self) -> &I {
        let i = rand::rng().random_range(0..self.instances.len());
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
    fn always_picks_from_the_snapshot() {
        let lb = Random::new(vec![10, 20, 30]);
        for _ in 0..100 {
            assert!([10, 20, 30].contains(lb.next()));
        }
    }
}
