use super::LoadBalancer;
use rand::Rng;

/// Picks instance `i` with probability `w_i / sum(w)`. Draws are uniform
/// over `[0, sum(w))` and resolved via binary search over a cumulative
/// weights array — the smallest prefix sum strictly greater than the draw.
pub struct WeightedRandom<I> {
    instances: Vec<I>,
    cumulative: Vec<u64>,
    total: u64,
}

impl<I> WeightedRandom<I> {
    /// `weights[i]` is the positive integer weight of `instances[i]`.
    pub fn new(instances: Vec<I>, weights: Vec<u64>) -> Self {
        assert!(!instances.is_empty(), "load balancer requires a non-empty instance set");
        assert_eq!(instances.len(), weights.len());
        assert!(weights.iter().all(|&w| w > 0), "weights must be positive");

        let mut cumulative = Vec::with_capacity(weights.len());
        let mut running = 0u64;
        for w in &weights {
            running += w;
            cumulative.push(running);
        }
        Self {
            instances,
            cumulative,
            total: running,
        }
    }

    fn index_for_draw(&self, draw: u64) -> usize {
        match self.cumulative.binary_search(&draw) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
        .min(self.instances.len() - 1)
    }
}

impl<I: Send + Sync> LoadBalancer<I> for WeightedRandom<I> {
    fn next(&self) -> &I {
        let draw = rand::rng().random_range(0..self.total);
        &self.instances[self.index_for_draw(draw)]
    }

    fn len(&self) -> usize {
        self.instances.len()
    }
}
