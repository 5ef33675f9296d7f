use std::net::SocketAddr;

/// A single live endpoint backing a [`Service`](super::Service).
///
/// `weight` defaults to 1 (an even split under `WeightedRandom`) and is
/// only meaningful to that policy; `RoundRobin`/`Random` ignore it.
/// Resolvers that learn a real weight (e.g. DNS SRV records) should set it
/// via [`ServiceInstance::with_weight`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub address: SocketAddr,
    pub weight: u32,
}

impl ServiceInstance {
    pub fn new(address: SocketAddr) -> Self {
        Self { address, weight: 1 }
    }

    pub fn with_weight(address: SocketAddr, weight: u32) -> Self {
        Self { address, weight: weight.max(1) }
    }
}
