//! Per-endpoint connection pool (§4.C7): a bounded set of connections per
//! `(host, port)`, a FIFO acquisition queue with a timeout that reports
//! `POOL_EXHAUSTED`, and a background reaper that closes connections idle
//! longer than [`ClientConfig::idle_timeout_secs`]. Acquisition priority is
//! an HTTP/2 connection with available stream capacity, then an idle
//! HTTP/1.x connection, then a newly opened connection.

use crate::error::{Error, ErrorKind, Result};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify, Semaphore};

/// How many concurrent exchanges one pooled connection may carry.
///
/// HTTP/1.x connections in this pool are never pipelined by the client
/// side (one in-flight exchange each); HTTP/2 connections multiplex up to
/// the peer's advertised `SETTINGS_MAX_CONCURRENT_STREAMS`.
#[derive(Debug, Clone, Copy)]
pub enum Capacity {
    Http1,
    Http2 { max_concurrent_streams: u32 },
}

impl Capacity {
    fn slots(self) -> u32 {
        match self {
            Capacity::Http1 => 1,
            Capacity::Http2 { max_concurrent_streams } => max_concurrent_streams.max(1),
        }
    }
}

struct PooledEntry {
    capacity: Capacity,
    in_flight: Arc<Semaphore>,
    last_used: Instant,
}

/// A connection slot checked out of the pool. Returns its capacity to the
/// pool's idle-tracking bookkeeping, and wakes the next queued waiter, when
/// dropped.
pub struct Lease {
    endpoint: SocketAddr,
    pool: Arc<Inner>,
    index: usize,
    permit: Option<tokio::sync::OwnedSemaphorePermit>,
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("endpoint", &self.endpoint)
            .field("index", &self.index)
            .finish()
    }
}

impl Lease {
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        // Release the semaphore slot before waking a waiter so its retry
        // actually observes the freed capacity.
        self.permit.take();
        self.pool.wake_front_waiter();

        let pool = Arc::clone(&self.pool);
        let index = self.index;
        tokio::spawn(async move {
            let mut entries = pool.entries.lock().await;
            if let Some(entry) = entries.get_mut(index) {
                entry.last_used = Instant::now();
            }
        });
    }
}

struct Inner {
    endpoint: SocketAddr,
    entries: Mutex<Vec<PooledEntry>>,
    max_connections: usize,
    idle_timeout: Duration,
    /// FIFO of acquisition attempts currently blocked on pool capacity.
    /// Plain `std::sync::Mutex` so [`WaitTicket::drop`] can deregister
    /// itself synchronously on cancellation (e.g. the caller's
    /// `acquire_timeout` firing) without needing an async drop.
    waiters: std::sync::Mutex<VecDeque<Arc<Notify>>>,
}

impl Inner {
    fn wake_front_waiter(&self) {
        let waiters = self.waiters.lock().unwrap();
        if let Some(front) = waiters.front() {
            front.notify_one();
        }
    }
}

/// RAII registration in the pool's FIFO wait queue. Only the front ticket
/// is allowed to attempt an acquisition, so waiters are served in the order
/// they arrived. Deregisters itself (and wakes the new front) on drop,
/// whether it succeeded, or was cancelled mid-wait by the acquisition
/// timeout.
struct WaitTicket<'a> {
    pool: &'a Inner,
    notify: Arc<Notify>,
}

impl<'a> WaitTicket<'a> {
    fn new(pool: &'a Inner) -> Self {
        let notify = Arc::new(Notify::new());
        pool.waiters.lock().unwrap().push_back(Arc::clone(&notify));
        Self { pool, notify }
    }

    fn is_front(&self) -> bool {
        let waiters = self.pool.waiters.lock().unwrap();
        waiters.front().is_some_and(|front| Arc::ptr_eq(front, &self.notify))
    }
}

impl<'a> Drop for WaitTicket<'a> {
    fn drop(&mut self) {
        let mut waiters = self.pool.waiters.lock().unwrap();
        if let Some(pos) = waiters.iter().position(|n| Arc::ptr_eq(n, &self.notify)) {
            waiters.remove(pos);
        }
        if let Some(front) = waiters.front() {
            front.notify_one();
        }
    }
}

/// The pool for a single `(host, port)` endpoint.
pub struct EndpointPool {
    inner: Arc<Inner>,
}

impl EndpointPool {
    pub fn new(endpoint: SocketAddr, max_connections: usize, idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                endpoint,
                entries: Mutex::new(Vec::new()),
                max_connections,
                idle_timeout,
                waiters: std::sync::Mutex::new(VecDeque::new()),
            }),
        }
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.inner.endpoint
    }

    /// Acquires a slot on an existing connection with spare capacity, or
    /// opens a new one up to `max_connections`. Fails with `PoolExhausted`
    /// once `acquire_timeout` elapses with no slot available.
    pub async fn acquire(&self, new_connection: Capacity, acquire_timeout: Duration) -> Result<Lease> {
        tokio::time::timeout(acquire_timeout, self.acquire_inner(new_connection))
            .await
            .map_err(|_| Error::new(ErrorKind::PoolExhausted, "timed out waiting for a pooled connection"))?
    }

    async fn acquire_inner(&self, new_connection: Capacity) -> Result<Lease> {
        let ticket = WaitTicket::new(&self.inner);
        loop {
            let notified = ticket.notify.notified();
            if ticket.is_front() {
                if let Some(lease) = self.try_acquire(new_connection).await {
                    return Ok(lease);
                }
            }
            notified.await;
        }
    }

    /// One acquisition attempt: an HTTP/2 connection with a free stream
    /// slot, else an idle HTTP/1.x connection, else a freshly opened one.
    async fn try_acquire(&self, new_connection: Capacity) -> Option<Lease> {
        let mut entries = self.inner.entries.lock().await;

        for (index, entry) in entries.iter().enumerate() {
            if matches!(entry.capacity, Capacity::Http2 { .. }) {
                if let Ok(permit) = Arc::clone(&entry.in_flight).try_acquire_owned() {
                    return Some(self.lease(index, permit));
                }
            }
        }
        for (index, entry) in entries.iter().enumerate() {
            if matches!(entry.capacity, Capacity::Http1) {
                if let Ok(permit) = Arc::clone(&entry.in_flight).try_acquire_owned() {
                    return Some(self.lease(index, permit));
                }
            }
        }
        if entries.len() < self.inner.max_connections {
            let semaphore = Arc::new(Semaphore::new(new_connection.slots() as usize));
            let permit = Arc::clone(&semaphore).try_acquire_owned().expect("freshly built semaphore has capacity");
            entries.push(PooledEntry {
                capacity: new_connection,
                in_flight: semaphore,
                last_used: Instant::now(),
            });
            let index = entries.len() - 1;
            return Some(self.lease(index, permit));
        }
        None
    }

    fn lease(&self, index: usize, permit: tokio::sync::OwnedSemaphorePermit) -> Lease {
        Lease {
            endpoint: self.inner.endpoint,
            pool: Arc::clone(&self.inner),
            index,
            permit: Some(permit),
        }
    }

    /// Drops connections that have sat idle longer than the configured
    /// timeout. Intended to run on a periodic tick from [`super::Client`].
    pub async fn reap_idle(&self) {
        let mut entries = self.inner.entries.lock().await;
        let now = Instant::now();
        entries.retain(|entry| now.duration_since(entry.last_used) < self.inner.idle_timeout || entry.in_flight.available_permits() < entry.capacity.slots() as usize);
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[tokio::test]
    async fn acquires_fresh_connections_up_to_the_limit() {
        let pool = EndpointPool::new(endpoint(), 2, Duration::from_secs(60));
        let a = pool.acquire(Capacity::Http1, Duration::from_secs(1)).await.unwrap();
        let b = pool.acquire(Capacity::Http1, Duration::from_secs(1)).await.unwrap();
        assert_eq!(pool.connection_count().await, 2);
        drop(a);
        drop(b);
    }

    #[tokio::test]
    async fn exhausted_pool_times_out_with_pool_exhausted() {
        let pool = EndpointPool::new(endpoint(), 1, Duration::from_secs(60));
        let _lease = pool.acquire(Capacity::Http1, Duration::from_secs(1)).await.unwrap();
        let err = pool
            .acquire(Capacity::Http1, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PoolExhausted);
    }

    #[tokio::test]
    async fn an_http2_connection_serves_many_concurrent_leases() {
        let pool = EndpointPool::new(endpoint(), 1, Duration::from_secs(60));
        let cap = Capacity::Http2 { max_concurrent_streams: 4 };
        let leases: Vec<_> = futures::future::join_all((0..4).map(|_| pool.acquire(cap, Duration::from_secs(1))))
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(pool.connection_count().await, 1);
        drop(leases);
    }

    #[tokio::test]
    async fn prefers_an_http2_connection_with_free_streams_over_an_idle_http1_connection() {
        let pool = EndpointPool::new(endpoint(), 2, Duration::from_secs(60));
        // entry0: an HTTP/1.x connection, later released (idle, 1 free slot).
        let h1 = pool.acquire(Capacity::Http1, Duration::from_secs(1)).await.unwrap();
        // entry1: an HTTP/2 connection, later released (4 free slots).
        let h2_cap = Capacity::Http2 { max_concurrent_streams: 4 };
        let h2 = pool.acquire(h2_cap, Duration::from_secs(1)).await.unwrap();
        drop(h1);
        drop(h2);
        assert_eq!(pool.connection_count().await, 2);

        // A third acquisition must reuse the HTTP/2 connection's spare stream
        // capacity rather than the now-idle HTTP/1.x connection's single slot,
        // even though the HTTP/1.x entry was inserted first.
        let third = pool.acquire(Capacity::Http1, Duration::from_secs(1)).await.unwrap();
        assert_eq!(pool.connection_count().await, 2);
        {
            let entries = pool.inner.entries.lock().await;
            assert_eq!(entries[0].in_flight.available_permits(), 1, "the idle HTTP/1.x slot should be left untouched");
            assert_eq!(entries[1].in_flight.available_permits(), 3, "the HTTP/2 connection should have served this acquisition");
        }
        drop(third);
    }

    #[tokio::test]
    async fn waiters_are_served_in_arrival_order() {
        let pool = Arc::new(EndpointPool::new(endpoint(), 1, Duration::from_secs(60)));
        let held = pool.acquire(Capacity::Http1, Duration::from_secs(1)).await.unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..3u64 {
            let pool = Arc::clone(&pool);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let lease = pool.acquire(Capacity::Http1, Duration::from_secs(1)).await.unwrap();
                order.lock().await.push(i);
                drop(lease);
            }));
        }
        // `#[tokio::test]` defaults to a single-threaded executor, so
        // spawned tasks run in spawn order up to their first suspend point;
        // yielding repeatedly lets all three register in the FIFO before
        // the held slot is released.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().await, vec![0, 1, 2]);
    }
}
