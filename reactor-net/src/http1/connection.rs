//! Per-connection state machine and the pipelining FIFO (§4.C3, §8
//! property 1: "response bytes appear in order R1..Rn regardless of
//! relative handler completion times").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingRequest,
    ReadingHeaders,
    ReadingBody,
    Dispatched,
    WritingResponse,
    Closed,
}

impl ConnectionState {
    pub fn can_accept_next_request(self) -> bool {
        matches!(self, ConnectionState::AwaitingRequest | ConnectionState::WritingResponse)
    }
}

struct Inner {
    next_to_write: AtomicU64,
    notify: Notify,
}

/// A FIFO of tickets, one per accepted request, gating response writes so
/// they land on the wire in arrival order even when handlers finish out
/// of order.
pub struct PipelineQueue {
    inner: Arc<Inner>,
    next_ticket: AtomicU64,
}

impl PipelineQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_to_write: AtomicU64::new(0),
                notify: Notify::new(),
            }),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Issues the next ticket, in request arrival order.
    pub fn next_ticket(&self) -> Ticket {
        let position = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        Ticket {
            position,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for PipelineQueue {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ticket {
    position: u64,
    inner: Arc<Inner>,
}

impl Ticket {
    /// Resolves once every earlier ticket has called [`Self::complete`].
    pub async fn wait_turn(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.inner.next_to_write.load(Ordering::Acquire) == self.position {
                return;
            }
            notified.await;
        }
    }

    /// Marks this ticket's response fully written, releasing the next one.
    pub fn complete(self) {
        self.inner.next_to_write.fetch_add(1, Ordering::AcqRel);
        self.inner.notify.notify_waiters();
    }
}
