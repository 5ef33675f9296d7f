//! Per-stream state machine (RFC 7540 §5.1) and the table of streams open
//! on one connection.

use crate::error::{Error, ErrorKind, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

impl StreamState {
    /// Applies the effect of sending an `END_STREAM`-flagged frame.
    fn on_send_end_stream(self) -> Self {
        match self {
            StreamState::Idle | StreamState::Open => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote => StreamState::Closed,
            other => other,
        }
    }

    /// Applies the effect of receiving an `END_STREAM`-flagged frame.
    fn on_recv_end_stream(self) -> Self {
        match self {
            StreamState::Idle | StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal => StreamState::Closed,
            other => other,
        }
    }
}

/// Tracks every stream opened on a connection and enforces
/// `SETTINGS_MAX_CONCURRENT_STREAMS`.
pub struct StreamTable {
    streams: HashMap<u32, StreamState>,
    max_concurrent: u32,
}

impl StreamTable {
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            streams: HashMap::new(),
            max_concurrent,
        }
    }

    fn open_count(&self) -> u32 {
        self.streams
            .values()
            .filter(|s| !matches!(s, StreamState::Closed))
            .count() as u32
    }

    /// Opens a new stream, rejecting once the concurrent-stream limit is
    /// already saturated.
    pub fn open(&mut self, stream_id: u32) -> Result<()> {
        if self.streams.contains_key(&stream_id) {
            return Err(Error::new(ErrorKind::BadRequest, "stream id reused"));
        }
        if self.open_count() >= self.max_concurrent {
            return Err(Error::new(ErrorKind::ResourceExhausted, "max concurrent streams exceeded"));
        }
        self.streams.insert(stream_id, StreamState::Open);
        Ok(())
    }

    pub fn state(&self, stream_id: u32) -> Option<StreamState> {
        self.streams.get(&stream_id).copied()
    }

    pub fn mark_end_stream_sent(&mut self, stream_id: u32) {
        if let Some(state) = self.streams.get_mut(&stream_id) {
            *state = state.on_send_end_stream();
        }
    }

    pub fn mark_end_stream_received(&mut self, stream_id: u32) {
        if let Some(state) = self.streams.get_mut(&stream_id) {
            *state = state.on_recv_end_stream();
        }
    }

    pub fn reset(&mut self, stream_id: u32) {
        self.streams.insert(stream_id, StreamState::Closed);
    }

    pub fn is_closed(&self, stream_id: u32) -> bool {
        matches!(self.streams.get(&stream_id), Some(StreamState::Closed) | None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_request_response_cycle_reaches_closed() {
        let mut table = StreamTable::new(10);
        table.open(1).unwrap();
        assert_eq!(table.state(1), Some(StreamState::Open));
        table.mark_end_stream_received(1);
        assert_eq!(table.state(1), Some(StreamState::HalfClosedRemote));
        table.mark_end_stream_sent(1);
        assert_eq!(table.state(1), Some(StreamState::Closed));
    }

    #[test]
    fn opening_beyond_the_concurrency_limit_is_rejected() {
        let mut table = StreamTable::new(1);
        table.open(1).unwrap();
        assert!(table.open(3).is_err());
    }

    #[test]
    fn reset_stream_is_immediately_closed() {
        let mut table = StreamTable::new(10);
        table.open(1).unwrap();
        table.reset(1);
        assert!(table.is_closed(1));
    }

    #[test]
    fn closed_streams_do_not_count_against_the_limit() {
        let mut table = StreamTable::new(1);
        table.open(1).unwrap();
        table.reset(1);
        assert!(table.open(3).is_ok());
    }
}
