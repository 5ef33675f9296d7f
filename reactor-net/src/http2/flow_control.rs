//! Flow-control windows (RFC 7540 §6.9), one per stream plus one for the
//! whole connection. Tracks send/receive credit and decides when a
//! `WINDOW_UPDATE` is due based on [`Http2Config::window_update_threshold_pct`](crate::config::Http2Config).

use crate::error::{Error, ErrorKind, Result};

/// A single flow-control window (either a stream's or the connection's).
#[derive(Debug, Clone, Copy)]
pub struct FlowWindow {
    initial: i64,
    available: i64,
    consumed_since_update: u32,
    low_water_pct: u8,
}

impl FlowWindow {
    pub fn new(initial: u32, low_water_pct: u8) -> Self {
        Self {
            initial: initial as i64,
            available: initial as i64,
            consumed_since_update: 0,
            low_water_pct,
        }
    }

    pub fn available(&self) -> i64 {
        self.available
    }

    /// Accounts for `n` bytes of DATA sent on this window, rejecting if it
    /// would go negative (the peer violated its own advertised window).
    pub fn reserve_outbound(&mut self, n: u32) -> Result<()> {
        let n = n as i64;
        if n > self.available {
            return Err(Error::new(ErrorKind::ResourceExhausted, "flow-control window exhausted"));
        }
        self.available -= n;
        Ok(())
    }

    /// Accounts for `n` bytes of DATA received, returning `true` if a
    /// `WINDOW_UPDATE` should now be sent back to the peer.
    pub fn record_inbound(&mut self, n: u32) -> bool {
        self.consumed_since_update += n;
        let threshold = (self.initial as u64 * self.low_water_pct as u64 / 100) as u32;
        self.consumed_since_update >= threshold.max(1)
    }

    /// The increment to advertise and the window reset that follows.
    pub fn take_window_update(&mut self) -> u32 {
        let increment = self.consumed_since_update;
        self.consumed_since_update = 0;
        increment
    }

    /// Applies a peer-sent `WINDOW_UPDATE` increment to our send-side credit.
    pub fn apply_window_update(&mut self, increment: u32) -> Result<()> {
        self.available = self
            .available
            .checked_add(increment as i64)
            .ok_or_else(|| Error::new(ErrorKind::BadRequest, "WINDOW_UPDATE overflowed flow-control window"))?;
        if self.available > i32::MAX as i64 {
            return Err(Error::new(ErrorKind::BadRequest, "flow-control window exceeds 2^31-1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserving_more_than_available_is_rejected() {
        let mut window = FlowWindow::new(100, 50);
        assert!(window.reserve_outbound(50).is_ok());
        assert!(window.reserve_outbound(51).is_err());
    }

    #[test]
    fn crossing_the_low_water_mark_requests_a_window_update() {
        let mut window = FlowWindow::new(100, 50);
        assert!(!window.record_inbound(40));
        assert!(window.record_inbound(20));
        assert_eq!(window.take_window_update(), 60);
        assert_eq!(window.take_window_update(), 0);
    }

    #[test]
    fn window_update_restores_send_credit() {
        let mut window = FlowWindow::new(100, 50);
        window.reserve_outbound(100).unwrap();
        assert_eq!(window.available(), 0);
        window.apply_window_update(30).unwrap();
        assert_eq!(window.available(), 30);
    }

    #[test]
    fn window_update_overflow_is_rejected() {
        let mut window = FlowWindow::new(100, 50);
        assert!(window.apply_window_update(u32::MAX).is_err());
    }
}
