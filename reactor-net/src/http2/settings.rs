//! SETTINGS frame payload (RFC 7540 §6.5): a flat list of 16-bit
//! identifier / 32-bit value pairs exchanged at connection start and
//! whenever either side wants to renegotiate.

use crate::config::Http2Config;
use crate::error::{Error, ErrorKind, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const SETTINGS_HEADER_TABLE_SIZE: u16 = 0x1;
const SETTINGS_ENABLE_PUSH: u16 = 0x2;
const SETTINGS_MAX_CONCURRENT_STREAMS: u16 = 0x3;
const SETTINGS_INITIAL_WINDOW_SIZE: u16 = 0x4;
const SETTINGS_MAX_FRAME_SIZE: u16 = 0x5;
const SETTINGS_MAX_HEADER_LIST_SIZE: u16 = 0x6;

/// The negotiated settings in effect for one direction of a connection.
/// Starts at the protocol defaults and is updated as SETTINGS frames
/// arrive or are applied locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub header_table_size: u32,
    pub enable_push: bool,
    pub max_concurrent_streams: u32,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_table_size: 4096,
            enable_push: true,
            max_concurrent_streams: u32::MAX,
            initial_window_size: 65_535,
            max_frame_size: 16_384,
            max_header_list_size: None,
        }
    }
}

impl Settings {
    /// The settings this engine advertises to a peer, derived from
    /// configuration rather than the bare protocol defaults.
    pub fn from_config(config: &Http2Config) -> Self {
        Self {
            header_table_size: config.header_table_size,
            enable_push: false,
            max_concurrent_streams: config.max_concurrent_streams,
            initial_window_size: config.initial_window_size,
            max_frame_size: 16_384,
            max_header_list_size: None,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u16(SETTINGS_HEADER_TABLE_SIZE);
        buf.put_u32(self.header_table_size);
        buf.put_u16(SETTINGS_ENABLE_PUSH);
        buf.put_u32(self.enable_push as u32);
        buf.put_u16(SETTINGS_MAX_CONCURRENT_STREAMS);
        buf.put_u32(self.max_concurrent_streams);
        buf.put_u16(SETTINGS_INITIAL_WINDOW_SIZE);
        buf.put_u32(self.initial_window_size);
        buf.put_u16(SETTINGS_MAX_FRAME_SIZE);
        buf.put_u32(self.max_frame_size);
        if let Some(max_header_list_size) = self.max_header_list_size {
            buf.put_u16(SETTINGS_MAX_HEADER_LIST_SIZE);
            buf.put_u32(max_header_list_size);
        }
        buf.freeze()
    }

    /// Parses a SETTINGS frame payload, applying each entry on top of
    /// `self` (later entries win on duplicate identifiers, per the RFC).
    pub fn apply_frame_payload(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() % 6 != 0 {
            return Err(Error::new(ErrorKind::BadRequest, "SETTINGS payload length not a multiple of 6"));
        }
        let mut rest = payload;
        while !rest.is_empty() {
            let id = rest.get_u16();
            let value = rest.get_u32();
            match id {
                SETTINGS_HEADER_TABLE_SIZE => self.header_table_size = value,
                SETTINGS_ENABLE_PUSH => {
                    self.enable_push = match value {
                        0 => false,
                        1 => true,
                        _ => return Err(Error::new(ErrorKind::BadRequest, "SETTINGS_ENABLE_PUSH must be 0 or 1")),
                    }
                }
                SETTINGS_MAX_CONCURRENT_STREAMS => self.max_concurrent_streams = value,
                SETTINGS_INITIAL_WINDOW_SIZE => {
                    if value > i32::MAX as u32 {
                        return Err(Error::new(ErrorKind::BadRequest, "SETTINGS_INITIAL_WINDOW_SIZE exceeds 2^31-1"));
                    }
                    self.initial_window_size = value;
                }
                SETTINGS_MAX_FRAME_SIZE => {
                    if !(16_384..=16_777_215).contains(&value) {
                        return Err(Error::new(ErrorKind::BadRequest, "SETTINGS_MAX_FRAME_SIZE out of range"));
                    }
                    self.max_frame_size = value;
                }
                SETTINGS_MAX_HEADER_LIST_SIZE => self.max_header_list_size = Some(value),
                // Unknown identifiers are ignored per RFC 7540 §6.5.2.
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Http2Config {
        Http2Config {
            header_table_size: 4096,
            initial_window_size: 65_535,
            connection_window_size: 1 << 20,
            max_concurrent_streams: 100,
            window_update_threshold_pct: 50,
        }
    }

    #[test]
    fn round_trips_through_frame_payload() {
        let settings = Settings::from_config(&sample_config());
        let encoded = settings.encode();
        let mut applied = Settings::default();
        applied.apply_frame_payload(&encoded).unwrap();
        assert_eq!(applied.header_table_size, 4096);
        assert_eq!(applied.max_concurrent_streams, 100);
        assert_eq!(applied.initial_window_size, 65_535);
        assert!(!applied.enable_push);
    }

    #[test]
    fn rejects_a_misaligned_payload() {
        let mut settings = Settings::default();
        assert!(settings.apply_frame_payload(&[0u8; 5]).is_err());
    }

    #[test]
    fn rejects_an_out_of_range_max_frame_size() {
        let mut buf = BytesMut::new();
        buf.put_u16(SETTINGS_MAX_FRAME_SIZE);
        buf.put_u32(100);
        let mut settings = Settings::default();
        assert!(settings.apply_frame_payload(&buf).is_err());
    }

    #[test]
    fn unknown_identifiers_are_ignored() {
        let mut buf = BytesMut::new();
        buf.put_u16(0x9999);
        buf.put_u32(42);
        let mut settings = Settings::default();
        assert!(settings.apply_frame_payload(&buf).is_ok());
    }
}
