//! RFC 7540 §4 frame header and payload wrapper.

use crate::error::{Error, ErrorKind, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Data,
    Headers,
    Priority,
    RstStream,
    Settings,
    PushPromise,
    Ping,
    GoAway,
    WindowUpdate,
    Continuation,
    Unknown(u8),
}

impl FrameType {
    fn from_u8(v: u8) -> Self {
        match v {
            0x0 => FrameType::Data,
            0x1 => FrameType::Headers,
            0x2 => FrameType::Priority,
            0x3 => FrameType::RstStream,
            0x4 => FrameType::Settings,
            0x5 => FrameType::PushPromise,
            0x6 => FrameType::Ping,
            0x7 => FrameType::GoAway,
            0x8 => FrameType::WindowUpdate,
            0x9 => FrameType::Continuation,
            other => FrameType::Unknown(other),
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            FrameType::Data => 0x0,
            FrameType::Headers => 0x1,
            FrameType::Priority => 0x2,
            FrameType::RstStream => 0x3,
            FrameType::Settings => 0x4,
            FrameType::PushPromise => 0x5,
            FrameType::Ping => 0x6,
            FrameType::GoAway => 0x7,
            FrameType::WindowUpdate => 0x8,
            FrameType::Continuation => 0x9,
            FrameType::Unknown(v) => v,
        }
    }
}

pub const FLAG_END_STREAM: u8 = 0x1;
pub const FLAG_END_HEADERS: u8 = 0x4;
pub const FLAG_PADDED: u8 = 0x8;
pub const FLAG_ACK: u8 = 0x1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: FrameType,
    pub flags: u8,
    pub stream_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(frame_type: FrameType, flags: u8, stream_id: u32, payload: Bytes) -> Self {
        Self {
            header: FrameHeader {
                length: payload.len() as u32,
                frame_type,
                flags,
                stream_id,
            },
            payload,
        }
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.header.flags & flag != 0
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(9 + self.payload.len());
        buf.put_uint(self.payload.len() as u64, 3);
        buf.put_u8(self.header.frame_type.as_u8());
        buf.put_u8(self.header.flags);
        buf.put_u32(self.header.stream_id & 0x7FFF_FFFF);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Decodes one frame from `buf`, returning `None` if the buffer does
    /// not yet hold a complete frame.
    pub fn decode(buf: &[u8], max_frame_size: u32) -> Result<Option<(Frame, usize)>> {
        if buf.len() < 9 {
            return Ok(None);
        }
        let length = u32::from_be_bytes([0, buf[0], buf[1], buf[2]]);
        if length > max_frame_size {
            return Err(Error::new(ErrorKind::BadRequest, "frame exceeds negotiated max frame size"));
        }
        let total = 9 + length as usize;
        if buf.len() < total {
            return Ok(None);
        }
        let frame_type = FrameType::from_u8(buf[3]);
        let flags = buf[4];
        let mut stream_id_bytes = &buf[5..9];
        let stream_id = stream_id_bytes.get_u32() & 0x7FFF_FFFF;
        let payload = Bytes::copy_from_slice(&buf[9..total]);
        Ok(Some((
            Frame {
                header: FrameHeader {
                    length,
                    frame_type,
                    flags,
                    stream_id,
                },
                payload,
            },
            total,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_headers_frame() {
        let frame = Frame::new(FrameType::Headers, FLAG_END_HEADERS | FLAG_END_STREAM, 1, Bytes::from_static(b"hpack-bytes"));
        let encoded = frame.encode();
        let (decoded, consumed) = Frame::decode(&encoded, 16_384).unwrap().unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, frame);
        assert!(decoded.has_flag(FLAG_END_HEADERS));
        assert!(decoded.has_flag(FLAG_END_STREAM));
    }

    #[test]
    fn partial_frame_returns_none() {
        let frame = Frame::new(FrameType::Data, 0, 3, Bytes::from_static(b"hello"));
        let encoded = frame.encode();
        assert!(Frame::decode(&encoded[..5], 16_384).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let frame = Frame::new(FrameType::Data, 0, 3, Bytes::from(vec![0u8; 100]));
        let encoded = frame.encode();
        assert!(Frame::decode(&encoded, 50).is_err());
    }

    #[test]
    fn reserved_bit_is_masked_out_of_stream_id() {
        let mut buf = BytesMut::new();
        buf.put_uint(0, 3);
        buf.put_u8(FrameType::Ping.as_u8());
        buf.put_u8(0);
        buf.put_u32(0x8000_0007); // reserved bit set + stream id 7
        let (frame, _) = Frame::decode(&buf, 16_384).unwrap().unwrap();
        assert_eq!(frame.header.stream_id, 7);
    }
}
