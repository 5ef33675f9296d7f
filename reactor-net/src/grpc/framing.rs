//! 5-byte prefixed gRPC message framing (§4.C6): 1 compression-flag byte +
//! 4-byte big-endian length + payload.

use super::compression::Compressor;
use crate::error::{Error, ErrorKind, Result};
use bytes::{Buf, Bytes, BytesMut};

const PREFIX_LEN: usize = 5;

/// Buffers inbound byte chunks and yields exactly one decoded message per
/// complete frame, regardless of how chunk boundaries fall relative to
/// frame boundaries (§8 property 4).
pub struct FrameReader {
    buffer: BytesMut,
    max_message_bytes: usize,
    compressor: Option<Box<dyn Compressor>>,
}

impl FrameReader {
    pub fn new(max_message_bytes: usize, compressor: Option<Box<dyn Compressor>>) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_message_bytes,
            compressor,
        }
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pulls every complete frame currently buffered. A partial frame is
    /// left in the buffer for the next `push_chunk`.
    pub fn drain_messages(&mut self) -> Result<Vec<Bytes>> {
        let mut out = Vec::new();
        loop {
            if self.buffer.len() < PREFIX_LEN {
                return Ok(out);
            }
            let compressed = self.buffer[0] == 1;
            let len = u32::from_be_bytes([
                self.buffer[1],
                self.buffer[2],
                self.buffer[3],
                self.buffer[4],
            ]) as usize;
            if len > self.max_message_bytes {
                return Err(Error::new(
                    ErrorKind::ResourceExhausted,
                    format!("gRPC message of {len} bytes exceeds max {}", self.max_message_bytes),
                ));
            }
            if self.buffer.len() < PREFIX_LEN + len {
                return Ok(out);
            }
            self.buffer.advance(PREFIX_LEN);
            let payload = self.buffer.split_to(len).freeze();
            let message = if compressed {
                let compressor = self.compressor.as_deref().ok_or_else(|| {
                    Error::new(ErrorKind::BadRequest, "compressed frame with no compressor configured")
                })?;
                Bytes::from(compressor.decompress(&payload)?)
            } else {
                payload
            };
            out.push(message);
        }
    }
}

/// Serializes outgoing messages into the same 5-byte-prefixed framing,
/// compressing when a compressor is set and the message exceeds
/// `compression_threshold_bytes`.
pub struct FrameWriter {
    compressor: Option<Box<dyn Compressor>>,
    compression_threshold_bytes: usize,
}

impl FrameWriter {
    pub fn new(compressor: Option<Box<dyn Compressor>>, compression_threshold_bytes: usize) -> Self {
        Self {
            compressor,
            compression_threshold_bytes,
        }
    }

    pub fn encode(&self, message: &[u8]) -> Result<Bytes> {
        let (flag, body) = match &self.compressor {
            Some(c) if message.len() >= self.compression_threshold_bytes => {
                (1u8, c.compress(message)?)
            }
            _ => (0u8, message.to_vec()),
        };
        let mut frame = BytesMut::with_capacity(PREFIX_LEN + body.len());
        frame.extend_from_slice(&[flag]);
        frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
        frame.extend_from_slice(&body);
        Ok(frame.freeze())
    }
}
