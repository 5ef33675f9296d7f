//! Chunked transfer-encoding codec (§4.C3 SUPPLEMENT): RFC 7230 §4.1
//! framing — chunk-size line, chunk data, trailing CRLF, a zero-length
//! terminal chunk with optional trailers.

use crate::error::{Error, ErrorKind, Result};
use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};

pub struct ChunkedEncoder;

impl ChunkedEncoder {
    /// Encodes one data chunk. Empty input is a no-op (use [`Self::encode_final`]
    /// to terminate the stream).
    pub fn encode_chunk(data: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(data.len() + 16);
        buf.put_slice(format!("{:x}\r\n", data.len()).as_bytes());
        buf.put_slice(data);
        buf.put_slice(b"\r\n");
        buf.freeze()
    }

    /// Encodes the terminal zero-length chunk, with trailers if any.
    pub fn encode_final(trailers: Option<&HeaderMap>) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_slice(b"0\r\n");
        if let Some(trailers) = trailers {
            for (name, value) in trailers {
                buf.put_slice(name.as_str().as_bytes());
                buf.put_slice(b": ");
                buf.put_slice(value.as_bytes());
                buf.put_slice(b"\r\n");
            }
        }
        buf.put_slice(b"\r\n");
        buf.freeze()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ChunkedEvent {
    Data(Bytes),
    End(HeaderMap),
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    ChunkSize,
    ChunkData(usize),
    ChunkDataCrlf,
    Trailers,
    Done,
}

/// A pull decoder: feed bytes as they arrive off the wire, then drain
/// zero or more [`ChunkedEvent`]s.
pub struct ChunkedDecoder {
    buffer: BytesMut,
    state: State,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            state: State::ChunkSize,
        }
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the next decoded event, or `None` if more bytes are needed.
    pub fn next_event(&mut self) -> Result<Option<ChunkedEvent>> {
        loop {
            match self.state {
                State::Done => return Ok(None),
                State::ChunkSize => {
                    let Some(line_end) = find_crlf(&self.buffer) else {
                        return Ok(None);
                    };
                    let line = std::str::from_utf8(&self.buffer[..line_end])
                        .map_err(|_| malformed("chunk size not UTF-8"))?;
                    let size_str = line.split(';').next().unwrap_or("").trim();
                    let size = usize::from_str_radix(size_str, 16).map_err(|_| malformed("invalid chunk size"))?;
                    let _ = self.buffer.split_to(line_end + 2);
                    self.state = if size == 0 {
                        State::Trailers
                    } else {
                        State::ChunkData(size)
                    };
                }
                State::ChunkData(size) => {
                    if self.buffer.len() < size {
                        return Ok(None);
                    }
                    let chunk = self.buffer.split_to(size).freeze();
                    self.state = State::ChunkDataCrlf;
                    return Ok(Some(ChunkedEvent::Data(chunk)));
                }
                State::ChunkDataCrlf => {
                    if self.buffer.len() < 2 {
                        return Ok(None);
                    }
                    if &self.buffer[..2] != b"\r\n" {
                        return Err(malformed("chunk data not followed by CRLF"));
                    }
                    let _ = self.buffer.split_to(2);
                    self.state = State::ChunkSize;
                }
                State::Trailers => {
                    let Some(terminator) = memchr::memmem::find(&self.buffer, b"\r\n\r\n") else {
                        return Ok(None);
                    };
                    let mut trailers = HeaderMap::new();
                    for line in self.buffer[..terminator].split(|&b| b == b'\n') {
                        let line = line.strip_suffix(b"\r").unwrap_or(line);
                        if line.is_empty() {
                            continue;
                        }
                        let text = std::str::from_utf8(line).map_err(|_| malformed("trailer not UTF-8"))?;
                        let (name, value) = text.split_once(':').ok_or_else(|| malformed("trailer missing ':'"))?;
                        let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| malformed("invalid trailer name"))?;
                        let value = HeaderValue::from_str(value.trim()).map_err(|_| malformed("invalid trailer value"))?;
                        trailers.append(name, value);
                    }
                    let _ = self.buffer.split_to(terminator + 4);
                    self.state = State::Done;
                    return Ok(Some(ChunkedEvent::End(trailers)));
                }
            }
        }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    memchr::memmem::find(buf, b"\r\n")
}

fn malformed(message: &str) -> Error {
    Error::new(ErrorKind::BadRequest, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_two_chunks_and_a_trailer() {
        let mut wire = BytesMut::new();
        wire.put(ChunkedEncoder::encode_chunk(b"hello "));
        wire.put(ChunkedEncoder::encode_chunk(b"world"));
        let mut trailers = HeaderMap::new();
        trailers.insert("x-checksum", HeaderValue::from_static("abc"));
        wire.put(ChunkedEncoder::encode_final(Some(&trailers)));

        let mut decoder = ChunkedDecoder::new();
        decoder.feed(&wire);

        let mut collected = Vec::new();
        loop {
            match decoder.next_event().unwrap() {
                Some(ChunkedEvent::Data(data)) => collected.extend_from_slice(&data),
                Some(ChunkedEvent::End(trailers)) => {
                    assert_eq!(trailers.get("x-checksum").unwrap(), "abc");
                    break;
                }
                None => panic!("decoder starved on fully-buffered input"),
            }
        }
        assert_eq!(collected, b"hello world");
    }

    #[test]
    fn feeds_byte_by_byte_without_losing_data() {
        let wire = ChunkedEncoder::encode_chunk(b"abc");
        let mut final_chunk = BytesMut::new();
        final_chunk.put(wire);
        final_chunk.put(ChunkedEncoder::encode_final(None));

        let mut decoder = ChunkedDecoder::new();
        let mut collected = Vec::new();
        let mut ended = false;
        for byte in final_chunk.iter() {
            decoder.feed(&[*byte]);
            while let Some(event) = decoder.next_event().unwrap() {
                match event {
                    ChunkedEvent::Data(data) => collected.extend_from_slice(&data),
                    ChunkedEvent::End(_) => ended = true,
                }
            }
        }
        assert_eq!(collected, b"abc");
        assert!(ended);
    }

    #[test]
    fn missing_data_crlf_is_rejected() {
        let mut decoder = ChunkedDecoder::new();
        decoder.feed(b"3\r\nabcXX");
        assert!(decoder.next_event().is_err());
    }
}
