//! A scoped HPACK codec (RFC 7541): the 61-entry static table, the dynamic
//! table, and literal representations with and without incremental
//! indexing. Huffman-coded string literals are out of scope — every
//! string this codec emits or expects is a plain ASCII octet string
//! (`H` bit always `0`), which is a strict subset of wire-compatible
//! HPACK rather than a different protocol.

use crate::error::{Error, ErrorKind, Result};
use bytes::{BufMut, Bytes, BytesMut};

const STATIC_TABLE: &[(&str, &str)] = &[
    (":authority", ""),
    (":method", "GET"),
    (":method", "POST"),
    (":path", "/"),
    (":path", "/index.html"),
    (":scheme", "http"),
    (":scheme", "https"),
    (":status", "200"),
    (":status", "204"),
    (":status", "206"),
    (":status", "304"),
    (":status", "400"),
    (":status", "404"),
    (":status", "500"),
    ("accept-charset", ""),
    ("accept-encoding", "gzip, deflate"),
    ("accept-language", ""),
    ("accept-ranges", ""),
    ("accept", ""),
    ("access-control-allow-origin", ""),
    ("age", ""),
    ("allow", ""),
    ("authorization", ""),
    ("cache-control", ""),
    ("content-disposition", ""),
    ("content-encoding", ""),
    ("content-language", ""),
    ("content-length", ""),
    ("content-location", ""),
    ("content-range", ""),
    ("content-type", ""),
    ("cookie", ""),
    ("date", ""),
    ("etag", ""),
    ("expect", ""),
    ("expires", ""),
    ("from", ""),
    ("host", ""),
    ("if-match", ""),
    ("if-modified-since", ""),
    ("if-none-match", ""),
    ("if-range", ""),
    ("if-unmodified-since", ""),
    ("last-modified", ""),
    ("link", ""),
    ("location", ""),
    ("max-forwards", ""),
    ("proxy-authenticate", ""),
    ("proxy-authorization", ""),
    ("range", ""),
    ("referer", ""),
    ("refresh", ""),
    ("retry-after", ""),
    ("server", ""),
    ("set-cookie", ""),
    ("strict-transport-security", ""),
    ("transfer-encoding", ""),
    ("user-agent", ""),
    ("vary", ""),
    ("via", ""),
    ("www-authenticate", ""),
];

/// Per-entry accounting overhead per RFC 7541 §4.1.
const ENTRY_OVERHEAD: usize = 32;

fn encode_integer(buf: &mut BytesMut, prefix_bits: u8, flags: u8, mut value: u32) {
    let max_prefix = (1u32 << prefix_bits) - 1;
    if value < max_prefix {
        buf.put_u8(flags | value as u8);
        return;
    }
    buf.put_u8(flags | max_prefix as u8);
    value -= max_prefix;
    while value >= 128 {
        buf.put_u8(((value % 128) | 0x80) as u8);
        value /= 128;
    }
    buf.put_u8(value as u8);
}

fn decode_integer(data: &[u8], prefix_bits: u8) -> Result<(u32, usize)> {
    if data.is_empty() {
        return Err(Error::new(ErrorKind::BadRequest, "truncated HPACK integer"));
    }
    let max_prefix = (1u32 << prefix_bits) - 1;
    let mut value = (data[0] as u32) & max_prefix;
    if value < max_prefix {
        return Ok((value, 1));
    }
    let mut consumed = 1;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(consumed)
            .ok_or_else(|| Error::new(ErrorKind::BadRequest, "truncated HPACK integer continuation"))?;
        value = value
            .checked_add(((byte & 0x7f) as u32) << shift)
            .ok_or_else(|| Error::new(ErrorKind::BadRequest, "HPACK integer overflow"))?;
        consumed += 1;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok((value, consumed))
}

fn encode_string(buf: &mut BytesMut, s: &str) {
    encode_integer(buf, 7, 0x00, s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn decode_string(data: &[u8]) -> Result<(String, usize)> {
    if data.is_empty() {
        return Err(Error::new(ErrorKind::BadRequest, "truncated HPACK string"));
    }
    if data[0] & 0x80 != 0 {
        return Err(Error::new(ErrorKind::UnsupportedType, "Huffman-coded HPACK strings are not supported"));
    }
    let (len, len_size) = decode_integer(data, 7)?;
    let len = len as usize;
    let body = data
        .get(len_size..len_size + len)
        .ok_or_else(|| Error::new(ErrorKind::BadRequest, "truncated HPACK string body"))?;
    let s = std::str::from_utf8(body)
        .map_err(|_| Error::new(ErrorKind::BadRequest, "HPACK string body is not valid UTF-8"))?
        .to_owned();
    Ok((s, len_size + len))
}

/// Shared dynamic-table bookkeeping (RFC 7541 §2.3.2), kept mirrored
/// between the encoder and decoder sides as headers are processed.
#[derive(Debug, Default)]
struct DynamicTable {
    entries: std::collections::VecDeque<(String, String)>,
    size: usize,
    max_size: usize,
}

impl DynamicTable {
    fn new(max_size: usize) -> Self {
        Self {
            entries: std::collections::VecDeque::new(),
            size: 0,
            max_size,
        }
    }

    fn insert(&mut self, name: String, value: String) {
        self.size += ENTRY_OVERHEAD + name.len() + value.len();
        self.entries.push_front((name, value));
        while self.size > self.max_size {
            if let Some((name, value)) = self.entries.pop_back() {
                self.size -= ENTRY_OVERHEAD + name.len() + value.len();
            } else {
                break;
            }
        }
    }

    fn get(&self, dynamic_index: usize) -> Option<&(String, String)> {
        self.entries.get(dynamic_index)
    }

    fn find(&self, name: &str, value: Option<&str>) -> Option<(usize, bool)> {
        self.entries.iter().enumerate().find_map(|(i, (n, v))| {
            if n == name && value.map(|value| value == v).unwrap_or(false) {
                Some((i, true))
            } else if n == name {
                Some((i, false))
            } else {
                None
            }
        })
    }
}

fn static_find(name: &str, value: Option<&str>) -> Option<(usize, bool)> {
    STATIC_TABLE.iter().enumerate().find_map(|(i, (n, v))| {
        if *n == name && value.map(|value| value == *v).unwrap_or(false) {
            Some((i, true))
        } else if *n == name {
            Some((i, false))
        } else {
            None
        }
    })
}

/// Encodes header lists into HPACK representations, maintaining its own
/// dynamic table across calls for one connection's send direction.
pub struct HpackEncoder {
    dynamic: DynamicTable,
}

impl HpackEncoder {
    pub fn new(max_dynamic_size: usize) -> Self {
        Self {
            dynamic: DynamicTable::new(max_dynamic_size),
        }
    }

    /// Encodes `headers` as a HEADERS block fragment. Header fields whose
    /// name (and optionally value) already appear in the static or
    /// dynamic table reference the table; unmatched fields are encoded
    /// as literals with incremental indexing, growing the dynamic table.
    pub fn encode(&mut self, headers: &[(String, String)]) -> Bytes {
        let mut buf = BytesMut::new();
        for (name, value) in headers {
            if let Some((index, exact)) = static_find(name, Some(value)) {
                if exact {
                    encode_integer(&mut buf, 7, 0x80, (index + 1) as u32);
                    continue;
                }
                self.encode_literal_with_indexing(&mut buf, Some(index + 1), name, value);
                continue;
            }
            let static_len = STATIC_TABLE.len();
            if let Some((index, exact)) = self.dynamic.find(name, Some(value)) {
                if exact {
                    encode_integer(&mut buf, 7, 0x80, (static_len + index + 1) as u32);
                    continue;
                }
                self.encode_literal_with_indexing(&mut buf, Some(static_len + index + 1), name, value);
                continue;
            }
            self.encode_literal_with_indexing(&mut buf, None, name, value);
        }
        buf.freeze()
    }

    fn encode_literal_with_indexing(&mut self, buf: &mut BytesMut, name_index: Option<usize>, name: &str, value: &str) {
        match name_index {
            Some(index) => encode_integer(buf, 6, 0x40, index as u32),
            None => {
                buf.put_u8(0x40);
                encode_string(buf, name);
            }
        }
        encode_string(buf, value);
        self.dynamic.insert(name.to_owned(), value.to_owned());
    }
}

/// Decodes HPACK representations back into header lists, mirroring the
/// encoder's dynamic table on the receive side.
pub struct HpackDecoder {
    dynamic: DynamicTable,
}

impl HpackDecoder {
    pub fn new(max_dynamic_size: usize) -> Self {
        Self {
            dynamic: DynamicTable::new(max_dynamic_size),
        }
    }

    pub fn decode(&mut self, mut data: &[u8]) -> Result<Vec<(String, String)>> {
        let mut headers = Vec::new();
        while !data.is_empty() {
            let first = data[0];
            if first & 0x80 != 0 {
                let (index, consumed) = decode_integer(data, 7)?;
                headers.push(self.resolve_indexed(index)?);
                data = &data[consumed..];
            } else if first & 0x40 != 0 {
                let (name, value, consumed) = self.decode_literal(data, 6)?;
                self.dynamic.insert(name.clone(), value.clone());
                headers.push((name, value));
                data = &data[consumed..];
            } else if first & 0x20 != 0 {
                let (new_size, consumed) = decode_integer(data, 5)?;
                self.dynamic.max_size = new_size as usize;
                while self.dynamic.size > self.dynamic.max_size {
                    if self.dynamic.entries.pop_back().is_none() {
                        break;
                    }
                }
                data = &data[consumed..];
            } else {
                let (name, value, consumed) = self.decode_literal(data, 4)?;
                headers.push((name, value));
                data = &data[consumed..];
            }
        }
        Ok(headers)
    }

    fn resolve_indexed(&self, index: u32) -> Result<(String, String)> {
        let index = index as usize;
        if index == 0 {
            return Err(Error::new(ErrorKind::BadRequest, "HPACK index 0 is not addressable"));
        }
        let index = index - 1;
        if index < STATIC_TABLE.len() {
            let (name, value) = STATIC_TABLE[index];
            return Ok((name.to_owned(), value.to_owned()));
        }
        let dynamic_index = index - STATIC_TABLE.len();
        self.dynamic
            .get(dynamic_index)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::BadRequest, "HPACK index out of range"))
    }

    fn decode_literal(&self, data: &[u8], prefix_bits: u8) -> Result<(String, String, usize)> {
        let (name_index, mut consumed) = decode_integer(data, prefix_bits)?;
        let name = if name_index == 0 {
            let (name, name_consumed) = decode_string(&data[consumed..])?;
            consumed += name_consumed;
            name
        } else {
            self.resolve_indexed(name_index)?.0
        };
        let (value, value_consumed) = decode_string(&data[consumed..])?;
        consumed += value_consumed;
        Ok((name, value, consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect()
    }

    #[test]
    fn fully_static_headers_round_trip() {
        let mut encoder = HpackEncoder::new(4096);
        let mut decoder = HpackDecoder::new(4096);
        let input = headers(&[(":method", "GET"), (":scheme", "https"), (":status", "200")]);
        let encoded = encoder.encode(&input);
        let decoded = decoder.decode(&encoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn novel_header_enters_the_dynamic_table_and_later_refs_stay_indexed() {
        let mut encoder = HpackEncoder::new(4096);
        let mut decoder = HpackDecoder::new(4096);
        let first = headers(&[("x-request-id", "abc123")]);
        let second = headers(&[("x-request-id", "abc123")]);
        let encoded_first = encoder.encode(&first);
        assert_eq!(decoder.decode(&encoded_first).unwrap(), first);
        let encoded_second = encoder.encode(&second);
        // second encoding is a pure indexed reference, much shorter than the literal.
        assert!(encoded_second.len() < encoded_first.len());
        assert_eq!(decoder.decode(&encoded_second).unwrap(), second);
    }

    #[test]
    fn dynamic_table_evicts_oldest_entries_once_it_overflows() {
        let mut encoder = HpackEncoder::new(64);
        let mut decoder = HpackDecoder::new(64);
        for i in 0..5 {
            let pair = headers(&[("x-seq", &i.to_string())]);
            let encoded = encoder.encode(&pair);
            assert_eq!(decoder.decode(&encoded).unwrap(), pair);
        }
        assert!(decoder.dynamic.size <= 64);
    }

    #[test]
    fn huffman_coded_strings_are_rejected_rather_than_misread() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x40); // literal with incremental indexing, new name
        buf.put_u8(0x80); // H bit set, length 0
        let mut decoder = HpackDecoder::new(4096);
        assert!(decoder.decode(&buf).is_err());
    }
}
