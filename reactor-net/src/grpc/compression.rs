//! gRPC message compressors (§4.C6): `gzip`, `deflate`, `snappy`.

use crate::error::{Error, ErrorKind, Result};
use flate2::read::{DeflateDecoder, DeflateEncoder, GzDecoder, GzEncoder};
use flate2::Compression;
use std::io::Read;

pub trait Compressor: Send + Sync {
    fn name(&self) -> &'static str;
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

impl std::fmt::Debug for dyn Compressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Compressor").field(&self.name()).finish()
    }
}

pub struct Gzip;

impl Compressor for Gzip {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(data, Compression::default());
        let mut out = Vec::new();
        encoder.read_to_end(&mut out).map_err(Error::from)?;
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(Error::from)?;
        Ok(out)
    }
}

pub struct Deflate;

impl Compressor for Deflate {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(data, Compression::default());
        let mut out = Vec::new();
        encoder.read_to_end(&mut out).map_err(Error::from)?;
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = DeflateDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(Error::from)?;
        Ok(out)
    }
}

pub struct Snappy;

impl Compressor for Snappy {
    fn name(&self) -> &'static str {
        "snappy"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| Error::new(ErrorKind::Internal, format!("snappy compress: {e}")))?)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| Error::new(ErrorKind::Internal, format!("snappy decompress: {e}")))?)
    }
}

/// Resolves a `grpc-encoding` header value to a [`Compressor`].
/// Unrecognized encodings fail `UNIMPLEMENTED` per §4.C6.
pub fn by_name(name: &str) -> Result<Box<dyn Compressor>> {
    match name {
        "gzip" => Ok(Box::new(Gzip)),
        "deflate" => Ok(Box::new(Deflate)),
        "snappy" => Ok(Box::new(Snappy)),
        other => Err(Error::new(
            ErrorKind::NotFound,
            format!("unimplemented grpc-encoding: {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(c: &dyn Compressor) {
        let data = b"a message worth compressing, repeated a few times a few times a few times";
        let compressed = c.compress(data).unwrap();
        let decompressed = c.decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn gzip_round_trips() {
        round_trip(&Gzip);
    }

    #[test]
    fn deflate_round_trips() {
        round_trip(&Deflate);
    }

    #[test]
    fn snappy_round_trips() {
        round_trip(&Snappy);
    }

    #[test]
    fn unknown_encoding_is_unimplemented() {
        let err = by_name("brotli").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
