//! Multipart and URL-encoded body decoders (§4.C2).

pub mod multipart;
pub mod urlencoded;

pub use multipart::{MultipartDecoder, Part};
pub use urlencoded::decode_urlencoded;
