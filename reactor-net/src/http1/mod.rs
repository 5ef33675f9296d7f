//! HTTP/1.x connection engine (§4.C3): request parsing, pipelining order,
//! chunked transfer-encoding, and H2C upgrade detection.

mod chunked;
mod connection;
mod parser;
mod upgrade;

pub use chunked::{ChunkedDecoder, ChunkedEncoder, ChunkedEvent};
pub use connection::{ConnectionState, PipelineQueue, Ticket};
pub use parser::{parse_request_head, HttpVersion, RequestHead};
pub use upgrade::{detect_h2c_upgrade, H2cUpgrade};
