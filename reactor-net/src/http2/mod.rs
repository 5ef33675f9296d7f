//! HTTP/2 connection engine (§4.C4): settings exchange, HEADERS/DATA
//! framing, a scoped HPACK codec, per-stream state, and flow control.

mod flow_control;
mod frame;
mod hpack;
mod settings;
mod stream;

pub use flow_control::FlowWindow;
pub use frame::{Frame, FrameHeader, FrameType, FLAG_ACK, FLAG_END_HEADERS, FLAG_END_STREAM, FLAG_PADDED};
pub use hpack::{HpackDecoder, HpackEncoder};
pub use settings::Settings;
pub use stream::{StreamState, StreamTable};
