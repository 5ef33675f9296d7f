//! gRPC transport over HTTP/2 (§4.C6): length-prefixed message framing with
//! optional per-message compression, status mapping, and `grpc-timeout`
//! deadlines. Framing is implemented natively — it's the hardest, most
//! educative core named in the purpose statement — while status/metadata
//! vocabulary stays compatible with `tonic` when the `grpc` feature pulls
//! it in for transport interop.

pub mod compression;
pub mod framing;
pub mod status;
pub mod timeout;

pub use compression::Compressor;
pub use framing::{FrameReader, FrameWriter};
pub use timeout::parse_grpc_timeout;

#[cfg(feature = "grpc")]
pub mod interop {
    //! Converts this crate's [`crate::error::Error`] into `tonic::Status`
    //! so a handler built on `reactor-net`'s framing can still be mounted
    //! behind a `tonic` transport when that's the deployment's choice.

    use crate::error::{Error, ErrorKind};

    pub fn to_tonic_status(error: &Error) -> tonic::Status {
        let code = match error.kind.grpc_code() {
            crate::error::tonic_like::Code::Ok => tonic::Code::Ok,
            crate::error::tonic_like::Code::Canceled => tonic::Code::Cancelled,
            crate::error::tonic_like::Code::Unknown => tonic::Code::Unknown,
            crate::error::tonic_like::Code::InvalidArgument => tonic::Code::InvalidArgument,
            crate::error::tonic_like::Code::DeadlineExceeded => tonic::Code::DeadlineExceeded,
            crate::error::tonic_like::Code::NotFound => tonic::Code::NotFound,
            crate::error::tonic_like::Code::AlreadyExists => tonic::Code::AlreadyExists,
            crate::error::tonic_like::Code::PermissionDenied => tonic::Code::PermissionDenied,
            crate::error::tonic_like::Code::ResourceExhausted => tonic::Code::ResourceExhausted,
            crate::error::tonic_like::Code::FailedPrecondition => tonic::Code::FailedPrecondition,
            crate::error::tonic_like::Code::Aborted => tonic::Code::Aborted,
            crate::error::tonic_like::Code::OutOfRange => tonic::Code::OutOfRange,
            crate::error::tonic_like::Code::Unimplemented => tonic::Code::Unimplemented,
            crate::error::tonic_like::Code::Internal => tonic::Code::Internal,
            crate::error::tonic_like::Code::Unavailable => tonic::Code::Unavailable,
            crate::error::tonic_like::Code::DataLoss => tonic::Code::DataLoss,
            crate::error::tonic_like::Code::Unauthenticated => tonic::Code::Unauthenticated,
        };
        tonic::Status::new(code, error.message.clone())
    }

    #[allow(dead_code)]
    fn _assert_kind_exhaustive(_: ErrorKind) {}
}
