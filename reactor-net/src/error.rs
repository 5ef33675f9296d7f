//! Error kinds and mappings to HTTP status codes and gRPC status codes.
//!
//! `reactor-net` uses a single internal [`Error`] type across the connection
//! engines, the client, discovery and the router. Each subsystem variant
//! owns only the context it can report without peeking at another layer;
//! outward mapping to HTTP (§4.C12) and gRPC (§4.C6) status lives in
//! [`ErrorKind::status_code`] and [`ErrorKind::grpc_code`].

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The stable error kinds named in the error handling design.
///
/// Kept as a flat enum rather than nested per-subsystem enums: every kind
/// maps to exactly one HTTP status and one gRPC status, and callers
/// (connection engines, the gRPC error handler) only ever need to ask
/// "what kind is this", never "which subsystem produced it".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedHeader,
    HeadersTooLarge,
    UriTooLong,
    BadRequest,
    NotFound,
    UnsupportedMediaType,
    NotAcceptable,
    Internal,
    StreamContention,
    ResourceExhausted,
    Canceled,
    DeadlineExceeded,
    Unavailable,
    IllegalScheme,
    PoolExhausted,
    UpgradeRefused,
    /// Not one of the named kinds; used for parameter-converter failures
    /// whose dedicated kind (`UNSUPPORTED_TYPE`, §4.C1) has no HTTP/gRPC
    /// standing of its own and is reported as a bad request.
    UnsupportedType,
}

impl ErrorKind {
    /// HTTP status this kind is reported as (§4.C12 error mapping).
    pub fn status_code(self) -> http::StatusCode {
        use http::StatusCode as S;
        match self {
            ErrorKind::MalformedHeader => S::BAD_REQUEST,
            ErrorKind::HeadersTooLarge => S::REQUEST_HEADER_FIELDS_TOO_LARGE,
            ErrorKind::UriTooLong => S::URI_TOO_LONG,
            ErrorKind::BadRequest => S::BAD_REQUEST,
            ErrorKind::NotFound => S::NOT_FOUND,
            ErrorKind::UnsupportedMediaType => S::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::NotAcceptable => S::NOT_ACCEPTABLE,
            ErrorKind::Internal => S::INTERNAL_SERVER_ERROR,
            ErrorKind::StreamContention => S::CONFLICT,
            ErrorKind::ResourceExhausted => S::PAYLOAD_TOO_LARGE,
            ErrorKind::Canceled => S::REQUEST_TIMEOUT,
            ErrorKind::DeadlineExceeded => S::GATEWAY_TIMEOUT,
            ErrorKind::Unavailable => S::SERVICE_UNAVAILABLE,
            ErrorKind::IllegalScheme => S::BAD_REQUEST,
            ErrorKind::PoolExhausted => S::SERVICE_UNAVAILABLE,
            ErrorKind::UpgradeRefused => S::BAD_REQUEST,
            ErrorKind::UnsupportedType => S::BAD_REQUEST,
        }
    }

    /// gRPC status code this kind maps to (§4.C6 status mapping table, plus
    /// the direct mappings for kinds that already speak gRPC semantics).
    pub fn grpc_code(self) -> tonic_like::Code {
        use tonic_like::Code;
        match self {
            ErrorKind::MalformedHeader | ErrorKind::BadRequest => Code::Internal,
            ErrorKind::NotFound => Code::Unimplemented,
            ErrorKind::Canceled => Code::Canceled,
            ErrorKind::ResourceExhausted => Code::ResourceExhausted,
            ErrorKind::DeadlineExceeded => Code::DeadlineExceeded,
            ErrorKind::Unavailable | ErrorKind::PoolExhausted => Code::Unavailable,
            ErrorKind::UpgradeRefused => Code::Unavailable,
            ErrorKind::IllegalScheme => Code::InvalidArgument,
            ErrorKind::UnsupportedType => Code::InvalidArgument,
            ErrorKind::StreamContention => Code::Aborted,
            ErrorKind::HeadersTooLarge | ErrorKind::UriTooLong => Code::Internal,
            ErrorKind::UnsupportedMediaType | ErrorKind::NotAcceptable => Code::Internal,
            ErrorKind::Internal => Code::Internal,
        }
    }

    /// Maps an observed HTTP status to a gRPC status per §4.C6's table.
    /// Used by the gRPC error handler (§4.C12) when the failure originated
    /// below the gRPC layer (e.g. a router miss that would otherwise be a
    /// plain 404).
    pub fn grpc_code_for_http(status: http::StatusCode) -> tonic_like::Code {
        use tonic_like::Code;
        match status.as_u16() {
            400 => Code::Internal,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::Unimplemented,
            408 => Code::Canceled,
            429 | 502 | 503 | 504 => Code::Unavailable,
            s if (500..600).contains(&s) => Code::Internal,
            _ => Code::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::MalformedHeader => "MALFORMED_HEADER",
            ErrorKind::HeadersTooLarge => "HEADERS_TOO_LARGE",
            ErrorKind::UriTooLong => "URI_TOO_LONG",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ErrorKind::NotAcceptable => "NOT_ACCEPTABLE",
            ErrorKind::Internal => "INTERNAL",
            ErrorKind::StreamContention => "STREAM_CONTENTION",
            ErrorKind::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ErrorKind::Canceled => "CANCELED",
            ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::IllegalScheme => "ILLEGAL_SCHEME",
            ErrorKind::PoolExhausted => "POOL_EXHAUSTED",
            ErrorKind::UpgradeRefused => "UPGRADE_REFUSED",
            ErrorKind::UnsupportedType => "UNSUPPORTED_TYPE",
        };
        f.write_str(s)
    }
}

/// A minimal, local stand-in for `tonic::Code` so the crate can map gRPC
/// status without requiring the `grpc` feature. When `grpc` is enabled,
/// [`Error::into_tonic_status`] converts into the real `tonic::Status`.
pub mod tonic_like {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Code {
        Ok,
        Canceled,
        Unknown,
        InvalidArgument,
        DeadlineExceeded,
        NotFound,
        AlreadyExists,
        PermissionDenied,
        ResourceExhausted,
        FailedPrecondition,
        Aborted,
        OutOfRange,
        Unimplemented,
        Internal,
        Unavailable,
        DataLoss,
        Unauthenticated,
    }

    impl Code {
        pub fn as_i32(self) -> i32 {
            match self {
                Code::Ok => 0,
                Code::Canceled => 1,
                Code::Unknown => 2,
                Code::InvalidArgument => 3,
                Code::DeadlineExceeded => 4,
                Code::NotFound => 5,
                Code::AlreadyExists => 6,
                Code::PermissionDenied => 7,
                Code::ResourceExhausted => 8,
                Code::FailedPrecondition => 9,
                Code::Aborted => 10,
                Code::OutOfRange => 11,
                Code::Unimplemented => 12,
                Code::Internal => 13,
                Code::Unavailable => 14,
                Code::DataLoss => 15,
                Code::Unauthenticated => 16,
            }
        }
    }
}

/// The crate's error type: a kind plus a short, human-readable message.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed_header(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedHeader, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn illegal_scheme(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalScheme, message)
    }

    /// The `grpc-status`/`grpc-message` trailer pair for this error (§4.C12).
    pub fn grpc_trailer_pair(&self) -> (String, String) {
        (
            self.kind.grpc_code().as_i32().to_string(),
            self.message.clone(),
        )
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Error::new(ErrorKind::Internal, format!("configuration error: {e}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::new(ErrorKind::Internal, format!("io error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping_matches_error_handling_table() {
        assert_eq!(ErrorKind::UriTooLong.status_code(), http::StatusCode::URI_TOO_LONG);
        assert_eq!(
            ErrorKind::HeadersTooLarge.status_code(),
            http::StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
        );
        assert_eq!(ErrorKind::BadRequest.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn grpc_status_mapping_matches_table() {
        use tonic_like::Code;
        assert_eq!(ErrorKind::grpc_code_for_http(http::StatusCode::BAD_REQUEST), Code::Internal);
        assert_eq!(ErrorKind::grpc_code_for_http(http::StatusCode::UNAUTHORIZED), Code::Unauthenticated);
        assert_eq!(ErrorKind::grpc_code_for_http(http::StatusCode::FORBIDDEN), Code::PermissionDenied);
        assert_eq!(ErrorKind::grpc_code_for_http(http::StatusCode::NOT_FOUND), Code::Unimplemented);
        assert_eq!(ErrorKind::grpc_code_for_http(http::StatusCode::REQUEST_TIMEOUT), Code::Canceled);
        assert_eq!(ErrorKind::grpc_code_for_http(http::StatusCode::TOO_MANY_REQUESTS), Code::Unavailable);
        assert_eq!(ErrorKind::grpc_code_for_http(http::StatusCode::BAD_GATEWAY), Code::Unavailable);
        assert_eq!(ErrorKind::grpc_code_for_http(http::StatusCode::SERVICE_UNAVAILABLE), Code::Unavailable);
        assert_eq!(ErrorKind::grpc_code_for_http(http::StatusCode::GATEWAY_TIMEOUT), Code::Unavailable);
        assert_eq!(ErrorKind::grpc_code_for_http(http::StatusCode::INTERNAL_SERVER_ERROR), Code::Internal);
    }
}
