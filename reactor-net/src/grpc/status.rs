//! HTTP status always stays 200 once a gRPC response has started; the real
//! outcome travels in the `grpc-status`/`grpc-message` trailers (§4.C6,
//! §4.C12 "gRPC error handler").

use crate::error::Error;
use http::HeaderMap;

pub const GRPC_STATUS: &str = "grpc-status";
pub const GRPC_MESSAGE: &str = "grpc-message";

/// Builds the trailer pair for a terminal gRPC error.
pub fn error_trailers(error: &Error) -> HeaderMap {
    let (status, message) = error.grpc_trailer_pair();
    let mut trailers = HeaderMap::new();
    trailers.insert(
        http::HeaderName::from_static(GRPC_STATUS),
        status.parse().expect("status code digits are always a valid header value"),
    );
    if let Ok(value) = http::HeaderValue::from_str(&message) {
        trailers.insert(http::HeaderName::from_static(GRPC_MESSAGE), value);
    }
    trailers
}

/// Trailers for a successful call.
pub fn ok_trailers() -> HeaderMap {
    let mut trailers = HeaderMap::new();
    trailers.insert(http::HeaderName::from_static(GRPC_STATUS), http::HeaderValue::from_static("0"));
    trailers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn error_trailers_carry_mapped_status_and_message() {
        let err = Error::new(ErrorKind::NotFound, "route not found");
        let trailers = error_trailers(&err);
        assert_eq!(trailers.get(GRPC_STATUS).unwrap(), "12"); // Unimplemented
        assert_eq!(trailers.get(GRPC_MESSAGE).unwrap(), "route not found");
    }
}
