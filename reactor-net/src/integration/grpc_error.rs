//! gRPC error handler (§4.C12): "rewrites HTTP status to 200, maps the
//! underlying exception to a gRPC status code, and writes `grpc-status`
//! and `grpc-message` into response trailers."

use crate::error::Result;
use crate::exchange::{BodyProducer, Disposition, ErrorExchange, ErrorHandler, Exchange};
use crate::grpc::status::error_trailers;
use async_trait::async_trait;
use http::StatusCode;

pub struct GrpcErrorHandler;

#[async_trait]
impl ErrorHandler for GrpcErrorHandler {
    async fn handle_error(&self, error_exchange: ErrorExchange) -> Result<Exchange> {
        let ErrorExchange {
            request,
            mut response,
            context,
            error,
        } = error_exchange;

        response.set_status(StatusCode::OK)?;
        response.set_trailers(error_trailers(&error));
        response.commit(BodyProducer::Empty)?;

        Ok(Exchange::from_parts(
            request,
            response,
            context,
            Disposition::Failed(error.to_string()),
        ))
    }
}
