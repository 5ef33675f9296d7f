//! Integration glue (§4.C12): the static resource handler and the gRPC
//! error handler that together with [`crate::exchange`] and
//! [`crate::router`] turn a matched route into a committed response.

mod grpc_error;
mod static_resource;

pub use grpc_error::GrpcErrorHandler;
pub use static_resource::StaticResourceHandler;
