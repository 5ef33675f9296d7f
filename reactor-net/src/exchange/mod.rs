//! The exchange handler contract (§4.C11): the reactive primitive wiring
//! a request through an optional interceptor chain to a response.

mod context;
mod handler;
mod request;
mod response;

pub use context::Context;
pub use handler::{run_chain, ErrorHandler, Handler, Interceptor};
pub use request::{BodyStream, Request, RequestBuilder};
pub use response::{BodyProducer, Response};

use crate::error::Error;

/// Terminal state of an [`Exchange`] (§3 "a terminal disposition
/// (completed, canceled, or failed)").
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    InFlight,
    Completed,
    Canceled,
    Failed(String),
}

/// One request/response pair plus its scratch context (§3 "Exchange").
/// Not `Clone`: it owns the response's body producer, which may be a
/// one-shot stream (§3 SUPPLEMENT "Clone/Debug derivation policy").
pub struct Exchange {
    pub request: Request,
    pub response: Response,
    pub context: Context,
    disposition: Disposition,
}

impl Exchange {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::new(),
            context: Context::new(),
            disposition: Disposition::InFlight,
        }
    }

    pub fn disposition(&self) -> &Disposition {
        &self.disposition
    }

    pub fn complete(&mut self) {
        if matches!(self.disposition, Disposition::InFlight) {
            self.disposition = Disposition::Completed;
        }
    }

    pub fn cancel(&mut self) {
        self.disposition = Disposition::Canceled;
    }

    pub fn fail(&mut self, error: &Error) {
        self.disposition = Disposition::Failed(error.to_string());
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.disposition, Disposition::InFlight)
    }

    /// Reassembles an `Exchange` from its parts — used by an
    /// [`ErrorHandler`] to hand a completed exchange back to the
    /// connection engine once it has committed a response onto the
    /// request/context it was given (§4.C12 "gRPC error handler").
    pub fn from_parts(request: Request, response: Response, context: Context, disposition: Disposition) -> Self {
        Self {
            request,
            response,
            context,
            disposition,
        }
    }

    /// Builds the [`ErrorExchange`] a handler failure produces, per §4.C11
    /// "the connection engine constructs an ErrorExchange wrapping the
    /// original request, a fresh Response ... and the Throwable".
    ///
    /// Returns `None` if the response has already committed headers — in
    /// that case §4.C11 calls for the connection to be closed abruptly
    /// instead of running the error handler.
    pub fn into_error_exchange(self, error: Error) -> Result<ErrorExchange, Exchange> {
        if self.response.is_committed() {
            Err(self)
        } else {
            Ok(ErrorExchange {
                request: self.request,
                response: Response::new(),
                context: self.context,
                error,
            })
        }
    }
}

/// Constructed when a handler's publisher terminates with an error and
/// headers were not yet committed (§4.C11 "Error exchange").
pub struct ErrorExchange {
    pub request: Request,
    pub response: Response,
    pub context: Context,
    pub error: Error,
}
