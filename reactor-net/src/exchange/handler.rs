//! §4.C11: "A handler is a function `Exchange → Publisher<Void>` whose
//! completion indicates response completion... Interceptors have the
//! same shape but may return a transformed Exchange."

use super::{ErrorExchange, Exchange};
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tower::util::BoxService;

/// The terminal handler contract. Implementations must be re-entrant and
/// must not block the connection's event loop (§4.C11) — in practice,
/// everything here is `async`, and CPU-bound work is expected to be
/// offloaded per §5's scheduling model rather than done inline.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, exchange: Exchange) -> Result<Exchange>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Exchange) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Exchange>> + Send,
{
    async fn handle(&self, exchange: Exchange) -> Result<Exchange> {
        (self)(exchange).await
    }
}

/// Same shape as [`Handler`], but runs ahead of the terminal handler and
/// may short-circuit by committing a synthetic response — the router
/// resolves an ordered interceptor chain per matched route (§4.C10,
/// §4.C11).
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Returns the (possibly transformed) exchange to pass to the next
    /// link in the chain. If the exchange's response is already
    /// committed on return, the chain stops there.
    async fn intercept(&self, exchange: Exchange) -> Result<Exchange>;
}

#[async_trait]
impl<F, Fut> Interceptor for F
where
    F: Fn(Exchange) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Exchange>> + Send,
{
    async fn intercept(&self, exchange: Exchange) -> Result<Exchange> {
        (self)(exchange).await
    }
}

/// Invoked when a handler's publisher terminates with an error and the
/// response has not yet committed headers (§4.C11 "Error exchange").
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle_error(&self, exchange: ErrorExchange) -> Result<Exchange>;
}

/// Runs an interceptor chain followed by the terminal handler, stopping
/// early if an interceptor commits the response.
pub async fn run_chain(
    interceptors: &[Arc<dyn Interceptor>],
    handler: &dyn Handler,
    mut exchange: Exchange,
) -> Result<Exchange> {
    for interceptor in interceptors {
        exchange = interceptor.intercept(exchange).await?;
        if exchange.response.is_committed() {
            return Ok(exchange);
        }
    }
    handler.handle(exchange).await
}

/// Adapts any [`Handler`] into a boxed `tower::Service`, so the Exchange
/// Handler Contract composes with `tower`/`tower-http` layers the way the
/// rest of the crate's connection/client stack does (§9 AMBIENT stack
/// note: "expressed as `tower::Service` + layers").
pub fn into_tower_service(
    handler: Arc<dyn Handler>,
) -> BoxService<Exchange, Exchange, crate::error::Error> {
    BoxService::new(tower::service_fn(move |exchange: Exchange| {
        let handler = Arc::clone(&handler);
        Box::pin(async move { handler.handle(exchange).await })
            as Pin<Box<dyn Future<Output = Result<Exchange>> + Send>>
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::Request;
    use http::Method;

    fn sample_request() -> Request {
        Request::builder().method(Method::GET).path_and_query("/").build()
    }

    #[tokio::test]
    async fn closure_handler_completes_the_exchange() {
        let handler = |mut exchange: Exchange| async move {
            exchange.complete();
            Ok(exchange)
        };
        let exchange = Exchange::new(sample_request());
        let result = handler.handle(exchange).await.unwrap();
        assert!(result.is_terminal());
    }

    #[tokio::test]
    async fn chain_stops_when_an_interceptor_commits_the_response() {
        use crate::exchange::BodyProducer;

        let short_circuit: Arc<dyn Interceptor> = Arc::new(|mut exchange: Exchange| async move {
            exchange.response.commit(BodyProducer::Empty)?;
            Ok(exchange)
        });
        let terminal_ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&terminal_ran);
        let handler: Arc<dyn Handler> = Arc::new(move |mut exchange: Exchange| {
            let flag = Arc::clone(&flag);
            async move {
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                exchange.complete();
                Ok(exchange)
            }
        });

        let exchange = Exchange::new(sample_request());
        let result = run_chain(&[short_circuit], handler.as_ref(), exchange).await.unwrap();
        assert!(result.response.is_committed());
        assert!(!terminal_ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
