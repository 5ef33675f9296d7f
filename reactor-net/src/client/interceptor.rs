//! Client-side interceptor chain (§4.C7): the same short-circuiting
//! contract as the server's [`crate::exchange::run_chain`], but over a
//! request that has not yet been sent.

use crate::error::Result;
use crate::exchange::Exchange;
use async_trait::async_trait;

/// Observes or rewrites an outbound request, or short-circuits by
/// committing a response before the request ever reaches the wire
/// (cache hits, auth rejections, synthetic responses in tests).
#[async_trait]
pub trait ClientInterceptor: Send + Sync {
    async fn intercept(&self, exchange: Exchange) -> Result<Exchange>;
}

#[async_trait]
impl<F, Fut> ClientInterceptor for F
where
    F: Fn(Exchange) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Exchange>> + Send,
{
    async fn intercept(&self, exchange: Exchange) -> Result<Exchange> {
        self(exchange).await
    }
}

/// Runs `interceptors` in order, stopping as soon as one commits the
/// response (mirrors [`crate::exchange::run_chain`]'s short-circuit rule).
pub async fn run_client_chain(interceptors: &[std::sync::Arc<dyn ClientInterceptor>], mut exchange: Exchange) -> Result<Exchange> {
    for interceptor in interceptors {
        exchange = interceptor.intercept(exchange).await?;
        if exchange.response.is_committed() {
            return Ok(exchange);
        }
    }
    Ok(exchange)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{BodyProducer, Request};

    #[tokio::test]
    async fn a_committing_interceptor_short_circuits_the_chain() {
        let cache_hit: std::sync::Arc<dyn ClientInterceptor> = std::sync::Arc::new(|mut exchange: Exchange| async move {
            exchange.response.commit(BodyProducer::Empty)?;
            Ok(exchange)
        });
        let never_called: std::sync::Arc<dyn ClientInterceptor> = std::sync::Arc::new(|_: Exchange| async move {
            panic!("should not run after a committed response");
        });
        let exchange = Exchange::new(Request::builder().build());
        let result = run_client_chain(&[cache_hit, never_called], exchange).await.unwrap();
        assert!(result.response.is_committed());
    }
}
