//! Retry and circuit-breaking around calls to upstream services.

mod circuit_breaker;
mod retry_policy;

pub use circuit_breaker::{BreakerState, CircuitBreaker, CircuitBreakerConfig};
pub use retry_policy::RetryPolicy;

use std::future::Future;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GuardError<E> {
    #[error("Circuit breaker for {0} is open")]
    Open(String),

    #[error("{0}")]
    Failed(E),
}

/// A circuit breaker and retry policy for one upstream service.
pub struct ServiceGuard {
    name: String,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl ServiceGuard {
    pub fn new(name: impl Into<String>, breaker: CircuitBreakerConfig, retry: RetryPolicy) -> Self {
        let name = name.into();
        Self {
            breaker: CircuitBreaker::new(name.clone(), breaker),
            name,
            retry,
        }
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    /// Run `op`, retrying retryable failures with backoff.
    ///
    /// Only retryable failures count against the breaker; once it opens the
    /// remaining attempts are abandoned. A non-retryable error is a reply
    /// about this request alone and leaves the service counted as healthy.
    pub async fn call<T, E, F, Fut>(
        &self,
        is_retryable: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, GuardError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut retry_count = 0;
        loop {
            if !self.breaker.allow_request() {
                return Err(GuardError::Open(self.name.clone()));
            }
            match op().await {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(e) => {
                    let retryable = is_retryable(&e);
                    if !retryable {
                        // The service answered; only this request was refused.
                        self.breaker.record_success();
                        return Err(GuardError::Failed(e));
                    }
                    self.breaker.record_failure();
                    if !self.retry.should_retry(retryable, retry_count) {
                        return Err(GuardError::Failed(e));
                    }
                    let backoff = self.retry.backoff(retry_count);
                    debug!(
                        service = %self.name,
                        error = %e,
                        retry = retry_count + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying upstream call"
                    );
                    tokio::time::sleep(backoff).await;
                    retry_count += 1;
                }
            }
        }
    }
}
