//! Bounded retry with capped exponential backoff.

use std::time::Duration;

use crate::error::{MiroError, Result};
use crate::pagination::PageSource;
use crate::types::{Cursor, Page};

/// How persistently a single page request is retried.
///
/// Rate limiting and transport failures keep separate budgets. Auth
/// failures and malformed bodies are surfaced on the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_rate_limit_retries: u32,
    pub max_transport_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 5,
            max_transport_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Never retry anything.
    pub fn none() -> Self {
        Self {
            max_rate_limit_retries: 0,
            max_transport_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_rate_limit_retries(mut self, retries: u32) -> Self {
        self.max_rate_limit_retries = retries;
        self
    }

    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.max_transport_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// `base_delay * 2^attempt`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before retrying a throttled request. A server-provided
    /// `Retry-After` wins over the computed backoff, still capped.
    pub fn rate_limit_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(delay) => delay.min(self.max_delay),
            None => self.backoff(attempt),
        }
    }
}

/// Fetch one page, sleeping and retrying per `policy`.
pub(crate) async fn fetch_with_retry<S: PageSource>(
    source: &S,
    policy: &RetryPolicy,
    cursor: Option<&Cursor>,
) -> Result<Page<S::Item>> {
    let mut rate_limited = 0u32;
    let mut transport = 0u32;

    loop {
        let err = match source.fetch_page(cursor).await {
            Ok(page) => return Ok(page),
            Err(err) => err,
        };

        let delay = match err {
            MiroError::RateLimited { retry_after }
                if rate_limited < policy.max_rate_limit_retries =>
            {
                let delay = policy.rate_limit_delay(rate_limited, retry_after);
                rate_limited += 1;
                tracing::warn!(
                    source = source.name(),
                    attempt = rate_limited,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
                delay
            }
            ref retryable
                if retryable.is_retryable()
                    && !matches!(retryable, MiroError::RateLimited { .. })
                    && transport < policy.max_transport_retries =>
            {
                let delay = policy.backoff(transport);
                transport += 1;
                tracing::warn!(
                    source = source.name(),
                    attempt = transport,
                    delay_ms = delay.as_millis() as u64,
                    error = %retryable,
                    "Request failed, retrying"
                );
                delay
            }
            other => return Err(other),
        };

        tokio::time::sleep(delay).await;
    }
}
