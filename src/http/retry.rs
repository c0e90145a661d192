use std::time::Duration;

use super::transport::TransportResponse;
use crate::error::TransportError;

/// Bounded retry contract for one request.
///
/// After failed attempt `n` (0-based) a retryable failure waits
/// `backoff_base * 2^n` before attempt `n + 1`, up to `max_retries` retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_base: Duration,
}

/// Where the retry state machine goes after an attempt settles.
#[derive(Debug)]
pub enum RetryStep {
    /// The request settled; `retries` counts the retries already spent.
    Settled {
        result: Result<TransportResponse, TransportError>,
        retries: u32,
    },
    /// Sleep `delay`, then run `next_attempt`.
    Retry {
        next_attempt: u32,
        delay: Duration,
        error: TransportError,
    },
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }

    /// Transition out of `attempt` given how it settled.
    #[must_use]
    pub fn step(
        &self,
        attempt: u32,
        result: Result<TransportResponse, TransportError>,
    ) -> RetryStep {
        match result {
            Ok(response) => RetryStep::Settled {
                result: Ok(response),
                retries: attempt,
            },
            Err(error) if error.is_retryable() && attempt < self.max_retries => RetryStep::Retry {
                next_attempt: attempt.saturating_add(1),
                delay: self.backoff(attempt),
                error,
            },
            Err(error) => RetryStep::Settled {
                result: Err(error),
                retries: attempt,
            },
        }
    }
}
