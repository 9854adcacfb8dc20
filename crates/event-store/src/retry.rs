//! Bounded retries for transient storage failures.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{EventStoreError, Result};

/// Retry policy applied at the storage transport boundary.
///
/// Only errors for which [`EventStoreError::is_transient`] holds are retried;
/// concurrency conflicts and other domain-level failures return immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than 1.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles on every further attempt.
    pub initial_backoff: Duration,

    /// Upper bound for the delay between attempts.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given attempts and initial backoff.
    ///
    /// The initial backoff is capped at `max_backoff` (2 seconds).
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        let max_backoff = Duration::from_secs(2);
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: initial_backoff.min(max_backoff),
            max_backoff,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        let mut backoff = self.initial_backoff.min(self.max_backoff);

        loop {
            if cancel.is_cancelled() {
                return Err(EventStoreError::Cancelled);
            }

            match op().await {
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    metrics::counter!(
                        "event_store_append_retries_total",
                        "operation" => operation
                    )
                    .increment(1);
                    tracing::warn!(
                        operation,
                        attempt,
                        error = %err,
                        "transient storage failure, retrying"
                    );

                    tokio::select! {
                        () = cancel.cancelled() => return Err(EventStoreError::Cancelled),
                        () = tokio::time::sleep(backoff) => {}
                    }

                    backoff = self.next_backoff(backoff);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(50))
    }
}
