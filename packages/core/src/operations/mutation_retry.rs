//! Retry wrapper for busy-database failures
//!
//! Writers to the same database file serialize on SQLite's write lock. The
//! connection's busy timeout absorbs most waits, but a `BEGIN IMMEDIATE` or
//! `COMMIT` can still come back with `SQLITE_BUSY` under heavy contention.
//! Each mutation runs in its own transaction that rolls back on failure, so
//! the whole operation can be replayed from scratch against fresh state.
//!
//! # Example
//!
//! ```rust,no_run
//! use uiroute_core::operations::MutationRetry;
//! use uiroute_core::services::RouteServiceError;
//!
//! # async fn example() -> Result<(), RouteServiceError> {
//! let retry = MutationRetry::new(3);
//!
//! // Up to 3 retries with exponential backoff (10ms, 20ms, 40ms)
//! let id = retry.run("create", || async { Ok::<_, RouteServiceError>(42) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::services::RouteServiceError;
use std::future::Future;
use tokio::time::Duration;

/// Upper bound for a single backoff sleep
pub const MAX_BACKOFF_MS: u64 = 1_000;

/// Sleep before retry number `attempt + 1`: 10ms doubling, capped at [`MAX_BACKOFF_MS`]
pub fn backoff(attempt: usize) -> Duration {
    let shift = attempt.min(16) as u32;
    Duration::from_millis(10u64.saturating_mul(1u64 << shift).min(MAX_BACKOFF_MS))
}

/// Replays a mutation while it fails with a transient database error
#[derive(Debug, Clone, Copy)]
pub struct MutationRetry {
    max_retries: usize,
}

impl MutationRetry {
    /// `max_retries = 0` means a single attempt
    pub fn new(max_retries: usize) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Run `operation`, retrying busy failures with exponential backoff
    ///
    /// # Retry Behavior
    ///
    /// - **Retry on**: errors where [`RouteServiceError::is_transient`] holds
    /// - **Backoff**: Exponential (10ms, 20ms, 40ms, ...), capped at 1s
    /// - **Other errors**: Fail immediately without retry
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RouteServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RouteServiceError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(
                            "Route {} succeeded after {} retry(ies)",
                            label,
                            attempt
                        );
                    }
                    return Ok(value);
                }

                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    tracing::warn!(
                        "Database busy on attempt {}/{} of route {}: {}. Retrying...",
                        attempt + 1,
                        self.max_retries + 1,
                        label,
                        e
                    );

                    tokio::time::sleep(backoff(attempt)).await;

                    attempt += 1;
                }

                Err(e) => {
                    if e.is_transient() {
                        tracing::warn!(
                            "Max retries ({}) exceeded for route {}",
                            self.max_retries,
                            label
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for MutationRetry {
    fn default() -> Self {
        Self::new(3)
    }
}
