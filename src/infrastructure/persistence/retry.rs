//! Bounded retry for transient store failures.
//!
//! Pool acquisition timeouts and dropped connections get a few quick
//! re-attempts with backoff before they surface as `Unavailable`. Writes
//! are only retried for errors raised before the statement reaches the
//! database; once a statement may have executed, a blind re-attempt could
//! apply it twice, so those errors surface immediately. Click registration
//! is excluded entirely: its re-attempts belong to the retry worker.

use std::future::Future;
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

/// Attempts per operation, including the first.
const MAX_ATTEMPTS: usize = 3;

const BASE_DELAY: Duration = Duration::from_millis(50);

fn strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(BASE_DELAY.as_millis() as u64)
        .map(jitter)
        .take(MAX_ATTEMPTS - 1)
}

fn transient(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    )
}

/// Errors that can only occur before the statement ran.
fn transient_before_execution(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)
}

/// Runs a read, re-attempting transient failures a bounded number of times.
///
/// Reads are idempotent, so connection drops mid-flight are retried too.
pub(super) async fn read_with_backoff<T, F, Fut>(op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    RetryIf::spawn(strategy(), op, transient).await
}

/// Runs a write, re-attempting only failures that precede execution.
pub(super) async fn write_with_backoff<T, F, Fut>(op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    RetryIf::spawn(strategy(), op, transient_before_execution).await
}
