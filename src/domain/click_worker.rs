//! Background worker retrying failed click registrations.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::{ClickOutcome, ClickRepository};
use crate::error::AppError;

/// Attempts per event, including the first.
const MAX_ATTEMPTS: usize = 5;

/// Base delay for the exponential backoff schedule.
const BASE_DELAY: Duration = Duration::from_millis(100);

/// Drains the retry queue, re-attempting click registration with
/// exponential backoff and jitter.
///
/// Only transient store failures are retried; a `LimitReached` outcome or a
/// hard error drops the event with a log line and a metrics counter.
/// Recording failures are never surfaced to clients; by the time an event
/// reaches this worker the redirect has already been served.
pub async fn run_click_retry_worker(
    mut rx: mpsc::Receiver<ClickEvent>,
    clicks: Arc<dyn ClickRepository>,
) {
    while let Some(event) = rx.recv().await {
        let strategy = ExponentialBackoff::from_millis(BASE_DELAY.as_millis() as u64)
            .map(jitter)
            .take(MAX_ATTEMPTS - 1);

        let code = event.code.clone();
        let result = RetryIf::spawn(
            strategy,
            || clicks.register(&event.code, event.click.clone()),
            is_transient,
        )
        .await;

        match result {
            Ok(ClickOutcome::Recorded { click_count }) => {
                debug!(code, click_count, "Recorded click after retry");
                metrics::counter!("snaplink_clicks_retried_total").increment(1);
            }
            Ok(ClickOutcome::LimitReached) => {
                // The ceiling was reached while the event waited; correct to
                // drop, the counter must not exceed the limit.
                debug!(code, "Dropping retried click, limit reached");
                metrics::counter!("snaplink_clicks_dropped_total").increment(1);
            }
            Err(e) => {
                warn!(code, error = %e, "Dropping click after retry exhaustion");
                metrics::counter!("snaplink_clicks_dropped_total").increment(1);
            }
        }
    }
}

fn is_transient(e: &AppError) -> bool {
    matches!(
        e,
        AppError::Unavailable { .. } | AppError::Internal { .. }
    )
}
