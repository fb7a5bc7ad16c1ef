//! Click event payload for the background retry pipeline.

use crate::domain::entities::NewClick;

/// A click whose synchronous registration failed on the store.
///
/// The resolver registers clicks inline (the limit check demands it), but a
/// store failure there must not fail the redirect. Instead the event is
/// wrapped in this payload and handed to
/// [`crate::domain::click_worker::run_click_retry_worker`], which re-attempts
/// registration with backoff. If the queue is full the event is dropped;
/// analytics are best effort, redirects are not.
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub code: String,
    pub click: NewClick,
}

impl ClickEvent {
    pub fn new(code: impl Into<String>, click: NewClick) -> Self {
        Self {
            code: code.into(),
            click,
        }
    }
}
