//! # LogWriter: lifecycle events rendered through `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  epicflow: attached middleware="epic-middleware"
//! DEBUG epicflow: started epic="root" generation=1
//! WARN  epicflow: output suppressed epic="root" generation=1 action="PONG"
//! ERROR epicflow: failed epic="root" generation=2 reason="stream: boom"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that forwards every lifecycle event to `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let epic = e.epic.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::MiddlewareAttached => {
                tracing::info!(target: "epicflow", middleware = reason, "attached");
            }
            EventKind::EpicStarted => {
                tracing::debug!(target: "epicflow", epic, generation = ?e.generation, "started");
            }
            EventKind::EpicCompleted => {
                tracing::debug!(target: "epicflow", epic, generation = ?e.generation, "completed");
            }
            EventKind::EpicCancelled => {
                tracing::debug!(target: "epicflow", epic, generation = ?e.generation, "cancelled");
            }
            EventKind::EpicFailed => {
                tracing::error!(target: "epicflow", epic, generation = ?e.generation, reason, "failed");
            }
            EventKind::OutputSuppressed => {
                tracing::warn!(target: "epicflow", epic, generation = ?e.generation, action = reason, "output suppressed");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(target: "epicflow", subscriber = epic, info = reason, "subscriber panicked");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "epicflow", subscriber = epic, reason, "subscriber overflow");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
