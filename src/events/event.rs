//! # Lifecycle events emitted by the middleware and the epic runner.
//!
//! The [`EventKind`] enum classifies events in three groups:
//! - **Middleware events**: attachment to a store
//! - **Epic lifecycle events**: started, completed, cancelled, failed, late output suppressed
//! - **Subscriber events**: panics and queue overflow inside subscriber workers
//!
//! ## Ordering guarantees
//! Each event carries a sequence number (`seq`) that increases monotonically
//! across all events of the process.
//!
//! ## Example
//! ```rust
//! use epicflow::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::EpicFailed)
//!     .with_epic("fetch_user")
//!     .with_reason("stream: upstream closed")
//!     .with_generation(3);
//!
//! assert_eq!(ev.kind, EventKind::EpicFailed);
//! assert_eq!(ev.epic.as_deref(), Some("fetch_user"));
//! assert_eq!(ev.generation, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Middleware events ===
    /// Middleware attached to a store; channels are live.
    ///
    /// Sets:
    /// - `reason`: middleware name
    MiddlewareAttached,

    // === Epic lifecycle events ===
    /// An epic built its output stream and is now the active subscription.
    ///
    /// Sets:
    /// - `epic`: epic name
    /// - `generation`: activation number (1-based, per middleware)
    EpicStarted,

    /// The epic's output stream ended without error.
    ///
    /// Sets:
    /// - `epic`: epic name
    /// - `generation`: activation number
    EpicCompleted,

    /// The epic was torn down (replaced by `run` or by `shutdown`).
    ///
    /// Sets:
    /// - `epic`: epic name
    /// - `generation`: activation number
    EpicCancelled,

    /// The epic failed (construction error, stream error, or panic).
    ///
    /// Sets:
    /// - `epic`: epic name
    /// - `generation`: activation number (absent for construction failures)
    /// - `reason`: failure message
    EpicFailed,

    /// An output action arrived after its epic was cancelled and was not dispatched.
    ///
    /// Sets:
    /// - `epic`: epic name
    /// - `generation`: activation number of the cancelled epic
    /// - `reason`: action type
    OutputSuppressed,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `epic`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `epic`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the epic (or subscriber), if applicable.
    pub epic: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Activation number of the epic within its middleware.
    pub generation: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            epic: None,
            reason: None,
            generation: None,
        }
    }

    /// Attaches an epic (or subscriber) name.
    #[inline]
    pub fn with_epic(mut self, epic: impl Into<Arc<str>>) -> Self {
        self.epic = Some(epic.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an activation number.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_epic(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_epic(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_epic_failure(&self) -> bool {
        matches!(self.kind, EventKind::EpicFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::EpicStarted);
        let b = Event::new(EventKind::EpicStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_subscriber_helpers() {
        let ev = Event::subscriber_overflow("metrics", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.epic.as_deref(), Some("metrics"));
        assert_eq!(ev.reason.as_deref(), Some("full"));

        let ev = Event::subscriber_panicked("audit", "boom".into());
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert!(!ev.is_epic_failure());
    }
}
