//! # Hot multicast channel.
//!
//! [`Channel`] fans each published item out to every live subscription through
//! a dedicated unbounded queue per subscriber.
//!
//! ```text
//! publish(item)
//!     ├──► [queue 1] ──► subscription 1
//!     ├──► [queue 2] ──► subscription 2
//!     └──► [queue N] ──► subscription N
//! ```
//!
//! ## Rules
//! - **Hot**: a subscription only observes items published after it was created.
//! - **Lossless**: queues are unbounded; no item is skipped for a slow consumer.
//! - **Ordered**: publication holds the subscriber list lock, so every
//!   subscriber observes the same global order.
//! - **Self-cleaning**: dropped subscriptions are pruned on the next publish.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Multicast, hot, ordered sequence of `T`.
pub(crate) struct Channel<T> {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<T>>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T: Clone + Send + 'static> Channel<T> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Delivers `item` to every live subscription.
    pub(crate) fn publish(&self, item: T) {
        self.publish_with(item, |_| {});
    }

    /// Runs `before` under the subscriber lock, then delivers `item`.
    ///
    /// Lets a caller update state that must be visible no later than the
    /// item itself (the current-value cell of a state stream).
    pub(crate) fn publish_with(&self, item: T, before: impl FnOnce(&T)) {
        let mut subs = self.lock();
        before(&item);
        subs.retain(|tx| tx.send(item.clone()).is_ok());
    }

    /// Opens a new subscription; it observes only items published from now on.
    pub(crate) fn subscribe(&self) -> UnboundedReceiverStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        UnboundedReceiverStream::new(rx)
    }

    /// Number of subscriptions that have not been pruned yet.
    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.lock().iter().filter(|tx| !tx.is_closed()).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<T>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
