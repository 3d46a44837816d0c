//! # State streams.
//!
//! [`StateStream`] is the read side handed to epics: a synchronously readable
//! current value plus a hot multicast sequence of snapshots (one per completed
//! dispatch). [`StateSender`] is the single writer, owned by the middleware
//! instance (or by a test driving an epic in isolation).
//!
//! ```text
//! dispatch(action) ─► reducer ─► StateSender::send(snapshot)
//!                                   ├─► current value cell   (updated first)
//!                                   └─► [queue 1..N] ─► StateStream::subscribe()
//! ```
//!
//! ## Rules
//! - The current value is seeded at construction, before any dispatch.
//! - The cell is updated under the channel lock before fan-out, so a
//!   subscriber that receives snapshot N reads a value at least as fresh as N.
//! - Snapshots are delivered in dispatch order; no replay for late subscribers.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future;
use futures::stream::{BoxStream, StreamExt};

use crate::error::MiddlewareError;
use crate::store::StoreApi;
use crate::streams::channel::Channel;

/// Read-only view of the store's state for epics.
pub struct StateStream<S, A> {
    current: Arc<RwLock<S>>,
    channel: Channel<S>,
    store: Option<Arc<dyn StoreApi<A, S>>>,
}

impl<S, A> Clone for StateStream<S, A> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
            channel: self.channel.clone(),
            store: self.store.clone(),
        }
    }
}

impl<S, A> fmt::Debug for StateStream<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStream")
            .field("attached", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

/// Single writer of a [`StateStream`].
pub struct StateSender<S> {
    current: Arc<RwLock<S>>,
    channel: Channel<S>,
}

impl<S> fmt::Debug for StateSender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSender").finish_non_exhaustive()
    }
}

impl<S: Clone + Send + Sync + 'static> StateSender<S> {
    /// Publishes a new snapshot: updates the current value, then notifies subscribers.
    pub fn send(&self, snapshot: S) {
        self.channel.publish_with(snapshot, |next| {
            *self
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner) = next.clone();
        });
    }
}

impl<S, A> StateStream<S, A>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates a detached state stream seeded with `initial`, plus its writer.
    ///
    /// Useful to drive an epic in isolation; the deprecated
    /// [`dispatch`](Self::dispatch) passthrough is unavailable on detached streams.
    pub fn detached(initial: S) -> (Self, StateSender<S>) {
        Self::build(initial, None)
    }

    /// Creates a state stream seeded from `store`, plus its writer.
    pub(crate) fn from_store(store: Arc<dyn StoreApi<A, S>>) -> (Self, StateSender<S>) {
        let initial = store.get_state();
        Self::build(initial, Some(store))
    }

    fn build(initial: S, store: Option<Arc<dyn StoreApi<A, S>>>) -> (Self, StateSender<S>) {
        let current = Arc::new(RwLock::new(initial));
        let channel = Channel::new();
        let sender = StateSender {
            current: Arc::clone(&current),
            channel: channel.clone(),
        };
        (
            Self {
                current,
                channel,
                store,
            },
            sender,
        )
    }

    /// Returns the latest snapshot.
    pub fn value(&self) -> S {
        self.with_value(S::clone)
    }

    /// Reads the latest snapshot without cloning it.
    pub fn with_value<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Opens a subscription yielding one snapshot per completed dispatch.
    pub fn subscribe(&self) -> BoxStream<'static, S> {
        self.channel.subscribe().boxed()
    }

    /// Opens a subscription yielding only snapshots that differ from the
    /// previous value (starting from the value current at subscription time).
    pub fn changes(&self) -> BoxStream<'static, S>
    where
        S: PartialEq,
    {
        let upstream = self.channel.subscribe();
        let mut last = self.value();
        upstream
            .filter(move |next| {
                let changed = *next != last;
                if changed {
                    last = next.clone();
                }
                future::ready(changed)
            })
            .boxed()
    }

    /// Synonym for [`value`](Self::value).
    #[deprecated(note = "use `StateStream::value` instead")]
    pub fn get_state(&self) -> S {
        self.value()
    }

    /// Dispatches straight into the host store.
    ///
    /// Epics should emit actions from their output stream instead; this
    /// passthrough exists only for code written against the older contract.
    #[deprecated(note = "emit actions from the epic's output stream instead")]
    pub fn dispatch(&self, action: A) -> Result<A, MiddlewareError> {
        match &self.store {
            Some(store) => Ok(store.dispatch(action)),
            None => Err(MiddlewareError::Detached),
        }
    }
}
