//! # EpicMiddleware: turns a store's dispatches into streams and runs one epic over them.
//!
//! The [`EpicMiddleware`] owns the action channel, the state stream, the
//! lifecycle event bus, and a single active-epic slot. It is attached to a
//! store exactly once and may then run, replace, or stop epics any number of
//! times.
//!
//! ## High-level architecture
//! ```text
//! Attachment (store construction):
//!   Middleware::attach(store api)
//!     ├─ action channel + state stream (seeded from store.get_state())
//!     ├─ subscriber listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!     ├─ publish MiddlewareAttached
//!     └─ root epic (if configured) ─► activate()
//!
//! Every dispatch through the layer:
//!   next(action)                 reducers + inner middleware
//!   state_tx.send(get_state())   current value first, then state subscribers
//!   actions.publish(action)      epics observe the action after the reducers
//!
//! activate(epic)  [run / root]:
//!   slot.write: generation += 1, cancel previous ─► publish EpicCancelled
//!   adapter.input(live actions) ─► epic.run(actions, state, deps) ─► adapter.output
//!   publish EpicStarted ─► spawn Runner(child of shutdown token)
//!
//! Runner:
//!   output item ─► (generation still current?) ─► store.dispatch(item)   (top of chain)
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use epicflow::{emit, Action, EpicFn, EpicMiddleware, Store};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Msg { Ping, Pong }
//!
//! impl Action for Msg {
//!     fn action_type(&self) -> &str {
//!         match self { Msg::Ping => "PING", Msg::Pong => "PONG" }
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mw: EpicMiddleware<Msg, u32> = EpicMiddleware::new();
//!     let store = Store::with_middleware(
//!         |pongs: &mut u32, a: &Msg| if *a == Msg::Pong { *pongs += 1 },
//!         0,
//!         vec![Arc::new(mw.clone())],
//!     )?;
//!
//!     mw.run(EpicFn::arc("ping_pong", |actions, _state, _deps| {
//!         Ok(emit(actions.of_type(["PING"]).subscribe().map(|_| Msg::Pong)))
//!     }))?;
//!
//!     store.dispatch(Msg::Ping);
//!     for _ in 0..4 {
//!         tokio::task::yield_now().await;
//!     }
//!     assert_eq!(store.get_state(), 1);
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::action::Action;
use crate::adapter::Adapter;
use crate::core::builder::EpicMiddlewareBuilder;
use crate::core::config::MiddlewareConfig;
use crate::core::runner::Runner;
use crate::core::slot::{self, ActiveEpic, SharedSlot, Slot};
use crate::epics::{build_guarded, EpicRef};
use crate::error::{EpicError, MiddlewareError};
use crate::events::{Bus, Event, EventKind};
use crate::store::{Dispatch, DispatchLayer, Middleware, StoreApi};
use crate::streams::channel::Channel;
use crate::streams::{ActionStream, StateSender, StateStream};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Lifecycle state of a middleware instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareStatus {
    /// Not yet attached to a store.
    Uninitialized,
    /// Attached; no epic is running.
    Idle,
    /// Attached; an epic subscription is active.
    Running,
}

/// Store middleware that runs epics over the dispatched actions.
///
/// Cheap to clone: clones share the same instance. The instance stays alive
/// while either a handle or the store it is attached to exists; when both are
/// gone the active epic is cancelled.
pub struct EpicMiddleware<A: Action, S, D = ()> {
    inner: Arc<Inner<A, S, D>>,
}

impl<A: Action, S, D> Clone for EpicMiddleware<A, S, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Action, S, D> fmt::Debug for EpicMiddleware<A, S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpicMiddleware")
            .field("name", &self.inner.cfg.name)
            .field("attached", &self.inner.attachment.get().is_some())
            .finish_non_exhaustive()
    }
}

pub(super) struct Inner<A: Action, S, D> {
    pub cfg: MiddlewareConfig,
    pub deps: Arc<D>,
    pub adapter: Arc<dyn Adapter<A>>,
    pub bus: Bus,
    pub subscribers: Mutex<Vec<Arc<dyn Subscribe>>>,
    pub root: Mutex<Option<EpicRef<A, S, D>>>,
    pub attachment: OnceLock<Attachment<A, S>>,
    pub slot: SharedSlot,
    pub shutdown: CancellationToken,
}

/// Everything created when the middleware meets its store.
pub(super) struct Attachment<A, S> {
    actions: Channel<A>,
    state: StateStream<S, A>,
    store: Arc<dyn StoreApi<A, S>>,
    runtime: Handle,
}

impl<A: Action, S, D> Drop for Inner<A, S, D> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<A, S> EpicMiddleware<A, S, ()>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
{
    /// Creates a middleware with no dependencies and default settings.
    pub fn new() -> Self {
        EpicMiddlewareBuilder::new(()).build()
    }
}

impl<A, S> Default for EpicMiddleware<A, S, ()>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, S, D> EpicMiddleware<A, S, D>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    /// Returns a builder injecting `deps` into every epic.
    pub fn builder(deps: D) -> EpicMiddlewareBuilder<A, S, D> {
        EpicMiddlewareBuilder::new(deps)
    }

    pub(super) fn from_inner(inner: Inner<A, S, D>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Activates `epic`, replacing the running one.
    ///
    /// The previous epic is cancelled before the new one is built. Each of its
    /// emissions checked after this point is dropped and reported as
    /// [`EventKind::OutputSuppressed`]. On a current-thread runtime that covers
    /// every later emission; on a multi-thread runtime an emission that passed
    /// its check just before this call may still be dispatched. If `epic` fails
    /// to build, the error is returned and the middleware is left idle.
    ///
    /// # Errors
    /// - [`MiddlewareError::NotAttached`] before attachment to a store
    /// - [`MiddlewareError::EpicConstruction`] when `epic` fails to build
    pub fn run(&self, epic: EpicRef<A, S, D>) -> Result<(), MiddlewareError> {
        let att = self
            .inner
            .attachment
            .get()
            .ok_or(MiddlewareError::NotAttached)?;
        let name = epic.name().to_owned();
        self.inner
            .activate(att, epic)
            .map_err(|source| MiddlewareError::EpicConstruction { epic: name, source })
    }

    /// Cancels the running epic, if any. The middleware stays attached and
    /// accepts further [`run`](Self::run) calls.
    pub fn shutdown(&self) {
        let mut slot = slot::write(&self.inner.slot);
        self.inner.retire(&mut slot);
    }

    /// Returns the lifecycle state.
    pub fn status(&self) -> MiddlewareStatus {
        if self.inner.attachment.get().is_none() {
            return MiddlewareStatus::Uninitialized;
        }
        match &slot::read(&self.inner.slot).active {
            Some(active) if active.is_running() => MiddlewareStatus::Running,
            _ => MiddlewareStatus::Idle,
        }
    }

    /// Returns the name of the running epic.
    pub fn active_epic(&self) -> Option<Arc<str>> {
        slot::read(&self.inner.slot)
            .active
            .as_ref()
            .filter(|a| a.is_running())
            .map(|a| Arc::clone(&a.name))
    }

    /// Opens a receiver for lifecycle events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Returns the configuration this instance was built with.
    pub fn config(&self) -> &MiddlewareConfig {
        &self.inner.cfg
    }
}

impl<A, S, D> Inner<A, S, D>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    /// Bumps the generation and cancels the active epic.
    fn retire(&self, slot: &mut Slot) -> u64 {
        slot.generation += 1;
        if let Some(prev) = slot.active.take() {
            prev.cancel.cancel();
            self.publish_cancelled(&prev.name, prev.generation);
        }
        slot.generation
    }

    fn activate(&self, att: &Attachment<A, S>, epic: EpicRef<A, S, D>) -> Result<(), EpicError> {
        let generation = self.retire(&mut slot::write(&self.slot));
        let name: Arc<str> = epic.name().into();

        let actions = self.adapter.input(ActionStream::live(att.actions.clone()));
        let output = match build_guarded(epic.as_ref(), actions, att.state.clone(), Arc::clone(&self.deps)) {
            Ok(output) => self.adapter.output(output),
            Err(err) => {
                tracing::error!(epic = %name, generation, error = %err, "epic failed to start");
                self.bus.publish(
                    Event::new(EventKind::EpicFailed)
                        .with_epic(name)
                        .with_reason(err.as_message()),
                );
                return Err(err);
            }
        };

        let token = self.shutdown.child_token();
        let runner = Runner {
            name: Arc::clone(&name),
            generation,
            token: token.clone(),
            output,
            store: Arc::clone(&att.store),
            slot: Arc::clone(&self.slot),
            bus: self.bus.clone(),
        };

        tracing::info!(epic = %name, generation, "epic started");
        self.bus.publish(
            Event::new(EventKind::EpicStarted)
                .with_epic(Arc::clone(&name))
                .with_generation(generation),
        );
        let join = att.runtime.spawn(runner.drive());

        let mut slot = slot::write(&self.slot);
        if slot.generation == generation {
            slot.active = Some(ActiveEpic {
                name,
                generation,
                cancel: token,
                join,
            });
        } else {
            // A concurrent run or shutdown already moved past this activation.
            token.cancel();
            self.publish_cancelled(&name, generation);
        }
        Ok(())
    }

    fn publish_cancelled(&self, name: &Arc<str>, generation: u64) {
        tracing::info!(epic = %name, generation, "epic cancelled");
        self.bus.publish(
            Event::new(EventKind::EpicCancelled)
                .with_epic(Arc::clone(name))
                .with_generation(generation),
        );
    }

    /// Subscribes to the bus and forwards events to the subscriber set until shutdown.
    fn subscriber_listener(&self, runtime: &Handle) {
        let subs = std::mem::take(&mut *self.subscribers.lock().unwrap_or_else(PoisonError::into_inner));
        let set = SubscriberSet::new(subs, self.bus.clone());
        if set.is_empty() {
            return;
        }
        tracing::debug!(subscribers = set.len(), "subscriber listener started");
        let mut rx = self.bus.subscribe();
        let token = self.shutdown.clone();

        runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "subscriber listener lagged behind the event bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            set.shutdown().await;
        });
    }
}

impl<A, S, D> Middleware<A, S> for EpicMiddleware<A, S, D>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    fn attach(&self, store: Arc<dyn StoreApi<A, S>>) -> Result<DispatchLayer<A>, MiddlewareError> {
        let runtime = Handle::try_current().map_err(|_| MiddlewareError::NoRuntime)?;

        let actions = Channel::new();
        let (state, state_tx) = StateStream::from_store(Arc::clone(&store));
        let attachment = Attachment {
            actions: actions.clone(),
            state,
            store: Arc::clone(&store),
            runtime: runtime.clone(),
        };
        if self.inner.attachment.set(attachment).is_err() {
            return Err(MiddlewareError::AlreadyAttached);
        }

        self.inner.subscriber_listener(&runtime);
        tracing::info!(middleware = %self.inner.cfg.name, "attached to store");
        self.inner.bus.publish(
            Event::new(EventKind::MiddlewareAttached).with_reason(self.inner.cfg.name.as_ref()),
        );

        let root = self.inner.root.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(root) = root {
            self.run(root)?;
        }

        Ok(layer(Arc::clone(&self.inner), store, state_tx, actions))
    }
}

/// The per-dispatch stage: reduce first, then publish state, then the action.
fn layer<A, S, D>(
    inner: Arc<Inner<A, S, D>>,
    store: Arc<dyn StoreApi<A, S>>,
    state_tx: StateSender<S>,
    actions: Channel<A>,
) -> DispatchLayer<A>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    Box::new(move |next: Dispatch<A>| -> Dispatch<A> {
        Arc::new(move |action: A| {
            // The store's chain owns the instance from here on.
            let _owner = &inner;
            let result = next(action.clone());
            state_tx.send(store.get_state());
            actions.publish(action);
            result
        })
    })
}
