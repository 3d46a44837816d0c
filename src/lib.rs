//! # epicflow
//!
//! **Epicflow** is a store middleware that turns every dispatched action and
//! every resulting state into async streams, and lets *epics* (stream
//! transformers from actions to actions) react to them by emitting new actions
//! back into the store.
//!
//! Epics never see an action before the reducers have processed it, and their
//! output goes through the store's full middleware chain like any other
//! dispatch.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   store.dispatch(action)
//!          │
//! ┌────────▼──────────────────────────────────────────────────────────┐
//! │  middleware chain                                                 │
//! │    ... ─► EpicMiddleware layer ─► next(action) ─► reducers        │
//! │                 │                                                 │
//! │                 ├─► StateSender::send(get_state())  (value first) │
//! │                 └─► action Channel::publish(action)               │
//! └─────────────────┬──────────────────────────────────┬──────────────┘
//!                   ▼                                  ▼
//!          ActionStream (hot, lossless)        StateStream (value + snapshots)
//!                   │                                  │
//!                   └────────► adapter.input ◄─────────┘
//!                                   ▼
//!                      active epic: run(actions, state, deps)
//!                                   ▼
//!                            adapter.output
//!                                   ▼
//!                      Runner (generation-checked) ─► store.dispatch(output)
//!
//! Lifecycle events ─► Bus ─► subscriber listener ─► SubscriberSet ─► LogWriter / custom
//!                        └─► EpicMiddleware::events()
//! ```
//!
//! ### Lifecycle
//! ```text
//! EpicMiddleware::new / builder ──► Uninitialized
//! Store::with_middleware(.., [mw]) ──► attach ──► Idle (or Running with a root epic)
//! mw.run(epic)      ──► cancel previous (EpicCancelled) ──► EpicStarted ──► Running
//! output completes  ──► EpicCompleted ──► Idle
//! output fails      ──► EpicFailed    ──► Idle
//! mw.shutdown()     ──► EpicCancelled ──► Idle
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                                   |
//! |-------------------|---------------------------------------------------------------|------------------------------------------------------|
//! | **Middleware**    | Attach to a store, run and replace epics.                     | [`EpicMiddleware`], [`EpicMiddlewareBuilder`]        |
//! | **Epics**         | Define epics as traits or closures and merge them.            | [`Epic`], [`EpicFn`], [`combine_epics`]              |
//! | **Streams**       | Action and state handles, type filtering, scheduling.         | [`ActionStream`], [`StateStream`], [`of_type`]       |
//! | **Store**         | Middleware contract plus a minimal in-process store.          | [`Middleware`], [`StoreApi`], [`Store`]              |
//! | **Adapters**      | Rewrite epic input and output streams.                        | [`Adapter`], [`AdapterFn`]                           |
//! | **Subscriber API**| Observe epic lifecycle events.                                | [`Subscribe`], [`Event`]                             |
//! | **Errors**        | Typed errors for the middleware and for epics.                | [`MiddlewareError`], [`EpicError`]                   |
//! | **Configuration** | Per-instance settings.                                        | [`MiddlewareConfig`]                                 |
//!
//! ## Optional features
//! - `logging` (default): exports a built-in [`LogWriter`] subscriber backed by `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use epicflow::{combine_epics, emit, Action, EpicFn, EpicMiddleware, EpicRef, Store};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Msg { Ping, Pong, Log(String) }
//!
//! impl Action for Msg {
//!     fn action_type(&self) -> &str {
//!         match self {
//!             Msg::Ping => "PING",
//!             Msg::Pong => "PONG",
//!             Msg::Log(_) => "LOG",
//!         }
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pong: EpicRef<Msg, Vec<String>> = EpicFn::arc("pong", |actions, _state, _deps| {
//!         Ok(emit(actions.of_type(["PING"]).subscribe().map(|_| Msg::Pong)))
//!     });
//!     let audit: EpicRef<Msg, Vec<String>> = EpicFn::arc("audit", |actions, _state, _deps| {
//!         Ok(emit(actions.of_type(["PONG"]).subscribe().map(|_| Msg::Log("pong seen".into()))))
//!     });
//!
//!     let mw = EpicMiddleware::builder(())
//!         .with_root_epic(combine_epics(vec![pong, audit]))
//!         .build();
//!
//!     let store = Store::with_middleware(
//!         |log: &mut Vec<String>, a: &Msg| log.push(a.action_type().to_owned()),
//!         Vec::new(),
//!         vec![Arc::new(mw.clone())],
//!     )?;
//!
//!     store.dispatch(Msg::Ping);
//!     for _ in 0..8 {
//!         tokio::task::yield_now().await;
//!     }
//!     assert_eq!(store.get_state(), vec!["PING", "PONG", "LOG"]);
//!     Ok(())
//! }
//! ```
mod action;
mod adapter;
mod core;
mod epics;
mod error;
mod events;
mod store;
mod streams;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{EpicMiddleware, EpicMiddlewareBuilder, MiddlewareConfig, MiddlewareStatus};
pub use action::Action;
pub use adapter::{Adapter, AdapterFn, IdentityAdapter};
pub use epics::{combine_epics, combine_epics_isolated, emit, Epic, EpicFn, EpicOutput, EpicRef};
pub use error::{EpicError, MiddlewareError};
pub use events::{Bus, Event, EventKind};
pub use store::{Dispatch, DispatchLayer, Middleware, Reducer, Store, StoreApi};
pub use streams::{of_type, ActionStream, ActionStreamExt, Scheduler, StateSender, StateStream};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
