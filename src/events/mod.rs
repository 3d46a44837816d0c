//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `EpicMiddleware` (attach, replace, shutdown), the epic
//!   runner (completion, failure, suppressed output), `SubscriberSet` workers.
//! - **Consumers**: the subscriber listener spawned on attach (fans out to
//!   `SubscriberSet`) and any receiver from `EpicMiddleware::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
