//! Middleware core: attachment, epic activation, and replacement.
//!
//! The public API from this module is [`EpicMiddleware`] (with its builder,
//! config and status types).
//!
//! Internal modules:
//! - [`runner`]: drives one epic activation and forwards its output;
//! - [`slot`]: the single active-epic slot guarded by a generation counter;
//! - [`middleware`]: attachment to a store, `run`, `shutdown`;
//! - [`builder`]: optional features (adapter, root epic, subscribers).

mod builder;
mod config;
mod middleware;
mod runner;
mod slot;

pub use builder::EpicMiddlewareBuilder;
pub use config::MiddlewareConfig;
pub use middleware::{EpicMiddleware, MiddlewareStatus};
