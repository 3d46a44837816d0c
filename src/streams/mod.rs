//! Stream primitives: the hot multicast channel, action and state handles,
//! and emission scheduling.
//!
//! - [`ActionStream`] handle over actions (live channel, `of`, `from_*`) with `of_type` filtering
//! - [`StateStream`] / [`StateSender`] current-value cell plus snapshot stream
//! - [`Scheduler`] emission policy for finite/adapted sources

mod actions;
pub(crate) mod channel;
mod scheduler;
mod state;

pub use actions::{of_type, ActionStream, ActionStreamExt};
pub use scheduler::Scheduler;
pub use state::{StateSender, StateStream};
