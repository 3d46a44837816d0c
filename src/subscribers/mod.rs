//! # Lifecycle event subscribers.
//!
//! ```text
//! Event flow:
//!   runner / middleware ── publish(Event) ──► Bus ──► subscriber listener
//!                                                         │
//!                                                   SubscriberSet::emit
//!                                                ┌────────┼────────┐
//!                                                ▼        ▼        ▼
//!                                            LogWriter  Metrics  Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
