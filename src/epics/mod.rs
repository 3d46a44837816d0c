//! # Epics and combinators.
//!
//! - [`Epic`] - trait for stream transformers from actions to actions
//! - [`EpicFn`] - closure-backed epic
//! - [`EpicRef`] - shared handle (`Arc<dyn Epic>`)
//! - [`combine_epics`], [`combine_epics_isolated`] - merge several epics into one

mod combine;
mod epic;
mod epic_fn;

pub use combine::{combine_epics, combine_epics_isolated};
pub use epic::{emit, Epic, EpicOutput, EpicRef};
pub use epic_fn::EpicFn;

pub(crate) use epic::build_guarded;
