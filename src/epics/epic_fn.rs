//! # Function-backed epic (`EpicFn`)
//!
//! [`EpicFn`] wraps a closure with the same shape as [`Epic::run`]. The closure
//! is called once per activation and builds a fresh output stream each time;
//! shared state between activations must be captured explicitly (`Arc<...>`).
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use epicflow::{emit, Action, EpicFn, EpicRef};
//!
//! #[derive(Debug, Clone)]
//! struct Msg(&'static str);
//! impl Action for Msg { fn action_type(&self) -> &str { self.0 } }
//!
//! let e: EpicRef<Msg, u32> = EpicFn::arc("ping_pong", |actions, _state, _deps| {
//!     Ok(emit(actions.of_type(["PING"]).subscribe().map(|_| Msg("PONG"))))
//! });
//! assert_eq!(e.name(), "ping_pong");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::action::Action;
use crate::epics::epic::{Epic, EpicOutput, EpicRef};
use crate::error::EpicError;
use crate::streams::{ActionStream, StateStream};

/// Function-backed epic implementation.
pub struct EpicFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> fmt::Debug for EpicFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpicFn").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F> EpicFn<F> {
    /// Creates a new function-backed epic.
    ///
    /// Prefer [`EpicFn::arc`] when you immediately need an [`EpicRef`]; it
    /// also lets the compiler infer the closure's parameter types.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the epic and returns it as a shared handle.
    pub fn arc<A, S, D>(name: impl Into<Cow<'static, str>>, f: F) -> EpicRef<A, S, D>
    where
        A: Action,
        S: Clone + Send + Sync + 'static,
        D: Send + Sync + 'static,
        F: Fn(ActionStream<A>, StateStream<S, A>, Arc<D>) -> Result<EpicOutput<A>, EpicError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

impl<A, S, D, F> Epic<A, S, D> for EpicFn<F>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
    F: Fn(ActionStream<A>, StateStream<S, A>, Arc<D>) -> Result<EpicOutput<A>, EpicError>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        actions: ActionStream<A>,
        state: StateStream<S, A>,
        deps: Arc<D>,
    ) -> Result<EpicOutput<A>, EpicError> {
        (self.f)(actions, state, deps)
    }
}
