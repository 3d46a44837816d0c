//! # Epic abstraction.
//!
//! An [`Epic`] turns the stream of dispatched actions (plus state and injected
//! dependencies) into a stream of new actions. Building the output stream is
//! synchronous and may fail; a running output stream may yield `Err` once, which
//! ends that epic.
//!
//! Epics are shared as [`EpicRef`] (`Arc<dyn Epic>`) so the same instance can be
//! combined, started, and replaced freely.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::stream::{BoxStream, Stream, StreamExt};

use crate::action::Action;
use crate::error::EpicError;
use crate::streams::{ActionStream, StateStream};

/// Output of a running epic.
pub type EpicOutput<A> = BoxStream<'static, Result<A, EpicError>>;

/// Shared handle to an epic.
pub type EpicRef<A, S, D = ()> = Arc<dyn Epic<A, S, D>>;

/// # Stream transformer from actions to actions.
///
/// `run` is called once per activation (root start, [`run`](crate::EpicMiddleware::run),
/// or as part of a combined epic). It must not block; heavy work belongs inside
/// the returned stream.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use futures::StreamExt;
/// use epicflow::{emit, Action, ActionStream, Epic, EpicError, EpicOutput, StateStream};
///
/// #[derive(Debug, Clone)]
/// struct Msg(&'static str);
/// impl Action for Msg { fn action_type(&self) -> &str { self.0 } }
///
/// struct PingPong;
///
/// impl Epic<Msg, ()> for PingPong {
///     fn name(&self) -> &str { "ping_pong" }
///
///     fn run(
///         &self,
///         actions: ActionStream<Msg>,
///         _state: StateStream<(), Msg>,
///         _deps: Arc<()>,
///     ) -> Result<EpicOutput<Msg>, EpicError> {
///         Ok(emit(actions.of_type(["PING"]).subscribe().map(|_| Msg("PONG"))))
///     }
/// }
/// ```
pub trait Epic<A, S, D = ()>: Send + Sync + 'static {
    /// Returns a stable, human-readable epic name.
    fn name(&self) -> &str;

    /// Builds the epic's output stream.
    fn run(
        &self,
        actions: ActionStream<A>,
        state: StateStream<S, A>,
        deps: Arc<D>,
    ) -> Result<EpicOutput<A>, EpicError>;
}

/// Wraps an infallible stream of actions as an [`EpicOutput`].
pub fn emit<A, St>(stream: St) -> EpicOutput<A>
where
    A: Send + 'static,
    St: Stream<Item = A> + Send + 'static,
{
    stream.map(Ok).boxed()
}

/// Builds an epic's output, turning a panic inside `run` into [`EpicError::Panicked`].
pub(crate) fn build_guarded<A, S, D>(
    epic: &dyn Epic<A, S, D>,
    actions: ActionStream<A>,
    state: StateStream<S, A>,
    deps: Arc<D>,
) -> Result<EpicOutput<A>, EpicError>
where
    A: Action,
    S: 'static,
    D: 'static,
{
    catch_unwind(AssertUnwindSafe(|| epic.run(actions, state, deps)))
        .unwrap_or_else(|payload| Err(EpicError::from_panic(payload)))
}
