//! # Stream adapters.
//!
//! An [`Adapter`] sits between the middleware and the active epic:
//!
//! ```text
//! action channel ─► adapter.input ─► epic.run ─► adapter.output ─► store.dispatch
//! ```
//!
//! Both hooks default to the identity, so an adapter only overrides the side it
//! cares about. One adapter is configured per middleware instance and applied
//! to every epic activation.

use std::fmt;
use std::sync::Arc;

use crate::action::Action;
use crate::epics::EpicOutput;
use crate::streams::ActionStream;

/// Transforms the action handle given to epics and the output they produce.
pub trait Adapter<A: Action>: Send + Sync + 'static {
    /// Rewrites the action handle before it reaches the epic.
    fn input(&self, actions: ActionStream<A>) -> ActionStream<A> {
        actions
    }

    /// Rewrites the epic's output before it is dispatched.
    fn output(&self, output: EpicOutput<A>) -> EpicOutput<A> {
        output
    }
}

/// Adapter that changes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityAdapter;

impl<A: Action> Adapter<A> for IdentityAdapter {}

type InputFn<A> = Arc<dyn Fn(ActionStream<A>) -> ActionStream<A> + Send + Sync>;
type OutputFn<A> = Arc<dyn Fn(EpicOutput<A>) -> EpicOutput<A> + Send + Sync>;

/// Closure-backed adapter.
///
/// # Example
/// ```
/// use epicflow::{Action, AdapterFn};
///
/// #[derive(Debug, Clone)]
/// struct Msg(&'static str);
/// impl Action for Msg { fn action_type(&self) -> &str { self.0 } }
///
/// // Hide internal actions from every epic.
/// let adapter = AdapterFn::<Msg>::identity().with_input(|a| a.pipe(epicflow::of_type(["PUBLIC"])));
/// # let _ = adapter;
/// ```
pub struct AdapterFn<A> {
    input: InputFn<A>,
    output: OutputFn<A>,
}

impl<A> fmt::Debug for AdapterFn<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterFn").finish_non_exhaustive()
    }
}

impl<A: Action> AdapterFn<A> {
    /// Adapter built from an input and an output transform.
    pub fn new<I, O>(input: I, output: O) -> Self
    where
        I: Fn(ActionStream<A>) -> ActionStream<A> + Send + Sync + 'static,
        O: Fn(EpicOutput<A>) -> EpicOutput<A> + Send + Sync + 'static,
    {
        Self {
            input: Arc::new(input),
            output: Arc::new(output),
        }
    }

    /// Adapter with both transforms set to the identity.
    pub fn identity() -> Self {
        Self::new(|a| a, |o| o)
    }

    /// Replaces the input transform.
    pub fn with_input<I>(mut self, input: I) -> Self
    where
        I: Fn(ActionStream<A>) -> ActionStream<A> + Send + Sync + 'static,
    {
        self.input = Arc::new(input);
        self
    }

    /// Replaces the output transform.
    pub fn with_output<O>(mut self, output: O) -> Self
    where
        O: Fn(EpicOutput<A>) -> EpicOutput<A> + Send + Sync + 'static,
    {
        self.output = Arc::new(output);
        self
    }
}

impl<A: Action> Adapter<A> for AdapterFn<A> {
    fn input(&self, actions: ActionStream<A>) -> ActionStream<A> {
        (self.input)(actions)
    }

    fn output(&self, output: EpicOutput<A>) -> EpicOutput<A> {
        (self.output)(output)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::action::test_support::TestAction;

    #[tokio::test]
    async fn test_identity_passes_through() {
        let src = ActionStream::of(vec![TestAction::new("A")]);
        let out: Vec<_> = Adapter::input(&IdentityAdapter, src).subscribe().collect().await;
        assert_eq!(out, vec![TestAction::new("A")]);
    }

    #[tokio::test]
    async fn test_closure_adapter_rewrites_both_sides() {
        let adapter = AdapterFn::<TestAction>::identity()
            .with_input(|a| a.of_type(["KEEP"]))
            .with_output(|o| {
                o.map(|r| r.map(|a| TestAction::with_payload(a.ty, a.payload + 1)))
                    .boxed()
            });

        let src = ActionStream::of(vec![TestAction::new("KEEP"), TestAction::new("DROP")]);
        let seen: Vec<_> = adapter.input(src).subscribe().collect().await;
        assert_eq!(seen, vec![TestAction::new("KEEP")]);

        let out = futures::stream::iter(vec![Ok(TestAction::with_payload("X", 1))]).boxed();
        let out: Vec<_> = adapter.output(out).collect().await;
        assert_eq!(out, vec![Ok(TestAction::with_payload("X", 2))]);
    }
}
