//! # Epic combinators.
//!
//! [`combine_epics`] merges several epics into one. The combined epic hands
//! each constituent the same action handle, state stream and dependencies, and
//! interleaves their outputs in emission order.
//!
//! ```text
//!                 ┌─► epic 1 ─┐
//! actions/state ──┼─► epic 2 ─┼─► select_all ─► combined output
//!                 └─► epic N ─┘
//! ```
//!
//! - [`combine_epics`]: any construction error aborts the whole combination, and
//!   a runtime error from any constituent ends the combined output.
//! - [`combine_epics_isolated`]: failures stay local to the constituent that
//!   raised them; they are logged and the rest keep running.
//!
//! Combined epics are ordinary epics, so nesting behaves like one flat list.

use std::future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::action::Action;
use crate::epics::epic::{build_guarded, Epic, EpicOutput, EpicRef};
use crate::error::EpicError;
use crate::streams::{ActionStream, StateStream};

/// Merges `epics` into a single epic.
///
/// An empty list yields an epic whose output completes immediately.
pub fn combine_epics<A, S, D>(epics: impl IntoIterator<Item = EpicRef<A, S, D>>) -> EpicRef<A, S, D>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    Arc::new(CombinedEpic::new(epics, false))
}

/// Merges `epics`, containing each constituent's failures.
///
/// A constituent that fails to build is skipped; one whose output errors or
/// panics stops on its own. All cases are logged through `tracing`.
pub fn combine_epics_isolated<A, S, D>(
    epics: impl IntoIterator<Item = EpicRef<A, S, D>>,
) -> EpicRef<A, S, D>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    Arc::new(CombinedEpic::new(epics, true))
}

struct CombinedEpic<A, S, D> {
    name: String,
    epics: Vec<EpicRef<A, S, D>>,
    isolated: bool,
}

impl<A, S, D> CombinedEpic<A, S, D>
where
    A: 'static,
    S: 'static,
    D: 'static,
{
    fn new(epics: impl IntoIterator<Item = EpicRef<A, S, D>>, isolated: bool) -> Self {
        let epics: Vec<_> = epics.into_iter().collect();
        let names: Vec<&str> = epics.iter().map(|e| e.name()).collect();
        let prefix = if isolated {
            "combine_epics_isolated"
        } else {
            "combine_epics"
        };
        Self {
            name: format!("{prefix}({})", names.join(", ")),
            epics,
            isolated,
        }
    }
}

impl<A, S, D> Epic<A, S, D> for CombinedEpic<A, S, D>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
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
        let mut outputs = Vec::with_capacity(self.epics.len());

        for epic in &self.epics {
            let built = build_guarded(epic.as_ref(), actions.clone(), state.clone(), Arc::clone(&deps));
            match (built, self.isolated) {
                (Ok(output), false) => outputs.push(output),
                (Ok(output), true) => outputs.push(contain(epic.name().into(), output)),
                (Err(err), false) => return Err(err.within(epic.name())),
                (Err(err), true) => {
                    tracing::error!(
                        epic = epic.name(),
                        error = %err,
                        "constituent failed to start; skipping"
                    );
                }
            }
        }

        Ok(stream::select_all(outputs).boxed())
    }
}

/// Ends a constituent's output at its first error or panic, logging it instead
/// of propagating it to the combined stream.
fn contain<A: Action>(name: Arc<str>, output: EpicOutput<A>) -> EpicOutput<A> {
    AssertUnwindSafe(output)
        .catch_unwind()
        .map(|polled| polled.unwrap_or_else(|payload| Err(EpicError::from_panic(payload))))
        .take_while(move |item| {
            if let Err(err) = item {
                tracing::error!(epic = %name, error = %err, "constituent stream failed; stopping it");
            }
            future::ready(item.is_ok())
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;
    use crate::action::test_support::TestAction;
    use crate::epics::epic::emit;
    use crate::epics::epic_fn::EpicFn;

    type Ref = EpicRef<TestAction, ()>;

    fn answer(name: &'static str, on: &'static str, reply: &'static str) -> Ref {
        EpicFn::arc(name, move |actions, _state, _deps| {
            Ok(emit(actions.of_type([on]).subscribe().map(move |_| TestAction::new(reply))))
        })
    }

    fn broken(name: &'static str) -> Ref {
        EpicFn::arc(name, |_actions, _state, _deps| Err(EpicError::construction("missing config")))
    }

    fn failing_stream(name: &'static str) -> Ref {
        EpicFn::arc(name, |_actions, _state, _deps| {
            Ok(stream::iter(vec![
                Ok(TestAction::new("BEFORE")),
                Err(EpicError::stream("lost connection")),
                Ok(TestAction::new("AFTER")),
            ])
            .boxed())
        })
    }

    async fn drive(epic: &Ref, input: Vec<TestAction>) -> Result<Vec<Result<TestAction, EpicError>>, EpicError> {
        let (state, _tx) = StateStream::detached(());
        let out = epic.run(ActionStream::of(input), state, Arc::new(()))?;
        Ok(out.collect().await)
    }

    fn sorted_types(items: Vec<Result<TestAction, EpicError>>) -> Vec<&'static str> {
        let mut tys: Vec<_> = items.into_iter().map(|r| r.unwrap().ty).collect();
        tys.sort_unstable();
        tys
    }

    #[tokio::test]
    async fn test_combined_epics_all_see_each_action() {
        let root = combine_epics(vec![answer("x", "A", "X"), answer("y", "A", "Y")]);
        let out = drive(&root, vec![TestAction::new("A")]).await.unwrap();
        assert_eq!(sorted_types(out), vec!["X", "Y"]);
        assert_eq!(root.name(), "combine_epics(x, y)");
    }

    #[tokio::test]
    async fn test_empty_combination_completes_without_output() {
        let root: Ref = combine_epics(Vec::new());
        let out = drive(&root, vec![TestAction::new("A")]).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_nested_behaves_like_flat() {
        let nested = combine_epics(vec![
            answer("x", "A", "X"),
            combine_epics(vec![answer("y", "A", "Y"), answer("z", "A", "Z")]),
        ]);
        let flat = combine_epics(vec![
            answer("x", "A", "X"),
            answer("y", "A", "Y"),
            answer("z", "A", "Z"),
        ]);
        let input = vec![TestAction::new("A"), TestAction::new("B")];
        let a = sorted_types(drive(&nested, input.clone()).await.unwrap());
        let b = sorted_types(drive(&flat, input).await.unwrap());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_construction_error_aborts_combination() {
        let root = combine_epics(vec![answer("x", "A", "X"), broken("loader")]);
        let err = drive(&root, vec![]).await.unwrap_err();
        assert_eq!(err, EpicError::construction("loader: missing config"));
    }

    #[tokio::test]
    async fn test_runtime_error_reaches_combined_output() {
        let root = combine_epics(vec![failing_stream("net")]);
        let out = drive(&root, vec![]).await.unwrap();
        assert_eq!(out[0], Ok(TestAction::new("BEFORE")));
        assert_eq!(out[1], Err(EpicError::stream("lost connection")));
    }

    #[tokio::test]
    async fn test_isolated_skips_broken_constituent() {
        let root = combine_epics_isolated(vec![broken("loader"), answer("x", "A", "X")]);
        let out = drive(&root, vec![TestAction::new("A")]).await.unwrap();
        assert_eq!(sorted_types(out), vec!["X"]);
    }

    #[tokio::test]
    async fn test_isolated_stops_only_failing_constituent() {
        let root = combine_epics_isolated(vec![failing_stream("net"), answer("x", "A", "X")]);
        let out = drive(&root, vec![TestAction::new("A")]).await.unwrap();
        assert_eq!(sorted_types(out), vec!["BEFORE", "X"]);
    }

    fn panicking_stream(name: &'static str) -> Ref {
        EpicFn::arc(name, |_actions, _state, _deps| {
            Ok(stream::iter([0])
                .map(|_| -> Result<TestAction, EpicError> { panic!("decoder blew up") })
                .boxed())
        })
    }

    #[tokio::test]
    async fn test_isolated_contains_a_panicking_constituent() {
        let root = combine_epics_isolated(vec![panicking_stream("decoder"), answer("x", "A", "X")]);
        let out = drive(&root, vec![TestAction::new("A")]).await.unwrap();
        assert_eq!(sorted_types(out), vec!["X"]);
    }
}
