//! # Drive one epic activation.
//!
//! A [`Runner`] owns the output stream of one activated epic and forwards every
//! emitted action to the store's top-level dispatch until the stream ends, fails,
//! or is cancelled.
//!
//! ## Event flow
//!
//! ```text
//! Ok(action), still current   → store.dispatch(action)
//! Ok(action), replaced        → publish OutputSuppressed (action dropped)
//! Err(e) / panic              → publish EpicFailed      → exit
//! stream ended                → publish EpicCompleted   → exit
//! token cancelled             → exit (the canceller publishes EpicCancelled)
//! ```
//!
//! ## Rules
//! - Cancellation is checked before every poll (`biased` select).
//! - An emission is forwarded only while the slot generation still matches;
//!   the check runs under the slot lock, so once `run` has bumped the
//!   generation no later emission of the old epic reaches the store.
//! - A panic while polling the output is caught and reported as a failure.
//! - On exit the runner clears its own slot entry, never a newer one.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::action::Action;
use crate::core::slot::{self, SharedSlot};
use crate::epics::EpicOutput;
use crate::error::EpicError;
use crate::events::{Bus, Event, EventKind};
use crate::store::StoreApi;

/// How a runner ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RunnerExit {
    /// Output stream ended normally.
    Completed,
    /// Replaced or shut down.
    Cancelled,
    /// Output stream yielded an error or panicked.
    Failed(EpicError),
}

pub(super) struct Runner<A, S> {
    pub name: Arc<str>,
    pub generation: u64,
    pub token: CancellationToken,
    pub output: EpicOutput<A>,
    pub store: Arc<dyn StoreApi<A, S>>,
    pub slot: SharedSlot,
    pub bus: Bus,
}

impl<A: Action, S: 'static> Runner<A, S> {
    /// Forwards output until the epic ends, then reports how it ended.
    pub async fn drive(mut self) -> RunnerExit {
        let exit = loop {
            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => break RunnerExit::Cancelled,
                next = AssertUnwindSafe(self.output.next()).catch_unwind() => next,
            };
            match next {
                Ok(Some(Ok(action))) => self.forward(action),
                Ok(Some(Err(err))) => break RunnerExit::Failed(err),
                Ok(None) => break RunnerExit::Completed,
                Err(payload) => break RunnerExit::Failed(EpicError::from_panic(payload)),
            }
        };
        self.finish(&exit);
        exit
    }

    fn forward(&self, action: A) {
        let current = {
            let slot = slot::read(&self.slot);
            slot.generation == self.generation && !self.token.is_cancelled()
        };
        if current {
            self.store.dispatch(action);
            return;
        }

        tracing::warn!(
            epic = %self.name,
            generation = self.generation,
            action = action.action_type(),
            "output of replaced epic suppressed"
        );
        self.bus.publish(
            Event::new(EventKind::OutputSuppressed)
                .with_epic(Arc::clone(&self.name))
                .with_generation(self.generation)
                .with_reason(action.action_type()),
        );
    }

    fn finish(&self, exit: &RunnerExit) {
        slot::write(&self.slot).clear_if(self.generation);

        match exit {
            RunnerExit::Completed => {
                tracing::debug!(epic = %self.name, generation = self.generation, "epic completed");
                self.bus.publish(
                    Event::new(EventKind::EpicCompleted)
                        .with_epic(Arc::clone(&self.name))
                        .with_generation(self.generation),
                );
            }
            RunnerExit::Cancelled => {
                tracing::debug!(epic = %self.name, generation = self.generation, "epic cancelled");
            }
            RunnerExit::Failed(err) => {
                tracing::error!(
                    epic = %self.name,
                    generation = self.generation,
                    error = %err,
                    "epic failed"
                );
                self.bus.publish(
                    Event::new(EventKind::EpicFailed)
                        .with_epic(Arc::clone(&self.name))
                        .with_generation(self.generation)
                        .with_reason(err.as_message()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, RwLock};

    use futures::stream;

    use super::*;
    use crate::action::test_support::TestAction;
    use crate::core::slot::Slot;

    #[derive(Default)]
    struct Sink {
        seen: Mutex<Vec<TestAction>>,
    }

    impl StoreApi<TestAction, ()> for Sink {
        fn get_state(&self) {}

        fn dispatch(&self, action: TestAction) -> TestAction {
            self.seen.lock().unwrap().push(action.clone());
            action
        }
    }

    fn runner(output: EpicOutput<TestAction>, sink: Arc<Sink>, generation: u64) -> (Runner<TestAction, ()>, Bus) {
        let bus = Bus::new(16);
        let mut slot = Slot::new();
        slot.generation = 1;
        let r = Runner {
            name: "test".into(),
            generation,
            token: CancellationToken::new(),
            output,
            store: sink,
            slot: Arc::new(RwLock::new(slot)),
            bus: bus.clone(),
        };
        (r, bus)
    }

    #[tokio::test]
    async fn test_forwards_then_completes() {
        let sink = Arc::new(Sink::default());
        let out = stream::iter(vec![Ok(TestAction::new("A")), Ok(TestAction::new("B"))]).boxed();
        let (r, bus) = runner(out, sink.clone(), 1);
        let mut rx = bus.subscribe();

        assert_eq!(r.drive().await, RunnerExit::Completed);
        assert_eq!(*sink.seen.lock().unwrap(), vec![TestAction::new("A"), TestAction::new("B")]);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::EpicCompleted);
    }

    #[tokio::test]
    async fn test_error_item_ends_runner() {
        let sink = Arc::new(Sink::default());
        let out = stream::iter(vec![
            Err(EpicError::stream("down")),
            Ok(TestAction::new("NEVER")),
        ])
        .boxed();
        let (r, bus) = runner(out, sink.clone(), 1);
        let mut rx = bus.subscribe();

        assert_eq!(r.drive().await, RunnerExit::Failed(EpicError::stream("down")));
        assert!(sink.seen.lock().unwrap().is_empty());
        let ev = rx.recv().await.unwrap();
        assert!(ev.is_epic_failure());
        assert_eq!(ev.reason.as_deref(), Some("stream: down"));
    }

    #[tokio::test]
    async fn test_panic_while_polling_is_a_failure() {
        let sink = Arc::new(Sink::default());
        let out = stream::iter([0])
            .map(|_| -> Result<TestAction, EpicError> { panic!("poll boom") })
            .boxed();
        let (r, _bus) = runner(out, sink, 1);
        assert_eq!(
            r.drive().await,
            RunnerExit::Failed(EpicError::Panicked { info: "poll boom".into() })
        );
    }

    #[tokio::test]
    async fn test_stale_generation_is_suppressed() {
        let sink = Arc::new(Sink::default());
        let out = stream::iter(vec![Ok(TestAction::new("LATE"))]).boxed();
        let (r, bus) = runner(out, sink.clone(), 0);
        let mut rx = bus.subscribe();

        assert_eq!(r.drive().await, RunnerExit::Completed);
        assert!(sink.seen.lock().unwrap().is_empty());
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::OutputSuppressed);
        assert_eq!(ev.reason.as_deref(), Some("LATE"));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_polling() {
        let sink = Arc::new(Sink::default());
        let out = stream::iter(vec![Ok(TestAction::new("A"))]).boxed();
        let (r, _bus) = runner(out, sink.clone(), 1);
        r.token.cancel();
        assert_eq!(r.drive().await, RunnerExit::Cancelled);
        assert!(sink.seen.lock().unwrap().is_empty());
    }
}
