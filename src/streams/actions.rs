//! # Action streams.
//!
//! [`ActionStream`] is a cheap, cloneable *handle* describing a source of
//! actions. Every call to [`ActionStream::subscribe`] opens an independent
//! subscription (a `futures::Stream`), so a handle can be filtered, piped and
//! shared between epics without consuming it.
//!
//! ## Sources
//! - **Live** (internal): backed by the middleware's action channel; hot, no replay.
//! - [`ActionStream::of`] / [`ActionStream::of_with`]: a finite list, replayed
//!   from the start for every subscription, then completes.
//! - [`ActionStream::from_fn`]: a factory producing a fresh stream per subscription.
//! - [`ActionStream::from_stream`]: a single existing stream, handed to the
//!   first subscription only.
//!
//! ## Filtering
//! ```rust
//! # use epicflow::{Action, ActionStream};
//! # use futures::StreamExt;
//! # #[derive(Debug, Clone, PartialEq)] struct Msg(&'static str);
//! # impl Action for Msg { fn action_type(&self) -> &str { self.0 } }
//! # tokio_test_block(async {
//! let src = ActionStream::of(vec![Msg("FOO"), Msg("BAR"), Msg("FOO")]);
//! let foos: Vec<Msg> = src.of_type(["FOO"]).subscribe().collect().await;
//! assert_eq!(foos, vec![Msg("FOO"), Msg("FOO")]);
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::action::Action;
use crate::streams::channel::Channel;
use crate::streams::scheduler::Scheduler;

type Factory<A> = Arc<dyn Fn() -> BoxStream<'static, A> + Send + Sync>;

/// Handle to a (possibly hot) source of actions.
pub struct ActionStream<A> {
    factory: Factory<A>,
}

impl<A> Clone for ActionStream<A> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<A> fmt::Debug for ActionStream<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionStream").finish_non_exhaustive()
    }
}

impl<A: Action> ActionStream<A> {
    /// Handle over the middleware's live channel.
    pub(crate) fn live(channel: Channel<A>) -> Self {
        Self::from_fn(move || channel.subscribe())
    }

    /// Finite source yielding exactly `items`, in order, then completing.
    pub fn of(items: impl IntoIterator<Item = A>) -> Self {
        Self::of_with(items, Scheduler::Immediate)
    }

    /// Like [`of`](Self::of), emitting under the given [`Scheduler`].
    pub fn of_with(items: impl IntoIterator<Item = A>, scheduler: Scheduler) -> Self {
        let items: Arc<[A]> = items.into_iter().collect();
        Self::from_fn(move || scheduler.schedule(stream::iter(items.to_vec())))
    }

    /// Source built by calling `factory` once per subscription.
    pub fn from_fn<F, St>(factory: F) -> Self
    where
        F: Fn() -> St + Send + Sync + 'static,
        St: Stream<Item = A> + Send + 'static,
    {
        Self {
            factory: Arc::new(move || factory().boxed()),
        }
    }

    /// Adapts one existing stream.
    ///
    /// A stream can only be consumed once: the first subscription receives it,
    /// later subscriptions complete immediately without items.
    pub fn from_stream<St>(source: St) -> Self
    where
        St: Stream<Item = A> + Send + 'static,
    {
        let cell: Mutex<Option<BoxStream<'static, A>>> = Mutex::new(Some(source.boxed()));
        Self::from_fn(move || {
            cell.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .unwrap_or_else(|| stream::empty().boxed())
        })
    }

    /// Opens a new subscription.
    ///
    /// For live handles the subscription is registered immediately, so every
    /// action dispatched after this call is observed even if the returned
    /// stream is polled later.
    pub fn subscribe(&self) -> BoxStream<'static, A> {
        (self.factory)()
    }

    /// Lazily filters to actions whose type is one of `keys`.
    ///
    /// Restartable: every subscription of the returned handle opens its own
    /// upstream subscription.
    pub fn of_type<K>(&self, keys: impl IntoIterator<Item = K>) -> Self
    where
        K: Into<Arc<str>>,
    {
        self.pipe(of_type(keys))
    }

    /// Applies `f` to every subscription of this handle.
    pub fn pipe<F>(&self, f: F) -> Self
    where
        F: Fn(BoxStream<'static, A>) -> BoxStream<'static, A> + Send + Sync + 'static,
    {
        let upstream = Arc::clone(&self.factory);
        Self {
            factory: Arc::new(move || f(upstream())),
        }
    }

    /// Re-schedules every subscription of this handle.
    pub fn observe_on(&self, scheduler: Scheduler) -> Self {
        self.pipe(move |s| scheduler.schedule(s))
    }
}

/// Set of `type` discriminants used by [`of_type`].
#[derive(Clone, Debug)]
struct TypeKeys(Arc<[Arc<str>]>);

impl TypeKeys {
    fn new<K: Into<Arc<str>>>(keys: impl IntoIterator<Item = K>) -> Self {
        Self(keys.into_iter().map(Into::into).collect())
    }

    fn matches<A: Action>(&self, action: &A) -> bool {
        action.is_one_of(&self.0[..])
    }
}

/// Returns a pipeline stage keeping only actions whose type is one of `keys`.
///
/// Usable with [`ActionStream::pipe`] or directly on any boxed action stream.
pub fn of_type<A, K>(
    keys: impl IntoIterator<Item = K>,
) -> impl Fn(BoxStream<'static, A>) -> BoxStream<'static, A> + Clone + Send + Sync + 'static
where
    A: Action,
    K: Into<Arc<str>>,
{
    let keys = TypeKeys::new(keys);
    move |source| filter_keys(source, keys.clone())
}

fn filter_keys<A, St>(source: St, keys: TypeKeys) -> BoxStream<'static, A>
where
    A: Action,
    St: Stream<Item = A> + Send + 'static,
{
    source.filter(move |a| future::ready(keys.matches(a))).boxed()
}

/// Action-specific combinators for any stream of actions.
pub trait ActionStreamExt<A: Action>: Stream<Item = A> + Sized + Send + 'static {
    /// Keeps only actions whose type is one of `keys`, preserving order.
    fn of_type<K>(self, keys: impl IntoIterator<Item = K>) -> BoxStream<'static, A>
    where
        K: Into<Arc<str>>,
    {
        filter_keys(self, TypeKeys::new(keys))
    }

    /// Narrows actions to a more specific type, dropping those that do not convert.
    fn narrow<R>(self) -> BoxStream<'static, R>
    where
        R: TryFrom<A> + Send + 'static,
    {
        self.filter_map(|a| future::ready(R::try_from(a).ok())).boxed()
    }
}

impl<A: Action, St> ActionStreamExt<A> for St where St: Stream<Item = A> + Send + 'static {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_support::TestAction;

    fn types(actions: &[TestAction]) -> Vec<&'static str> {
        actions.iter().map(|a| a.ty).collect()
    }

    #[tokio::test]
    async fn test_of_yields_items_then_completes() {
        let src = ActionStream::of(vec![TestAction::new("A"), TestAction::new("B")]);
        let out: Vec<_> = src.subscribe().collect().await;
        assert_eq!(types(&out), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_of_is_restartable_per_subscription() {
        let src = ActionStream::of(vec![TestAction::new("A")]);
        let first: Vec<_> = src.subscribe().collect().await;
        let second: Vec<_> = src.subscribe().collect().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_of_type_keeps_matching_in_order() {
        let src = ActionStream::of(vec![
            TestAction::with_payload("FOO", 1),
            TestAction::with_payload("BAR", 2),
            TestAction::with_payload("FOO", 3),
        ]);
        let out: Vec<_> = src.of_type(["FOO"]).subscribe().collect().await;
        assert_eq!(
            out,
            vec![TestAction::with_payload("FOO", 1), TestAction::with_payload("FOO", 3)]
        );
    }

    #[tokio::test]
    async fn test_of_type_with_several_keys() {
        let src = ActionStream::of(vec![
            TestAction::new("A"),
            TestAction::new("B"),
            TestAction::new("C"),
        ]);
        let out: Vec<_> = src.of_type(["C", "A"]).subscribe().collect().await;
        assert_eq!(types(&out), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_free_of_type_as_pipeline_stage() {
        let stage = of_type::<TestAction, _>(["FOO"]);
        let src = stream::iter(vec![TestAction::new("FOO"), TestAction::new("BAR")]).boxed();
        let out: Vec<_> = stage(src).collect().await;
        assert_eq!(types(&out), vec!["FOO"]);
    }

    #[tokio::test]
    async fn test_from_stream_is_single_use() {
        let src = ActionStream::from_stream(stream::iter(vec![TestAction::new("X")]));
        let first: Vec<_> = src.subscribe().collect().await;
        let second: Vec<_> = src.subscribe().collect().await;
        assert_eq!(types(&first), vec!["X"]);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_live_handle_registers_on_subscribe() {
        let ch = Channel::new();
        let src = ActionStream::live(ch.clone()).of_type(["PING"]);
        ch.publish(TestAction::new("PING"));

        let sub = src.subscribe();
        ch.publish(TestAction::new("PONG"));
        ch.publish(TestAction::new("PING"));
        drop(ch);
        drop(src);

        let out: Vec<_> = sub.collect().await;
        assert_eq!(types(&out), vec!["PING"]);
    }

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    impl TryFrom<TestAction> for Ping {
        type Error = ();
        fn try_from(a: TestAction) -> Result<Self, ()> {
            (a.ty == "PING").then_some(Ping(a.payload)).ok_or(())
        }
    }

    #[tokio::test]
    async fn test_narrow_converts_and_drops() {
        let src = stream::iter(vec![
            TestAction::with_payload("PING", 1),
            TestAction::with_payload("PONG", 2),
        ]);
        let out: Vec<Ping> = src.narrow().collect().await;
        assert_eq!(out, vec![Ping(1)]);
    }
}
