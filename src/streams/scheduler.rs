//! # Emission scheduling policy.
//!
//! [`Scheduler`] decides how a finite or adapted action source hands items to
//! its consumer:
//! - [`Scheduler::Immediate`]: items are yielded as fast as they are polled.
//! - [`Scheduler::Yielding`]: the task yields to the runtime before every item,
//!   letting other epics and dispatches interleave.

use futures::stream::{BoxStream, Stream, StreamExt};

/// Ordering policy applied to action sources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scheduler {
    /// Emit synchronously on poll.
    #[default]
    Immediate,
    /// Yield to the runtime before each item.
    Yielding,
}

impl Scheduler {
    /// Applies this policy to `source`.
    pub fn schedule<T, St>(self, source: St) -> BoxStream<'static, T>
    where
        T: Send + 'static,
        St: Stream<Item = T> + Send + 'static,
    {
        match self {
            Scheduler::Immediate => source.boxed(),
            Scheduler::Yielding => source
                .then(|item| async move {
                    tokio::task::yield_now().await;
                    item
                })
                .boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    #[tokio::test]
    async fn test_both_policies_preserve_items() {
        for s in [Scheduler::Immediate, Scheduler::Yielding] {
            let out: Vec<u8> = s.schedule(stream::iter(vec![1, 2, 3])).collect().await;
            assert_eq!(out, vec![1, 2, 3], "policy {s:?}");
        }
    }

    #[tokio::test]
    async fn test_yielding_lets_other_tasks_interleave() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let flag = Arc::new(AtomicBool::new(false));
        let f = flag.clone();
        tokio::spawn(async move { f.store(true, Ordering::SeqCst) });

        let mut s = Scheduler::Yielding.schedule(stream::iter(vec![1]));
        assert_eq!(s.next().await, Some(1));
        assert!(flag.load(Ordering::SeqCst));
    }
}
