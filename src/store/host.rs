//! # Minimal host store.
//!
//! [`Store`] holds a state value, a [`Reducer`], and the composed middleware
//! chain. It exists so the middleware can be attached and exercised in-process.
//!
//! ## Dispatch discipline
//! ```text
//! dispatch(action)
//!   ├─ queue idle?                  ──► become the drainer: run chain(action), then drain the queue
//!   ├─ drained by this thread?      ──► enqueue and return (re-entrant dispatch)
//!   └─ drained by another thread?   ──► block until the drainer is done, then become the drainer
//! ```
//!
//! Every action runs the full chain (reduce, then middleware post-processing)
//! before the next queued action starts, so state snapshots and action
//! deliveries stay in the same order. A dispatch from outside the chain has
//! been reduced and published by the time it returns. Dispatches that arrive
//! while the chain is still being composed are queued and processed once it is
//! installed.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, Weak};
use std::thread::{self, ThreadId};

use crate::error::MiddlewareError;
use crate::store::api::{Dispatch, Middleware, StoreApi};

/// Pure state transition.
pub trait Reducer<A, S>: Send + Sync + 'static {
    /// Applies `action` to `state`.
    fn reduce(&self, state: &mut S, action: &A);
}

impl<A, S, F> Reducer<A, S> for F
where
    F: Fn(&mut S, &A) + Send + Sync + 'static,
{
    fn reduce(&self, state: &mut S, action: &A) {
        self(state, action)
    }
}

struct DispatchQueue<A> {
    pending: VecDeque<A>,
    /// Thread currently running the chain.
    drainer: Option<ThreadId>,
}

/// In-process store with a middleware chain.
pub struct Store<A, S> {
    state: Arc<RwLock<S>>,
    reducer: Box<dyn Reducer<A, S>>,
    chain: OnceLock<Dispatch<A>>,
    queue: Mutex<DispatchQueue<A>>,
    released: Condvar,
}

impl<A, S> Store<A, S>
where
    A: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    /// Creates a store without middleware.
    pub fn new(reducer: impl Reducer<A, S>, initial: S) -> Arc<Self> {
        let store = Self::bare(reducer, initial);
        let base = Self::base_stage(&store);
        store.install(base);
        store
    }

    /// Creates a store and attaches `middlewares`.
    ///
    /// The first middleware is the outermost stage.
    pub fn with_middleware(
        reducer: impl Reducer<A, S>,
        initial: S,
        middlewares: Vec<Arc<dyn Middleware<A, S>>>,
    ) -> Result<Arc<Self>, MiddlewareError> {
        let store = Self::bare(reducer, initial);
        let api = store.api();

        let layers = middlewares
            .iter()
            .map(|m| m.attach(Arc::clone(&api)))
            .collect::<Result<Vec<_>, _>>()?;

        let chain = layers
            .into_iter()
            .rev()
            .fold(Self::base_stage(&store), |next, layer| layer(next));
        store.install(chain);
        Ok(store)
    }

    /// Returns a clone of the current state.
    pub fn get_state(&self) -> S {
        read(&self.state).clone()
    }

    /// Dispatches `action` through the middleware chain.
    ///
    /// Returns the chain's result when this call processed the action itself,
    /// or the action unchanged when it was queued: from inside the chain, or
    /// before the chain is installed. A call from another thread while the
    /// chain is running blocks until that drain is finished.
    pub fn dispatch(&self, action: A) -> A {
        let me = thread::current().id();
        let chain = {
            let mut q = self.lock_queue();
            loop {
                let Some(chain) = self.chain.get() else {
                    q.pending.push_back(action.clone());
                    return action;
                };
                match q.drainer {
                    None => {
                        q.drainer = Some(me);
                        break Arc::clone(chain);
                    }
                    Some(owner) if owner == me => {
                        q.pending.push_back(action.clone());
                        return action;
                    }
                    Some(_) => {
                        q = self.released.wait(q).unwrap_or_else(PoisonError::into_inner);
                    }
                }
            }
        };

        let guard = DrainGuard::new(self);
        let result = chain(action);
        self.drain(&chain);
        guard.finish();
        result
    }

    /// Returns the `{ get_state, dispatch }` view of this store.
    pub fn api(self: &Arc<Self>) -> Arc<dyn StoreApi<A, S>> {
        Arc::new(StoreRef {
            state: Arc::clone(&self.state),
            store: Arc::downgrade(self),
        })
    }

    fn bare(reducer: impl Reducer<A, S>, initial: S) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(RwLock::new(initial)),
            reducer: Box::new(reducer),
            chain: OnceLock::new(),
            queue: Mutex::new(DispatchQueue {
                pending: VecDeque::new(),
                drainer: None,
            }),
            released: Condvar::new(),
        })
    }

    fn base_stage(store: &Arc<Self>) -> Dispatch<A> {
        let weak = Arc::downgrade(store);
        Arc::new(move |action: A| {
            if let Some(store) = weak.upgrade() {
                let mut state = store.state.write().unwrap_or_else(PoisonError::into_inner);
                store.reducer.reduce(&mut state, &action);
            }
            action
        })
    }

    fn install(&self, chain: Dispatch<A>) {
        if self.chain.set(Arc::clone(&chain)).is_err() {
            return;
        }
        {
            let mut q = self.lock_queue();
            if q.drainer.is_some() || q.pending.is_empty() {
                return;
            }
            q.drainer = Some(thread::current().id());
        }
        let guard = DrainGuard::new(self);
        self.drain(&chain);
        guard.finish();
    }

    /// Processes queued actions until the queue is empty, then releases the
    /// drainer role under the same lock so no enqueued action is stranded.
    fn drain(&self, chain: &Dispatch<A>) {
        loop {
            let next = {
                let mut q = self.lock_queue();
                match q.pending.pop_front() {
                    Some(action) => action,
                    None => {
                        q.drainer = None;
                        self.released.notify_all();
                        return;
                    }
                }
            };
            let _ = chain(next);
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, DispatchQueue<A>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the drainer role if a stage panics mid-drain.
struct DrainGuard<'a, A, S> {
    store: &'a Store<A, S>,
    armed: bool,
}

impl<'a, A, S> DrainGuard<'a, A, S> {
    fn new(store: &'a Store<A, S>) -> Self {
        Self { store, armed: true }
    }

    fn finish(mut self) {
        self.armed = false;
    }
}

impl<A, S> Drop for DrainGuard<'_, A, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut q = self
            .store
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        q.drainer = None;
        self.store.released.notify_all();
    }
}

/// Weak handle given to middleware, so the store is not kept alive by its own chain.
struct StoreRef<A, S> {
    state: Arc<RwLock<S>>,
    store: Weak<Store<A, S>>,
}

impl<A, S> StoreApi<A, S> for StoreRef<A, S>
where
    A: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    fn get_state(&self) -> S {
        read(&self.state).clone()
    }

    fn dispatch(&self, action: A) -> A {
        match self.store.upgrade() {
            Some(store) => store.dispatch(action),
            None => {
                tracing::warn!("dispatch on a dropped store ignored");
                action
            }
        }
    }
}

fn read<S>(lock: &RwLock<S>) -> std::sync::RwLockReadGuard<'_, S> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::store::api::DispatchLayer;

    fn counter(state: &mut i64, action: &i64) {
        *state += *action;
    }

    #[test]
    fn test_dispatch_reduces_synchronously() {
        let store = Store::new(counter, 0);
        assert_eq!(store.dispatch(5), 5);
        store.dispatch(-2);
        assert_eq!(store.get_state(), 3);
    }

    #[test]
    fn test_api_view_outlives_store_gracefully() {
        let store = Store::new(counter, 1);
        let api = store.api();
        assert_eq!(api.dispatch(2), 2);
        assert_eq!(api.get_state(), 3);

        drop(store);
        assert_eq!(api.dispatch(5), 5);
        assert_eq!(api.get_state(), 3);
    }

    /// Records the order in which actions reach it.
    struct Tap {
        seen: Arc<Mutex<Vec<i64>>>,
    }

    impl Middleware<i64, i64> for Tap {
        fn attach(&self, _store: Arc<dyn StoreApi<i64, i64>>) -> Result<DispatchLayer<i64>, MiddlewareError> {
            let seen = Arc::clone(&self.seen);
            Ok(Box::new(move |next: Dispatch<i64>| {
                Arc::new(move |action: i64| {
                    seen.lock().unwrap().push(action);
                    next(action)
                }) as Dispatch<i64>
            }))
        }
    }

    /// Re-dispatches `action * 10` once for every positive action, from inside the chain.
    struct Echo;

    impl Middleware<i64, i64> for Echo {
        fn attach(&self, store: Arc<dyn StoreApi<i64, i64>>) -> Result<DispatchLayer<i64>, MiddlewareError> {
            Ok(Box::new(move |next: Dispatch<i64>| {
                Arc::new(move |action: i64| {
                    let result = next(action);
                    if action > 0 && action < 10 {
                        store.dispatch(action * 10);
                    }
                    result
                }) as Dispatch<i64>
            }))
        }
    }

    #[test]
    fn test_reentrant_dispatch_is_queued_not_nested() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = Store::with_middleware(
            counter,
            0,
            vec![Arc::new(Tap { seen: seen.clone() }), Arc::new(Echo)],
        )
        .unwrap();

        store.dispatch(1);
        store.dispatch(2);

        assert_eq!(*seen.lock().unwrap(), vec![1, 10, 2, 20]);
        assert_eq!(store.get_state(), 33);
    }

    /// Dispatches during attachment, before the chain exists.
    struct EarlyBird {
        attached: AtomicUsize,
    }

    impl Middleware<i64, i64> for EarlyBird {
        fn attach(&self, store: Arc<dyn StoreApi<i64, i64>>) -> Result<DispatchLayer<i64>, MiddlewareError> {
            self.attached.fetch_add(1, Ordering::SeqCst);
            store.dispatch(100);
            Ok(Box::new(|next: Dispatch<i64>| next))
        }
    }

    #[test]
    fn test_dispatch_before_chain_is_installed_is_replayed() {
        let bird = Arc::new(EarlyBird {
            attached: AtomicUsize::new(0),
        });
        let store = Store::with_middleware(counter, 0, vec![bird.clone()]).unwrap();
        assert_eq!(bird.attached.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_state(), 100);
    }

    struct Refuse;

    impl Middleware<i64, i64> for Refuse {
        fn attach(&self, _store: Arc<dyn StoreApi<i64, i64>>) -> Result<DispatchLayer<i64>, MiddlewareError> {
            Err(MiddlewareError::AlreadyAttached)
        }
    }

    /// Holds the chain for a while on every action equal to `stall_on`.
    struct Stall {
        stall_on: i64,
    }

    impl Middleware<i64, i64> for Stall {
        fn attach(&self, _store: Arc<dyn StoreApi<i64, i64>>) -> Result<DispatchLayer<i64>, MiddlewareError> {
            let stall_on = self.stall_on;
            Ok(Box::new(move |next: Dispatch<i64>| {
                Arc::new(move |action: i64| {
                    let result = next(action);
                    if action == stall_on {
                        std::thread::sleep(Duration::from_millis(200));
                    }
                    result
                }) as Dispatch<i64>
            }))
        }
    }

    #[test]
    fn test_dispatch_from_another_thread_waits_for_the_drainer() {
        let store = Store::with_middleware(counter, 0, vec![Arc::new(Stall { stall_on: 7 })]).unwrap();

        let slow = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.dispatch(7))
        };
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(store.dispatch(1), 1);
        assert_eq!(store.get_state(), 8);
        assert_eq!(slow.join().unwrap(), 7);
    }

    #[test]
    fn test_drainer_role_survives_a_panicking_stage() {
        let store = Store::with_middleware(counter, 0, vec![Arc::new(Boom)]).unwrap();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| store.dispatch(-1)));
        assert!(res.is_err());

        let other = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.dispatch(4))
        };
        assert_eq!(other.join().unwrap(), 4);
        assert_eq!(store.get_state(), 3);
    }

    /// Panics after reducing any negative action.
    struct Boom;

    impl Middleware<i64, i64> for Boom {
        fn attach(&self, _store: Arc<dyn StoreApi<i64, i64>>) -> Result<DispatchLayer<i64>, MiddlewareError> {
            Ok(Box::new(|next: Dispatch<i64>| {
                Arc::new(move |action: i64| {
                    let result = next(action);
                    assert!(action >= 0, "negative action");
                    result
                }) as Dispatch<i64>
            }))
        }
    }

    #[test]
    fn test_attach_error_aborts_store_construction() {
        let res = Store::with_middleware(counter, 0, vec![Arc::new(Refuse)]);
        assert!(matches!(res, Err(MiddlewareError::AlreadyAttached)));
    }
}
