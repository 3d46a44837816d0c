//! # Host store boundary.
//!
//! The three-layer middleware signature:
//!
//! ```text
//! Middleware::attach(store api) ──► DispatchLayer
//! DispatchLayer(next: Dispatch) ──► Dispatch
//! Dispatch(action)             ──► result of the downstream stages
//! ```
//!
//! `StoreApi` is the `{ get_state, dispatch }` view a middleware receives.
//! `dispatch` on it always enters the *top* of the chain, so actions emitted by
//! epics pass through every middleware again.

use std::sync::Arc;

use crate::error::MiddlewareError;

/// One dispatch stage: processes an action and returns the downstream result.
pub type Dispatch<A> = Arc<dyn Fn(A) -> A + Send + Sync>;

/// Wraps the next dispatch stage.
pub type DispatchLayer<A> = Box<dyn FnOnce(Dispatch<A>) -> Dispatch<A> + Send>;

/// Store access handed to middleware on attachment.
pub trait StoreApi<A, S>: Send + Sync {
    /// Returns the current state.
    fn get_state(&self) -> S;

    /// Dispatches through the full middleware chain.
    fn dispatch(&self, action: A) -> A;
}

/// Store middleware.
pub trait Middleware<A, S>: Send + Sync {
    /// Attaches to a store and returns the layer wrapping the next stage.
    ///
    /// Called exactly once per store while the store is being built.
    fn attach(&self, store: Arc<dyn StoreApi<A, S>>) -> Result<DispatchLayer<A>, MiddlewareError>;
}
