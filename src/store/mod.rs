//! Host store boundary and a minimal in-process store.
//!
//! - [`StoreApi`], [`Middleware`], [`Dispatch`], [`DispatchLayer`]: the middleware contract
//! - [`Store`], [`Reducer`]: a small host used by demos and tests

mod api;
mod host;

pub use api::{Dispatch, DispatchLayer, Middleware, StoreApi};
pub use host::{Reducer, Store};
