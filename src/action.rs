//! # Action contract.
//!
//! An [`Action`] is an immutable record describing an intent or event. Every
//! action carries a `type` discriminant ([`Action::action_type`]) used for
//! filtering (see [`of_type`](crate::of_type)) and for labelling logs.
//!
//! ## Example
//! ```rust
//! use epicflow::Action;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Msg {
//!     Ping,
//!     Pong { seq: u32 },
//! }
//!
//! impl Action for Msg {
//!     fn action_type(&self) -> &str {
//!         match self {
//!             Msg::Ping => "PING",
//!             Msg::Pong { .. } => "PONG",
//!         }
//!     }
//! }
//!
//! assert_eq!(Msg::Pong { seq: 1 }.action_type(), "PONG");
//! ```

/// Dispatchable action with a `type` discriminant.
///
/// Actions are cloned once per subscriber of the action channel, so keep them
/// cheap to clone (wrap large payloads in `Arc`).
pub trait Action: Clone + Send + Sync + 'static {
    /// Returns the discriminant of this action.
    fn action_type(&self) -> &str;

    /// True if the action's type is one of `keys`.
    #[inline]
    fn is_one_of<K: AsRef<str>>(&self, keys: &[K]) -> bool {
        let ty = self.action_type();
        keys.iter().any(|k| k.as_ref() == ty)
    }
}
