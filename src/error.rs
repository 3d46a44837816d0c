//! Error types used by the middleware and by epics.
//!
//! This module defines two main error enums:
//!
//! - [`MiddlewareError`] - configuration and lifecycle errors raised by the middleware itself.
//! - [`EpicError`] - errors raised while building or running an epic's output stream.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::borrow::Cow;

use thiserror::Error;

/// # Errors produced by the epic middleware.
///
/// All variants are returned synchronously at the call site (`attach`, `run`,
/// deprecated `dispatch` passthrough); none of them is retried.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MiddlewareError {
    /// `run` was called before the middleware was attached to a store.
    #[error("run() called before the middleware was attached to a store")]
    NotAttached,

    /// The middleware instance was attached to a second store.
    #[error("middleware is already attached to a store")]
    AlreadyAttached,

    /// Attachment happened outside of a tokio runtime; epics cannot be driven.
    #[error("no tokio runtime available to drive epics")]
    NoRuntime,

    /// The store behind a handle has been dropped.
    #[error("store has been dropped")]
    Detached,

    /// The root epic failed while building its output stream.
    #[error("epic '{epic}' failed to start: {source}")]
    EpicConstruction {
        /// Name of the epic that failed.
        epic: String,
        /// The construction error reported by the epic.
        #[source]
        source: EpicError,
    },
}

impl MiddlewareError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use epicflow::MiddlewareError;
    ///
    /// assert_eq!(MiddlewareError::NotAttached.as_label(), "middleware_not_attached");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            MiddlewareError::NotAttached => "middleware_not_attached",
            MiddlewareError::AlreadyAttached => "middleware_already_attached",
            MiddlewareError::NoRuntime => "middleware_no_runtime",
            MiddlewareError::Detached => "middleware_detached",
            MiddlewareError::EpicConstruction { .. } => "middleware_epic_construction",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            MiddlewareError::EpicConstruction { epic, source } => {
                format!("epic={epic} {}", source.as_message())
            }
            other => other.to_string(),
        }
    }
}

/// # Errors produced by epics.
///
/// `Construction` is returned from [`Epic::run`](crate::Epic::run) when the
/// output stream cannot be built. `Stream` is yielded as an `Err` item from a
/// running output stream and terminates that epic's subscription.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EpicError {
    /// The epic could not build its output stream.
    #[error("construction failed: {reason}")]
    Construction {
        /// The underlying error message.
        reason: Cow<'static, str>,
    },

    /// The running output stream failed.
    #[error("stream failed: {reason}")]
    Stream {
        /// The underlying error message.
        reason: Cow<'static, str>,
    },

    /// The epic panicked while building or polling its output stream.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl EpicError {
    /// Shorthand for a construction failure.
    pub fn construction(reason: impl Into<Cow<'static, str>>) -> Self {
        EpicError::Construction {
            reason: reason.into(),
        }
    }

    /// Shorthand for a runtime stream failure.
    ///
    /// # Example
    /// ```
    /// use epicflow::EpicError;
    ///
    /// let err = EpicError::stream("upstream closed");
    /// assert_eq!(err.as_label(), "epic_stream");
    /// ```
    pub fn stream(reason: impl Into<Cow<'static, str>>) -> Self {
        EpicError::Stream {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EpicError::Construction { .. } => "epic_construction",
            EpicError::Stream { .. } => "epic_stream",
            EpicError::Panicked { .. } => "epic_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EpicError::Construction { reason } => format!("construction: {reason}"),
            EpicError::Stream { reason } => format!("stream: {reason}"),
            EpicError::Panicked { info } => format!("panic: {info}"),
        }
    }

    /// Prefixes the error text with the name of the epic it came from.
    pub(crate) fn within(self, epic: &str) -> Self {
        match self {
            EpicError::Construction { reason } => EpicError::construction(format!("{epic}: {reason}")),
            EpicError::Stream { reason } => EpicError::stream(format!("{epic}: {reason}")),
            EpicError::Panicked { info } => EpicError::Panicked {
                info: format!("{epic}: {info}"),
            },
        }
    }

    /// Renders a panic payload caught with `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        EpicError::Panicked { info }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(MiddlewareError::AlreadyAttached.as_label(), "middleware_already_attached");
        assert_eq!(MiddlewareError::NoRuntime.as_label(), "middleware_no_runtime");
        assert_eq!(EpicError::construction("x").as_label(), "epic_construction");
        assert_eq!(EpicError::Panicked { info: "x".into() }.as_label(), "epic_panicked");
    }

    #[test]
    fn test_construction_message_names_epic() {
        let err = MiddlewareError::EpicConstruction {
            epic: "root".into(),
            source: EpicError::construction("missing dependency"),
        };
        assert_eq!(err.as_message(), "epic=root construction: missing dependency");
        assert_eq!(
            err.to_string(),
            "epic 'root' failed to start: construction failed: missing dependency"
        );
    }

    #[test]
    fn test_within_prefixes_epic_name() {
        let e = EpicError::construction("no db").within("loader");
        assert_eq!(e, EpicError::construction("loader: no db"));
    }

    #[test]
    fn test_from_panic_payloads() {
        let e = EpicError::from_panic(Box::new("static boom"));
        assert_eq!(e, EpicError::Panicked { info: "static boom".into() });

        let e = EpicError::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(e, EpicError::Panicked { info: "owned boom".into() });

        let e = EpicError::from_panic(Box::new(42_u8));
        assert_eq!(e, EpicError::Panicked { info: "unknown panic".into() });
    }
}
