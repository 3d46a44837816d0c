//! # Middleware configuration.
//!
//! Provides [`MiddlewareConfig`], the per-instance settings of an
//! [`EpicMiddleware`](crate::EpicMiddleware).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by the bus

use std::borrow::Cow;

/// Configuration for one middleware instance.
///
/// ## Field semantics
/// - `name`: label used in lifecycle events and log lines
/// - `bus_capacity`: lifecycle event ring buffer size (min 1)
///
/// The action channel is unbounded and not configurable: losing an action
/// would break the delivery guarantees epics rely on.
#[derive(Clone, Debug)]
pub struct MiddlewareConfig {
    /// Name reported in `MiddlewareAttached` events and log lines.
    pub name: Cow<'static, str>,

    /// Capacity of the lifecycle event broadcast channel.
    ///
    /// Receivers (subscriber listener, [`events`](crate::EpicMiddleware::events))
    /// that fall behind by more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,
}

impl MiddlewareConfig {
    /// Returns a config with the given name and default capacity.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for MiddlewareConfig {
    /// Default configuration:
    ///
    /// - `name = "epic-middleware"`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("epic-middleware"),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamp() {
        let mut cfg = MiddlewareConfig::named("shop");
        assert_eq!(cfg.name, "shop");
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
