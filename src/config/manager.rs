//! # Global manager configuration.
//!
//! Provides [`ManagerConfig`] centralized settings for the plugin manager runtime.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → logical CPUs + 2
//! - `timeout = 0s` → no default probe timeout
//! - `grace = 0s` → signal-driven shutdown waits indefinitely

use std::time::Duration;

use crate::core::ConcurrencyGate;

/// Global configuration for the plugin manager.
///
/// ## Field semantics
/// - `max_concurrent`: Gate capacity (`0` = logical CPUs + 2)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `timeout`: Default per-probe timeout used when a plugin has no `Timeout` (`0s` = none)
/// - `grace`: Maximum wait in [`run_until_signal`](crate::PluginManager::run_until_signal) (`0s` = unbounded)
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Maximum number of probes executing at once across all plugins.
    pub max_concurrent: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Default probe timeout.
    pub timeout: Duration,

    /// Grace period for signal-driven shutdown.
    pub grace: Duration,
}

impl ManagerConfig {
    /// Returns the effective gate capacity.
    #[inline]
    pub fn concurrency_limit(&self) -> usize {
        if self.max_concurrent == 0 {
            ConcurrencyGate::default_capacity()
        } else {
            self.max_concurrent
        }
    }

    /// Returns the default probe timeout as an `Option`.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns the shutdown grace period as an `Option` (`None` = unbounded).
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ManagerConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 0` (logical CPUs + 2)
    /// - `bus_capacity = 1024`
    /// - `timeout = 0s` (no default timeout)
    /// - `grace = 60s`
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            bus_capacity: 1024,
            timeout: Duration::ZERO,
            grace: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sentinels() {
        let cfg = ManagerConfig::default();
        assert_eq!(cfg.concurrency_limit(), num_cpus::get() + 2);
        assert_eq!(cfg.default_timeout(), None);
        assert_eq!(cfg.grace_limit(), Some(Duration::from_secs(60)));

        let cfg = ManagerConfig {
            max_concurrent: 3,
            bus_capacity: 0,
            timeout: Duration::from_secs(5),
            grace: Duration::ZERO,
        };
        assert_eq!(cfg.concurrency_limit(), 3);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.default_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.grace_limit(), None);
    }
}
