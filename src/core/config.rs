//! # Streamer configuration.
//!
//! [`StreamerConfig`] centralizes every knob of the residency loop. It is
//! validated once, by [`StreamerBuilder::build`](crate::StreamerBuilder::build);
//! a rejected config means no streamer is ever created.
//!
//! ## Sentinel values
//! - `startup_delay = 0s` → first tick fires immediately on `start()`
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::error::SetupError;

/// Configuration for the residency loop.
///
/// ## Field semantics
/// - `load_distance`: a location closer than this becomes load-eligible
/// - `unload_distance`: a resident location farther than this is unloaded;
///   must be strictly greater than `load_distance` (hysteresis band)
/// - `max_loaded`: memory budget, maximum resident locations
/// - `tick_interval`: period of the decision loop (`> 0`)
/// - `startup_delay`: wait before the first tick after `start()`
/// - `grace`: how long `shutdown()` waits for outstanding transitions
/// - `bus_capacity`: event bus ring size
#[derive(Clone, Debug)]
pub struct StreamerConfig {
    /// Load threshold, in world units.
    pub load_distance: f32,

    /// Unload threshold, in world units.
    ///
    /// The band between `load_distance` and this value never triggers
    /// anything, so a location sitting near one threshold cannot flap.
    pub unload_distance: f32,

    /// Maximum number of resident locations.
    ///
    /// Locations mid-load or mid-unload occupy a slot until their transition
    /// completes. `0` disables loading entirely.
    pub max_loaded: usize,

    /// Period of the decision loop.
    ///
    /// A tick acts on distances at most one interval stale; shorter intervals
    /// react faster at the cost of more evaluations.
    pub tick_interval: Duration,

    /// Delay between `start()` and the first tick (`0s` = none).
    pub startup_delay: Duration,

    /// Maximum wait for outstanding transitions during `shutdown()`.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging more than this observe `Lagged` and skip events.
    pub bus_capacity: usize,
}

impl StreamerConfig {
    /// Checks the invariants the residency policy relies on.
    ///
    /// # Errors
    /// [`SetupError::InvalidConfiguration`] when a distance is negative or not
    /// finite, when `unload_distance <= load_distance`, or when
    /// `tick_interval` is zero.
    pub fn validate(&self) -> Result<(), SetupError> {
        let invalid = |reason: String| Err(SetupError::InvalidConfiguration { reason });

        if !self.load_distance.is_finite() || self.load_distance < 0.0 {
            return invalid(format!(
                "load_distance must be finite and >= 0, got {}",
                self.load_distance
            ));
        }
        if !self.unload_distance.is_finite() {
            return invalid(format!(
                "unload_distance must be finite, got {}",
                self.unload_distance
            ));
        }
        if self.unload_distance <= self.load_distance {
            return invalid(format!(
                "unload_distance ({}) must be greater than load_distance ({})",
                self.unload_distance, self.load_distance
            ));
        }
        if self.tick_interval.is_zero() {
            return invalid("tick_interval must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Returns the startup delay as an `Option`.
    ///
    /// - `None` → tick immediately
    /// - `Some(d)` → wait `d` first
    #[inline]
    pub fn startup_delay_opt(&self) -> Option<Duration> {
        if self.startup_delay.is_zero() {
            None
        } else {
            Some(self.startup_delay)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for StreamerConfig {
    /// Default configuration:
    ///
    /// - `load_distance = 200`, `unload_distance = 300`
    /// - `max_loaded = 3`
    /// - `tick_interval = 2s` (residency does not need per-frame evaluation)
    /// - `startup_delay = 1s` (lets the host finish spawning the observer)
    /// - `grace = 10s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            load_distance: 200.0,
            unload_distance: 300.0,
            max_loaded: 3,
            tick_interval: Duration::from_secs(2),
            startup_delay: Duration::from_secs(1),
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        StreamerConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_collapsed_hysteresis_band() {
        let cfg = StreamerConfig {
            load_distance: 300.0,
            unload_distance: 300.0,
            ..StreamerConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.as_label(), "setup_invalid_configuration");
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let cfg = StreamerConfig {
            load_distance: 300.0,
            unload_distance: 200.0,
            ..StreamerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_interval_and_nan() {
        let zero = StreamerConfig {
            tick_interval: Duration::ZERO,
            ..StreamerConfig::default()
        };
        assert!(zero.validate().is_err());

        let nan = StreamerConfig {
            load_distance: f32::NAN,
            ..StreamerConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn zero_capacity_and_delay_sentinels() {
        let cfg = StreamerConfig {
            max_loaded: 0,
            startup_delay: Duration::ZERO,
            bus_capacity: 0,
            ..StreamerConfig::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.startup_delay_opt(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
