//! Session tuning parsed from environment variables.
//!
//! Every knob has a default in [`crate::consts`]; unset or unparseable
//! variables fall back to it silently.

use std::time::Duration;

use crate::consts::{CHANNEL_CAPACITY, EMIT_INTERVAL_MS, REACTION_TTL_MS, SWEEP_INTERVAL_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Reaction emission tick period.
    pub emit_interval: Duration,
    /// Reaction sweep tick period.
    pub sweep_interval: Duration,
    /// Reaction time-to-live in milliseconds.
    pub reaction_ttl_ms: i64,
    /// Capacity of the per-participant inbound frame queue.
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            emit_interval: Duration::from_millis(EMIT_INTERVAL_MS),
            sweep_interval: Duration::from_millis(SWEEP_INTERVAL_MS),
            reaction_ttl_ms: REACTION_TTL_MS,
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `LIVECANVAS_EMIT_INTERVAL_MS`: default 100
    /// - `LIVECANVAS_SWEEP_INTERVAL_MS`: default 1000
    /// - `LIVECANVAS_REACTION_TTL_MS`: default 4000
    /// - `LIVECANVAS_CHANNEL_CAPACITY`: default 256
    ///
    /// Zero and negative values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            emit_interval: Duration::from_millis(positive(
                env_parse("LIVECANVAS_EMIT_INTERVAL_MS", EMIT_INTERVAL_MS),
                EMIT_INTERVAL_MS,
            )),
            sweep_interval: Duration::from_millis(positive(
                env_parse("LIVECANVAS_SWEEP_INTERVAL_MS", SWEEP_INTERVAL_MS),
                SWEEP_INTERVAL_MS,
            )),
            reaction_ttl_ms: positive(env_parse("LIVECANVAS_REACTION_TTL_MS", REACTION_TTL_MS), REACTION_TTL_MS),
            channel_capacity: positive(env_parse("LIVECANVAS_CHANNEL_CAPACITY", CHANNEL_CAPACITY), CHANNEL_CAPACITY),
        }
    }
}

/// Parse `key` from the environment, falling back to `default`.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

// tokio intervals and channels reject zero; a TTL of zero or less would
// sweep every reaction on the next tick.
fn positive<T>(value: T, default: T) -> T
where
    T: PartialOrd + Default,
{
    if value > T::default() { value } else { default }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
