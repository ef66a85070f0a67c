//! Stream connection configuration.
//!
//! The only externally tunable parameters of the real-time layer: endpoint
//! URL, reconnect floor/ceiling, backoff factor, and keepalive interval.

use std::time::Duration;

use super::error::WsError;

/// Default stream endpoint.
pub const DEFAULT_STREAM_URL: &str = "ws://localhost:8000/api/v1/ws/app";

/// Default keepalive ping interval in seconds.
pub const DEFAULT_KEEPALIVE_SECS: u64 = 25;

/// Default floor for the reconnect delay, in seconds.
pub const DEFAULT_RECONNECT_FLOOR_SECS: u64 = 3;

/// Default ceiling for the reconnect delay, in seconds.
pub const DEFAULT_RECONNECT_CEILING_SECS: u64 = 30;

/// Default multiplicative backoff factor.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.5;

/// Stream connection configuration.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Stream endpoint URL.
    pub url: String,

    /// Keepalive ping interval.
    pub keepalive_interval: Duration,

    /// Initial reconnect delay.
    pub reconnect_floor: Duration,

    /// Maximum reconnect delay.
    pub reconnect_ceiling: Duration,

    /// Multiplicative growth factor applied after each failed attempt.
    pub backoff_factor: f64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            keepalive_interval: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            reconnect_floor: Duration::from_secs(DEFAULT_RECONNECT_FLOOR_SECS),
            reconnect_ceiling: Duration::from_secs(DEFAULT_RECONNECT_CEILING_SECS),
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl WsConfig {
    /// Creates a new configuration with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the keepalive interval.
    #[must_use]
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Sets the initial reconnect delay.
    #[must_use]
    pub fn with_reconnect_floor(mut self, delay: Duration) -> Self {
        self.reconnect_floor = delay;
        self
    }

    /// Sets the maximum reconnect delay.
    #[must_use]
    pub fn with_reconnect_ceiling(mut self, delay: Duration) -> Self {
        self.reconnect_ceiling = delay;
        self
    }

    /// Sets the backoff growth factor.
    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Returns the delay that follows `current`, capped at the ceiling.
    #[must_use]
    pub fn grow_backoff(&self, current: Duration) -> Duration {
        current
            .mul_f64(self.backoff_factor)
            .min(self.reconnect_ceiling)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or backoff parameters are invalid.
    pub fn validate(&self) -> Result<(), WsError> {
        if self.url.is_empty() {
            return Err(WsError::InvalidConfig("url cannot be empty".to_string()));
        }

        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(WsError::InvalidConfig(
                "url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.reconnect_floor > self.reconnect_ceiling {
            return Err(WsError::InvalidConfig(
                "reconnect_floor must not exceed reconnect_ceiling".to_string(),
            ));
        }

        if self.backoff_factor < 1.0 {
            return Err(WsError::InvalidConfig(
                "backoff_factor must be at least 1.0".to_string(),
            ));
        }

        Ok(())
    }
}
