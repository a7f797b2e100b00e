use serde::Deserialize;
use std::time::Duration;
use uhf_core::constants::{
    DEFAULT_AUTO_RESET_TIMEOUT_MS, DEFAULT_BUFFER_CAPACITY, DEFAULT_EVENT_CHANNEL_CAPACITY,
    DEFAULT_KEY_CHECK_INTERVAL_MS,
};
use uhf_core::{Error, PowerLevel, Result};

/// What the inventory buffer does when a read arrives at full capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the oldest buffered read to make room.
    #[default]
    EvictOldest,

    /// Keep the buffer as-is and drop the incoming read.
    RejectNew,
}

/// Reader session configuration.
///
/// Deserializable from the host application's settings; missing fields take
/// their defaults.
///
/// ```
/// use uhf_reader::{OverflowPolicy, ReaderConfig};
///
/// let config = ReaderConfig::default()
///     .buffer_capacity(64)
///     .overflow_policy(OverflowPolicy::RejectNew);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Maximum number of buffered reads.
    pub buffer_capacity: usize,

    /// Behaviour when the buffer is full.
    pub overflow_policy: OverflowPolicy,

    /// How long a trigger may stay pressed before it is forced back to idle.
    pub auto_reset_timeout_ms: u64,

    /// Period of the auto-reset watchdog.
    pub key_check_interval_ms: u64,

    /// Capacity of the notification broadcast channel.
    pub event_channel_capacity: usize,

    /// Power applied right after a successful `init`.
    pub initial_power: Option<u8>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            auto_reset_timeout_ms: DEFAULT_AUTO_RESET_TIMEOUT_MS,
            key_check_interval_ms: DEFAULT_KEY_CHECK_INTERVAL_MS,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            initial_power: None,
        }
    }
}

impl ReaderConfig {
    /// Set the buffer capacity
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Set the trigger auto-reset timeout
    pub fn auto_reset_timeout(mut self, timeout: Duration) -> Self {
        self.auto_reset_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the watchdog period
    pub fn key_check_interval(mut self, interval: Duration) -> Self {
        self.key_check_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the notification channel capacity
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Set the power applied at init
    pub fn initial_power(mut self, power: u8) -> Self {
        self.initial_power = Some(power);
        self
    }

    pub fn auto_reset_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.auto_reset_timeout_ms)
    }

    pub fn key_check_interval_duration(&self) -> Duration {
        Duration::from_millis(self.key_check_interval_ms)
    }

    /// Check the configuration for values the session cannot run with.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` for a zero capacity, timeout or
    /// interval, or an out-of-range initial power.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(Error::invalid_argument("buffer_capacity must be at least 1"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::invalid_argument(
                "event_channel_capacity must be at least 1",
            ));
        }
        if self.auto_reset_timeout_ms == 0 {
            return Err(Error::invalid_argument(
                "auto_reset_timeout_ms must be greater than zero",
            ));
        }
        if self.key_check_interval_ms == 0 {
            return Err(Error::invalid_argument(
                "key_check_interval_ms must be greater than zero",
            ));
        }
        if let Some(power) = self.initial_power {
            PowerLevel::new(power)?;
        }
        Ok(())
    }
}
