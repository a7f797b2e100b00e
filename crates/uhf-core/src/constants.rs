//! Reader-level constants.
//!
//! Power bounds, trigger key codes and the defaults used by the reader
//! configuration live here so the driver boundary, the core and the
//! application bridge all agree on them.
//!
//! # Usage
//!
//! ```
//! use uhf_core::constants::*;
//!
//! fn power_in_range(power: u8) -> bool {
//!     (MIN_POWER..=MAX_POWER).contains(&power)
//! }
//!
//! assert!(power_in_range(20));
//! assert!(!power_in_range(35));
//! ```

// ============================================================================
// Radio Power
// ============================================================================

/// Lowest accepted output power level (dBm).
pub const MIN_POWER: u8 = 5;

/// Highest accepted output power level (dBm).
pub const MAX_POWER: u8 = 30;

/// Power level used by the mock driver before anyone configures it.
pub const DEFAULT_POWER: u8 = 20;

// ============================================================================
// Trigger Keys
// ============================================================================

/// Key codes observed for the physical trigger on supported handhelds.
///
/// The trigger state machine treats every key code generically; this list
/// only drives human-readable key names.
///
/// ```
/// use uhf_core::constants::TRIGGER_KEY_CODES;
///
/// assert!(TRIGGER_KEY_CODES.contains(&293));
/// ```
pub const TRIGGER_KEY_CODES: [u16; 3] = [139, 280, 293];

/// Key code injected by `simulate_key_press` when the caller gives none.
pub const DEFAULT_SIMULATED_KEY_CODE: u16 = 293;

// ============================================================================
// Inventory
// ============================================================================

/// Default bound of the inventory buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Default capacity of the notification broadcast channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// Timeouts
// ============================================================================

/// Default trigger auto-reset timeout in milliseconds.
///
/// A key held longer than this without a release is forced back to idle.
pub const DEFAULT_AUTO_RESET_TIMEOUT_MS: u64 = 5_000;

/// Default period of the auto-reset watchdog in milliseconds.
pub const DEFAULT_KEY_CHECK_INTERVAL_MS: u64 = 250;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_bounds_are_ordered() {
        assert!(MIN_POWER < MAX_POWER);
        assert!((MIN_POWER..=MAX_POWER).contains(&DEFAULT_POWER));
    }

    #[test]
    fn test_default_simulated_key_is_a_trigger() {
        assert!(TRIGGER_KEY_CODES.contains(&DEFAULT_SIMULATED_KEY_CODE));
    }

    #[test]
    fn test_watchdog_runs_faster_than_timeout() {
        assert!(DEFAULT_KEY_CHECK_INTERVAL_MS < DEFAULT_AUTO_RESET_TIMEOUT_MS);
    }
}
