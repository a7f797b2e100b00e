//! Errors reported by a radio driver.
//!
//! The reader core never retries these; each one converts into
//! [`uhf_core::Error::HardwareUnavailable`] with its message intact.

pub type Result<T> = std::result::Result<T, HardwareError>;

/// Failure on the driver side of the boundary.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The radio module or its signal channel is gone.
    #[error("Reader disconnected: {device}")]
    Disconnected { device: String },

    /// A control call was issued before `initialize` or after `free`.
    #[error("Reader not initialized, cannot {operation}")]
    NotInitialized { operation: String },

    /// The vendor SDK reported failure for a call.
    #[error("SDK call {operation} failed: {message}")]
    Sdk { operation: String, message: String },

    /// The module accepted the call but refused the power level.
    #[error("Radio refused power level {power} dBm")]
    PowerRejected { power: u8 },

    /// The SDK did not answer in time.
    #[error("SDK call {operation} timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn not_initialized(operation: impl Into<String>) -> Self {
        Self::NotInitialized {
            operation: operation.into(),
        }
    }

    pub fn sdk(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sdk {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn power_rejected(power: u8) -> Self {
        Self::PowerRejected { power }
    }

    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }
}

impl From<HardwareError> for uhf_core::Error {
    fn from(error: HardwareError) -> Self {
        uhf_core::Error::hardware_unavailable(error.to_string())
    }
}
