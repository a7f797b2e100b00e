use thiserror::Error;

/// Failure taxonomy shared by every reader operation.
///
/// An empty inventory buffer is not an error; it is reported as `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller supplied a value outside the accepted domain
    /// (power out of range, empty or duplicate target list, malformed EPC).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation precondition not met (not initialized, not running, freed).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The radio driver failed. Surfaced as-is, never retried here.
    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),
}

impl Error {
    /// Create a new invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a new invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create a new hardware unavailable error.
    pub fn hardware_unavailable(message: impl Into<String>) -> Self {
        Self::HardwareUnavailable(message.into())
    }

    /// Short machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidState(_) => "invalid_state",
            Self::HardwareUnavailable(_) => "hardware_unavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
