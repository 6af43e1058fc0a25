//! # Error Types
//!
//! Custom error types for Flight HAL using `thiserror`.

use thiserror::Error;

/// Main error type for Flight HAL
#[derive(Debug, Error)]
pub enum HalError {
    /// A bus read or write did not complete
    #[error("Bus transaction failed on device 0x{address:02X}: {reason}")]
    BusTransaction { address: u8, reason: String },

    /// Register layout does not describe 1 to 3 whole axes
    #[error("Invalid register read spec: {0}")]
    InvalidReadSpec(String),

    /// Pressure or temperature requested before the coefficient table was read
    #[error("Barometer compensation requested before calibration coefficients were loaded")]
    UncalibratedCompensation,

    /// Compensation chain hit a degenerate step (division by zero)
    #[error("Barometer compensation failed: {0}")]
    Compensation(&'static str),

    /// Motor index outside 0-3
    #[error("Motor index {0} is out of range (must be 0-3)")]
    InvalidMotor(usize),

    /// Thrust command that cannot be mapped to a duty cycle
    #[error("Thrust fraction {0} is not a finite number")]
    InvalidThrust(f64),

    /// Thrust calibration constants that do not form a valid duty range
    #[error("Invalid thrust calibration: {0}")]
    InvalidThrustCalibration(String),

    /// Barometer oversampling setting outside 0-3
    #[error("Oversampling setting {0} is out of range (must be 0-3)")]
    InvalidOversampling(u8),

    /// PWM output errors
    #[error("Actuator error on channel {channel}: {reason}")]
    Actuator { channel: u8, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`HalError`], used when routing faults to a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    BusTransaction,
    InvalidReadSpec,
    UncalibratedCompensation,
    Compensation,
    Actuator,
    InvalidCommand,
    Configuration,
}

impl HalError {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            HalError::BusTransaction { .. } => FaultKind::BusTransaction,
            HalError::InvalidReadSpec(_) => FaultKind::InvalidReadSpec,
            HalError::UncalibratedCompensation => FaultKind::UncalibratedCompensation,
            HalError::Compensation(_) => FaultKind::Compensation,
            HalError::Actuator { .. } => FaultKind::Actuator,
            HalError::InvalidMotor(_) | HalError::InvalidThrust(_) => FaultKind::InvalidCommand,
            HalError::InvalidThrustCalibration(_)
            | HalError::InvalidOversampling(_)
            | HalError::Config(_)
            | HalError::Io(_) => FaultKind::Configuration,
        }
    }
}

/// Result type alias for Flight HAL
pub type Result<T> = std::result::Result<T, HalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_error_message_includes_address() {
        let err = HalError::BusTransaction {
            address: 0x77,
            reason: "NoAcknowledge".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("0x77"), "unexpected message: {}", msg);
        assert!(msg.contains("NoAcknowledge"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            HalError::InvalidReadSpec("5 registers".into()).kind(),
            FaultKind::InvalidReadSpec
        );
        assert_eq!(
            HalError::UncalibratedCompensation.kind(),
            FaultKind::UncalibratedCompensation
        );
        assert_eq!(HalError::InvalidMotor(4).kind(), FaultKind::InvalidCommand);
        assert_eq!(HalError::InvalidThrust(f64::NAN).kind(), FaultKind::InvalidCommand);
        assert_eq!(
            HalError::Actuator { channel: 2, reason: "x".into() }.kind(),
            FaultKind::Actuator
        );
        assert_eq!(HalError::InvalidOversampling(4).kind(), FaultKind::Configuration);
    }
}
