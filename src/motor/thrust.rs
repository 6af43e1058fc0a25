//! # Thrust Mapping
//!
//! Linear map between a thrust fraction in [0, 1] and an ESC duty cycle.
//!
//! ```text
//! duty = fraction * (maximum - minimum) + minimum     (fraction > 0)
//! duty = arming                                        (fraction == 0)
//! ```
//!
//! The arming duty sits below the minimum so a motor at zero thrust is
//! armed but not spinning.

use crate::error::{HalError, Result};

/// Duty cycle that arms the ESC without spinning the motor
pub const DEFAULT_ARMING_DUTY: f64 = 0.2;

/// Duty cycle at the lowest spinning thrust
pub const DEFAULT_MINIMUM_DUTY: f64 = 0.84;

/// Duty cycle at full thrust
pub const DEFAULT_MAXIMUM_DUTY: f64 = 0.9999;

/// ESC duty-cycle constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrustCalibration {
    arming_duty: f64,
    minimum_duty: f64,
    maximum_duty: f64,
}

impl Default for ThrustCalibration {
    fn default() -> Self {
        Self {
            arming_duty: DEFAULT_ARMING_DUTY,
            minimum_duty: DEFAULT_MINIMUM_DUTY,
            maximum_duty: DEFAULT_MAXIMUM_DUTY,
        }
    }
}

impl ThrustCalibration {
    /// Create a calibration
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidThrustCalibration` unless every duty is a
    /// finite value in [0, 1] and `arming < minimum < maximum`.
    ///
    /// # Examples
    ///
    /// ```
    /// use flight_hal::motor::thrust::ThrustCalibration;
    ///
    /// assert!(ThrustCalibration::new(0.2, 0.84, 0.9999).is_ok());
    /// assert!(ThrustCalibration::new(0.9, 0.84, 0.9999).is_err());
    /// ```
    pub fn new(arming_duty: f64, minimum_duty: f64, maximum_duty: f64) -> Result<Self> {
        for (name, duty) in [
            ("arming_duty", arming_duty),
            ("minimum_duty", minimum_duty),
            ("maximum_duty", maximum_duty),
        ] {
            if !duty.is_finite() || !(0.0..=1.0).contains(&duty) {
                return Err(HalError::InvalidThrustCalibration(format!(
                    "{} {} must be between 0.0 and 1.0",
                    name, duty
                )));
            }
        }

        if arming_duty >= minimum_duty || minimum_duty >= maximum_duty {
            return Err(HalError::InvalidThrustCalibration(format!(
                "duties must satisfy arming < minimum < maximum (got {} / {} / {})",
                arming_duty, minimum_duty, maximum_duty
            )));
        }

        Ok(Self {
            arming_duty,
            minimum_duty,
            maximum_duty,
        })
    }

    #[must_use]
    pub fn arming_duty(&self) -> f64 {
        self.arming_duty
    }

    #[must_use]
    pub fn minimum_duty(&self) -> f64 {
        self.minimum_duty
    }

    #[must_use]
    pub fn maximum_duty(&self) -> f64 {
        self.maximum_duty
    }

    fn range(&self) -> f64 {
        self.maximum_duty - self.minimum_duty
    }

    /// Duty cycle for a thrust fraction, clamping into [0, 1]
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidThrust` for NaN or infinite fractions.
    pub fn duty_for(&self, fraction: f64) -> Result<f64> {
        if !fraction.is_finite() {
            return Err(HalError::InvalidThrust(fraction));
        }

        let fraction = fraction.clamp(0.0, 1.0);
        if fraction == 0.0 {
            return Ok(self.arming_duty);
        }

        Ok(fraction * self.range() + self.minimum_duty)
    }

    /// Thrust fraction for a duty cycle; duties below the minimum read as 0
    #[must_use]
    pub fn fraction_for(&self, duty: f64) -> f64 {
        ((duty - self.minimum_duty) / self.range()).max(0.0)
    }
}
