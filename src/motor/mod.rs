//! # Motor Module
//!
//! Arms the four ESCs and maps thrust fractions onto their PWM duty cycle.
//!
//! This module handles:
//! - Thrust/duty mapping and calibration ([`thrust`])
//! - The PWM output contract and adapters ([`actuator`])
//! - Per-motor arming state and fail-open thrust commands ([`MotorController`])
//!
//! A motor is armed by holding its ESC at the arming duty. Every thrust
//! command arms first, so callers never have to sequence arming themselves.

pub mod actuator;
pub mod thrust;

use tracing::{debug, info};

use crate::error::{HalError, Result};
use crate::fault::{FaultLog, FaultSource};
use actuator::DutyCycleOutput;
use thrust::ThrustCalibration;

/// Motors on the airframe
pub const MOTOR_COUNT: usize = 4;

/// PWM channel of each motor, in motor order
pub const DEFAULT_CHANNELS: [u8; MOTOR_COUNT] = [0, 1, 2, 3];

/// State of one motor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motor {
    pub channel: u8,
    pub armed: bool,
    /// Last duty successfully written
    pub commanded_duty: Option<f64>,
}

impl Motor {
    fn new(channel: u8) -> Self {
        Self {
            channel,
            armed: false,
            commanded_duty: None,
        }
    }
}

/// Arming and thrust control for the four motors.
///
/// # Examples
///
/// ```
/// use flight_hal::motor::actuator::{PwmActuator, SimulatedPwmChannel};
/// use flight_hal::motor::thrust::ThrustCalibration;
/// use flight_hal::motor::MotorController;
///
/// let pwm = PwmActuator::new(vec![SimulatedPwmChannel::default(); 4]);
/// let mut motors = MotorController::new(pwm, ThrustCalibration::default());
///
/// motors.set_thrust(0, 0.5);
/// assert!(motors.is_armed(0));
/// assert!((motors.thrust_fraction(0) - 0.5).abs() < 0.001);
/// ```
#[derive(Debug)]
pub struct MotorController<O> {
    output: O,
    calibration: ThrustCalibration,
    motors: [Motor; MOTOR_COUNT],
    faults: FaultLog,
}

impl<O: DutyCycleOutput> MotorController<O> {
    /// Create a controller on the default channels
    pub fn new(output: O, calibration: ThrustCalibration) -> Self {
        Self::with_channels(output, calibration, DEFAULT_CHANNELS)
    }

    pub fn with_channels(output: O, calibration: ThrustCalibration, channels: [u8; MOTOR_COUNT]) -> Self {
        Self {
            output,
            calibration,
            motors: channels.map(Motor::new),
            faults: FaultLog::default(),
        }
    }

    pub fn calibration(&self) -> &ThrustCalibration {
        &self.calibration
    }

    pub fn motors(&self) -> &[Motor; MOTOR_COUNT] {
        &self.motors
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Faults recorded by fail-open operations
    pub fn faults(&self) -> &FaultLog {
        &self.faults
    }

    /// Whether `motor` is armed; false for an invalid index
    #[must_use]
    pub fn is_armed(&self, motor: usize) -> bool {
        self.motors.get(motor).is_some_and(|m| m.armed)
    }

    fn motor_mut(&mut self, motor: usize) -> Result<&mut Motor> {
        self.motors.get_mut(motor).ok_or(HalError::InvalidMotor(motor))
    }

    fn write_duty(&mut self, motor: usize, duty: f64) -> Result<()> {
        let channel = self.motor_mut(motor)?.channel;
        self.output.set_duty_fraction(channel, duty)?;
        self.motor_mut(motor)?.commanded_duty = Some(duty);
        Ok(())
    }

    /// Arm `motor` if it is not armed already.
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidMotor` for an index outside 0-3, or the
    /// actuator error, in which case the motor stays unarmed.
    pub fn try_arm(&mut self, motor: usize) -> Result<()> {
        if self.motor_mut(motor)?.armed {
            return Ok(());
        }

        self.write_duty(motor, self.calibration.arming_duty())?;
        self.motor_mut(motor)?.armed = true;
        info!("Motor {} armed", motor);
        Ok(())
    }

    /// Fail-open arm; returns whether the motor is armed afterwards
    pub fn arm(&mut self, motor: usize) -> bool {
        if let Err(e) = self.try_arm(motor) {
            self.faults.record(FaultSource::Motor(motor), &e);
        }
        self.is_armed(motor)
    }

    /// Arm every motor, fail-open
    pub fn arm_all(&mut self) -> bool {
        (0..MOTOR_COUNT).fold(true, |all, motor| self.arm(motor) && all)
    }

    /// Command a thrust fraction, arming first.
    ///
    /// Fractions outside [0, 1] are clamped. Zero thrust holds the arming
    /// duty.
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidThrust` for non-finite fractions (nothing is
    /// written), `HalError::InvalidMotor` for a bad index, or the actuator
    /// error of the arming or thrust write.
    pub fn try_set_thrust(&mut self, motor: usize, fraction: f64) -> Result<()> {
        let duty = self.calibration.duty_for(fraction)?;
        self.try_arm(motor)?;
        self.write_duty(motor, duty)?;
        debug!("Motor {} thrust {:.3} (duty {:.4})", motor, fraction, duty);
        Ok(())
    }

    /// Fail-open thrust command; a failure leaves the previous output in place
    pub fn set_thrust(&mut self, motor: usize, fraction: f64) {
        if let Err(e) = self.try_set_thrust(motor, fraction) {
            self.faults.record(FaultSource::Motor(motor), &e);
        }
    }

    /// Command the same thrust on every motor, fail-open
    pub fn set_all_thrust(&mut self, fraction: f64) {
        for motor in 0..MOTOR_COUNT {
            self.set_thrust(motor, fraction);
        }
    }

    /// Read the thrust fraction currently applied to `motor`.
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidMotor` for a bad index or the actuator's
    /// read error.
    pub fn try_thrust_fraction(&mut self, motor: usize) -> Result<f64> {
        let channel = self.motor_mut(motor)?.channel;
        let duty = self.output.duty_fraction(channel)?;
        Ok(self.calibration.fraction_for(duty))
    }

    /// Fail-open thrust read-back.
    ///
    /// On a read failure the last commanded duty (or 0) is used instead.
    pub fn thrust_fraction(&mut self, motor: usize) -> f64 {
        match self.try_thrust_fraction(motor) {
            Ok(fraction) => fraction,
            Err(e) => {
                self.faults.record(FaultSource::Motor(motor), &e);
                let duty = self
                    .motors
                    .get(motor)
                    .and_then(|m| m.commanded_duty)
                    .unwrap_or(0.0);
                self.calibration.fraction_for(duty)
            }
        }
    }
}
