//! # Duty-Cycle Outputs
//!
//! The [`DutyCycleOutput`] contract the motor controller drives, an adapter
//! for `embedded-hal` PWM channels, and a simulated channel for the bench
//! binary and tests.

use std::convert::Infallible;

use embedded_hal::pwm::{Error as _, ErrorType, SetDutyCycle};
use tracing::debug;

use crate::error::{HalError, Result};

/// PWM output addressed by channel number, duty expressed as a fraction.
#[cfg_attr(test, mockall::automock)]
pub trait DutyCycleOutput {
    /// Drive `channel` at `fraction` of full duty.
    ///
    /// # Errors
    ///
    /// Returns `HalError::Actuator` if the channel rejects the value.
    fn set_duty_fraction(&mut self, channel: u8, fraction: f64) -> Result<()>;

    /// Current duty of `channel` as a fraction of full duty.
    ///
    /// # Errors
    ///
    /// Returns `HalError::Actuator` if the duty cannot be determined.
    fn duty_fraction(&mut self, channel: u8) -> Result<f64>;
}

impl<T: DutyCycleOutput + ?Sized> DutyCycleOutput for &mut T {
    fn set_duty_fraction(&mut self, channel: u8, fraction: f64) -> Result<()> {
        (**self).set_duty_fraction(channel, fraction)
    }

    fn duty_fraction(&mut self, channel: u8) -> Result<f64> {
        (**self).duty_fraction(channel)
    }
}

/// Bank of `embedded-hal` PWM channels, indexed by channel number.
///
/// `SetDutyCycle` has no read-back, so the last written raw duty is cached
/// per channel.
#[derive(Debug)]
pub struct PwmActuator<P> {
    channels: Vec<P>,
    written: Vec<Option<u16>>,
}

impl<P: SetDutyCycle> PwmActuator<P> {
    pub fn new(channels: Vec<P>) -> Self {
        let written = vec![None; channels.len()];
        Self { channels, written }
    }

    pub fn channel(&self, channel: u8) -> Option<&P> {
        self.channels.get(usize::from(channel))
    }

    pub fn into_channels(self) -> Vec<P> {
        self.channels
    }
}

fn no_such_channel(channel: u8, available: usize) -> HalError {
    HalError::Actuator {
        channel,
        reason: format!("no such channel ({} available)", available),
    }
}

impl<P: SetDutyCycle> DutyCycleOutput for PwmActuator<P> {
    fn set_duty_fraction(&mut self, channel: u8, fraction: f64) -> Result<()> {
        let available = self.channels.len();
        let pwm = self
            .channels
            .get_mut(usize::from(channel))
            .ok_or_else(|| no_such_channel(channel, available))?;

        let max = pwm.max_duty_cycle();
        let duty = (fraction.clamp(0.0, 1.0) * f64::from(max)).round() as u16;

        pwm.set_duty_cycle(duty).map_err(|e| HalError::Actuator {
            channel,
            reason: format!("{:?}", e.kind()),
        })?;

        self.written[usize::from(channel)] = Some(duty);
        debug!("PWM channel {} duty {}/{}", channel, duty, max);
        Ok(())
    }

    fn duty_fraction(&mut self, channel: u8) -> Result<f64> {
        let index = usize::from(channel);
        let pwm = self
            .channels
            .get(index)
            .ok_or_else(|| no_such_channel(channel, self.channels.len()))?;

        match self.written[index] {
            Some(duty) => Ok(f64::from(duty) / f64::from(pwm.max_duty_cycle())),
            None => Err(HalError::Actuator {
                channel,
                reason: "no duty cycle commanded yet".to_string(),
            }),
        }
    }
}

/// In-memory PWM channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedPwmChannel {
    duty: u16,
    max: u16,
}

impl SimulatedPwmChannel {
    pub fn new(max: u16) -> Self {
        Self { duty: 0, max }
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl Default for SimulatedPwmChannel {
    fn default() -> Self {
        Self::new(u16::MAX)
    }
}

impl ErrorType for SimulatedPwmChannel {
    type Error = Infallible;
}

impl SetDutyCycle for SimulatedPwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(&mut self, duty: u16) -> std::result::Result<(), Self::Error> {
        self.duty = duty.min(self.max);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::pwm::ErrorKind;

    /// Channel that rejects every write
    struct BrokenChannel;

    #[derive(Debug)]
    struct BrokenError;

    impl embedded_hal::pwm::Error for BrokenError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    impl ErrorType for BrokenChannel {
        type Error = BrokenError;
    }

    impl SetDutyCycle for BrokenChannel {
        fn max_duty_cycle(&self) -> u16 {
            1000
        }

        fn set_duty_cycle(&mut self, _duty: u16) -> std::result::Result<(), Self::Error> {
            Err(BrokenError)
        }
    }

    #[test]
    fn test_fraction_is_quantized_to_max_duty() {
        let mut pwm = PwmActuator::new(vec![SimulatedPwmChannel::new(1000); 4]);
        pwm.set_duty_fraction(2, 0.84).unwrap();

        assert_eq!(pwm.channel(2).unwrap().duty(), 840);
        assert_eq!(pwm.duty_fraction(2).unwrap(), 0.84);
        assert_eq!(pwm.channel(0).unwrap().duty(), 0);
    }

    #[test]
    fn test_fraction_is_clamped() {
        let mut pwm = PwmActuator::new(vec![SimulatedPwmChannel::new(1000)]);
        pwm.set_duty_fraction(0, 1.7).unwrap();
        assert_eq!(pwm.channel(0).unwrap().duty(), 1000);
    }

    #[test]
    fn test_unknown_channel() {
        let mut pwm = PwmActuator::new(vec![SimulatedPwmChannel::default()]);
        assert!(matches!(
            pwm.set_duty_fraction(4, 0.5),
            Err(HalError::Actuator { channel: 4, .. })
        ));
        assert!(pwm.duty_fraction(4).is_err());
    }

    #[test]
    fn test_read_back_before_write_fails() {
        let mut pwm = PwmActuator::new(vec![SimulatedPwmChannel::default()]);
        assert!(pwm.duty_fraction(0).is_err());
    }

    #[test]
    fn test_channel_error_maps_to_actuator_error() {
        let mut pwm = PwmActuator::new(vec![BrokenChannel]);
        match pwm.set_duty_fraction(0, 0.5) {
            Err(HalError::Actuator { channel, reason }) => {
                assert_eq!(channel, 0);
                assert_eq!(reason, "Other");
            }
            other => panic!("Expected Actuator error, got: {:?}", other),
        }
        // Failed write is not cached
        assert!(pwm.duty_fraction(0).is_err());
    }
}
