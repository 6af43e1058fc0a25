//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{HalError, Result};
use crate::motor::thrust::{
    ThrustCalibration, DEFAULT_ARMING_DUTY, DEFAULT_MAXIMUM_DUTY, DEFAULT_MINIMUM_DUTY,
};
use crate::motor::{DEFAULT_CHANNELS, MOTOR_COUNT};
use crate::sensors::barometer::Oversampling;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub thrust: ThrustConfig,
    #[serde(default)]
    pub motors: MotorConfig,
    #[serde(default)]
    pub barometer: BarometerConfig,
    #[serde(default)]
    pub bench: BenchConfig,
}

/// ESC duty-cycle constants
#[derive(Debug, Deserialize, Clone)]
pub struct ThrustConfig {
    #[serde(default = "default_arming_duty")]
    pub arming_duty: f64,

    #[serde(default = "default_minimum_duty")]
    pub minimum_duty: f64,

    #[serde(default = "default_maximum_duty")]
    pub maximum_duty: f64,
}

/// Motor to PWM channel assignment
#[derive(Debug, Deserialize, Clone)]
pub struct MotorConfig {
    #[serde(default = "default_channels")]
    pub channels: Vec<u8>,
}

/// Barometer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BarometerConfig {
    #[serde(default = "default_oversampling")]
    pub oversampling: u8,
}

/// Bench run configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BenchConfig {
    #[serde(default = "default_samples")]
    pub samples: u32,

    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    #[serde(default = "default_spin_up_thrust")]
    pub spin_up_thrust: f64,
}

// Default value functions
fn default_arming_duty() -> f64 { DEFAULT_ARMING_DUTY }
fn default_minimum_duty() -> f64 { DEFAULT_MINIMUM_DUTY }
fn default_maximum_duty() -> f64 { DEFAULT_MAXIMUM_DUTY }

fn default_channels() -> Vec<u8> { DEFAULT_CHANNELS.to_vec() }

fn default_oversampling() -> u8 { Oversampling::default().setting() }

fn default_samples() -> u32 { 5 }
fn default_sample_interval_ms() -> u64 { 100 }
fn default_spin_up_thrust() -> f64 { 0.3 }

impl Default for ThrustConfig {
    fn default() -> Self {
        Self {
            arming_duty: default_arming_duty(),
            minimum_duty: default_minimum_duty(),
            maximum_duty: default_maximum_duty(),
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self { channels: default_channels() }
    }
}

impl Default for BarometerConfig {
    fn default() -> Self {
        Self { oversampling: default_oversampling() }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            sample_interval_ms: default_sample_interval_ms(),
            spin_up_thrust: default_spin_up_thrust(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> HalError {
    HalError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use flight_hal::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns `HalError::Config` if parsing or validation fails.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Thrust constants
        self.thrust_calibration()
            .map_err(|e| invalid(format!("thrust: {}", e)))?;

        // Motor channels
        if self.motors.channels.len() != MOTOR_COUNT {
            return Err(invalid(format!(
                "motors.channels must list exactly {} channels",
                MOTOR_COUNT
            )));
        }

        for (i, channel) in self.motors.channels.iter().enumerate() {
            if self.motors.channels[..i].contains(channel) {
                return Err(invalid(format!("motors.channels: channel {} assigned twice", channel)));
            }
        }

        // Barometer
        Oversampling::try_from(self.barometer.oversampling)
            .map_err(|_| invalid("barometer.oversampling must be between 0 and 3"))?;

        // Bench
        if self.bench.samples == 0 {
            return Err(invalid("bench.samples must be greater than 0"));
        }

        if self.bench.sample_interval_ms == 0 || self.bench.sample_interval_ms > 60000 {
            return Err(invalid("bench.sample_interval_ms must be between 1 and 60000"));
        }

        if !(0.0..=1.0).contains(&self.bench.spin_up_thrust) {
            return Err(invalid("bench.spin_up_thrust must be between 0.0 and 1.0"));
        }

        Ok(())
    }

    /// Thrust calibration described by `[thrust]`
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidThrustCalibration` for an inconsistent set
    /// of duties.
    pub fn thrust_calibration(&self) -> Result<ThrustCalibration> {
        ThrustCalibration::new(
            self.thrust.arming_duty,
            self.thrust.minimum_duty,
            self.thrust.maximum_duty,
        )
    }

    /// Motor channels as a fixed array
    ///
    /// # Errors
    ///
    /// Returns `HalError::Config` if the list does not hold four channels.
    pub fn motor_channels(&self) -> Result<[u8; MOTOR_COUNT]> {
        <[u8; MOTOR_COUNT]>::try_from(self.motors.channels.as_slice())
            .map_err(|_| invalid(format!("motors.channels must list exactly {} channels", MOTOR_COUNT)))
    }

    /// Barometer oversampling described by `[barometer]`
    ///
    /// # Errors
    ///
    /// Returns `HalError::Config` for a setting above 3.
    pub fn oversampling(&self) -> Result<Oversampling> {
        Oversampling::try_from(self.barometer.oversampling)
            .map_err(|e| invalid(format!("barometer.oversampling: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            thrust: ThrustConfig {
                arming_duty: default_arming_duty(),
                minimum_duty: default_minimum_duty(),
                maximum_duty: default_maximum_duty(),
            },
            motors: MotorConfig {
                channels: default_channels(),
            },
            barometer: BarometerConfig {
                oversampling: default_oversampling(),
            },
            bench: BenchConfig {
                samples: default_samples(),
                sample_interval_ms: default_sample_interval_ms(),
                spin_up_thrust: default_spin_up_thrust(),
            },
        }
    }

    #[test]
    fn test_default_config() {
        let config = create_valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.thrust_calibration().unwrap(), ThrustCalibration::default());
        assert_eq!(config.motor_channels().unwrap(), [0, 1, 2, 3]);
        assert_eq!(config.oversampling().unwrap(), Oversampling::UltraHighResolution);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[thrust]
minimum_duty = 0.8

[motors]
channels = [3, 2, 1, 0]

[barometer]
oversampling = 1

[bench]
samples = 2
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.thrust.minimum_duty, 0.8);
        assert_eq!(config.thrust.arming_duty, default_arming_duty());
        assert_eq!(config.motor_channels().unwrap(), [3, 2, 1, 0]);
        assert_eq!(config.oversampling().unwrap(), Oversampling::Standard);
        assert_eq!(config.bench.samples, 2);
        assert_eq!(config.bench.sample_interval_ms, default_sample_interval_ms());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.motors.channels, default_channels());
        assert_eq!(config.bench.spin_up_thrust, default_spin_up_thrust());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load("/nonexistent/flight-hal.toml");
        assert!(matches!(result, Err(HalError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::parse("[thrust\narming_duty = ");
        assert!(matches!(result, Err(HalError::Config(_))));
    }

    #[test]
    fn test_arming_above_minimum() {
        let mut config = create_valid_config();
        config.thrust.arming_duty = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimum_equals_maximum() {
        let mut config = create_valid_config();
        config.thrust.minimum_duty = config.thrust.maximum_duty;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duty_above_one() {
        let mut config = create_valid_config();
        config.thrust.maximum_duty = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wrong_channel_count() {
        let mut config = create_valid_config();
        config.motors.channels = vec![0, 1, 2];
        assert!(config.validate().is_err());
        assert!(config.motor_channels().is_err());
    }

    #[test]
    fn test_duplicate_channels() {
        let mut config = create_valid_config();
        config.motors.channels = vec![0, 1, 1, 3];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("assigned twice"));
    }

    #[test]
    fn test_oversampling_too_high() {
        let mut config = create_valid_config();
        config.barometer.oversampling = 4;
        assert!(matches!(config.validate(), Err(HalError::Config(_))));
        assert!(matches!(config.oversampling(), Err(HalError::Config(_))));
    }

    #[test]
    fn test_samples_zero() {
        let mut config = create_valid_config();
        config.bench.samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_interval_zero() {
        let mut config = create_valid_config();
        config.bench.sample_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_interval_too_high() {
        let mut config = create_valid_config();
        config.bench.sample_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_interval_boundaries() {
        let mut config = create_valid_config();
        config.bench.sample_interval_ms = 1;
        assert!(config.validate().is_ok());
        config.bench.sample_interval_ms = 60000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_spin_up_thrust_out_of_range() {
        let mut config = create_valid_config();
        config.bench.spin_up_thrust = 1.5;
        assert!(config.validate().is_err());

        config.bench.spin_up_thrust = f64::NAN;
        assert!(config.validate().is_err());
    }
}
