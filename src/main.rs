//! # Flight HAL Bench
//!
//! Exercises the sensor and motor stack against the simulated flight board.
//!
//! Prints one JSON sensor snapshot per line on stdout; logs go to stderr.

use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use flight_hal::bus::i2c::I2cRegisterBus;
use flight_hal::bus::sim::SimulatedBus;
use flight_hal::config::Config;
use flight_hal::delay::StdDelay;
use flight_hal::motor::actuator::{PwmActuator, SimulatedPwmChannel};
use flight_hal::motor::{MotorController, MOTOR_COUNT};
use flight_hal::sensors::SensorManager;

/// Configuration used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Resolution of the simulated PWM channels
const PWM_MAX_DUTY: u16 = 10_000;

/// Main entry point for the Flight HAL bench
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (first argument, or `config/default.toml`)
///    - Build the simulated sensor bus and PWM bank
///
/// 2. **Sampling**
///    - Initialize the sensors
///    - Print `bench.samples` snapshots as JSON lines
///
/// 3. **Motors**
///    - Spin every motor up to `bench.spin_up_thrust`, then back to zero
///
/// 4. **Shutdown**
///    - Power the sensors down and report recorded faults
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or a snapshot cannot
/// be serialized.
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Flight HAL bench v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = config_path(env::args().nth(1));
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;
    info!("Loaded configuration from {}", config_path);

    // Sensors
    let bus = I2cRegisterBus::new(SimulatedBus::flight_stack());
    let mut sensors = SensorManager::with_oversampling(bus, StdDelay, config.oversampling()?);
    sensors.initialize();

    let interval = Duration::from_millis(config.bench.sample_interval_ms);
    for sample in 0..config.bench.samples {
        if sample > 0 {
            thread::sleep(interval);
        }
        let snapshot = sensors.snapshot();
        println!(
            "{}",
            serde_json::to_string(&snapshot).context("failed to serialize snapshot")?
        );
    }

    // Motors
    let pwm = PwmActuator::new(vec![SimulatedPwmChannel::new(PWM_MAX_DUTY); channel_count(&config)]);
    let mut motors =
        MotorController::with_channels(pwm, config.thrust_calibration()?, config.motor_channels()?);

    motors.set_all_thrust(config.bench.spin_up_thrust);
    for motor in 0..MOTOR_COUNT {
        info!("Motor {} at thrust {:.3}", motor, motors.thrust_fraction(motor));
    }

    motors.set_all_thrust(0.0);
    info!("Motors back to zero thrust");

    sensors.deinitialize();

    let faults = sensors.faults().total() + motors.faults().total();
    if faults > 0 {
        warn!("Bench finished with {} recorded faults", faults);
    } else {
        info!("Bench finished cleanly");
    }

    Ok(())
}

/// Config path from the first CLI argument, falling back to the default
fn config_path(arg: Option<String>) -> String {
    arg.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// PWM channels needed to cover every configured motor channel
fn channel_count(config: &Config) -> usize {
    config
        .motors
        .channels
        .iter()
        .map(|&channel| usize::from(channel) + 1)
        .max()
        .unwrap_or(MOTOR_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(config_path(None), "config/default.toml");
        assert_eq!(config_path(Some("bench.toml".to_string())), "bench.toml");
    }

    #[test]
    fn test_bundled_config_is_valid() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"));
        assert!(config.is_ok(), "config/default.toml: {:?}", config.err());
    }

    #[test]
    fn test_channel_count_covers_highest_channel() {
        let mut config = Config::parse("").unwrap();
        assert_eq!(channel_count(&config), 4);

        config.motors.channels = vec![6, 2, 0, 1];
        assert_eq!(channel_count(&config), 7);
    }

    #[test]
    fn test_pwm_resolution() {
        // 0.01% duty steps keep thrust read-back within 0.1%
        let step = 1.0 / f64::from(PWM_MAX_DUTY);
        assert!(step / 0.1599 < 0.001);
    }
}
