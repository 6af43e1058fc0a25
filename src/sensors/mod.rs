//! # Sensor Module
//!
//! Owns the sensor bus and brings the flight board's sensors up and down.
//!
//! This module handles:
//! - Device configuration and power-down sequences ([`devices`])
//! - Generic 3-axis register reads ([`reader`], [`vector`])
//! - BMP180 calibration and compensation ([`barometer`])
//! - The [`SensorManager`] lifecycle and fail-open read API
//!
//! ## Fail-open reads
//!
//! `acceleration()`, `altitude()` and friends never return an error. A failed
//! read records exactly one fault in the manager's [`FaultLog`] (which also
//! emits a `WARN` event) and returns a fallback: the zero vector for 3-axis
//! sensors, the last good sample for the barometer. The `try_*` variants
//! return the typed error instead and record nothing.

pub mod barometer;
pub mod devices;
pub mod reader;
pub mod vector;

use chrono::{DateTime, Utc};
use embedded_hal::delay::DelayNs;
use serde::Serialize;
use tracing::{debug, info};

use crate::bus::RegisterBus;
use crate::error::{HalError, Result};
use crate::fault::{FaultLog, FaultSource};
use barometer::{BarometerCompensator, BarometerSample, Oversampling};
use devices::{SensorDeviceDescriptor, SensorKind, DEVICES};
use reader::{read_vector, RegisterReadSpec};
use vector::Vector3;

/// Settle time after the configuration sequence, in microseconds
pub const SETTLE_DELAY_US: u32 = 50;

/// Whether the sensors have been configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
}

/// One reading of every sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSnapshot {
    pub timestamp: DateTime<Utc>,
    /// g
    pub acceleration: Vector3,
    /// deg/s
    pub rotation: Vector3,
    /// uT
    pub magnetic_field: Vector3,
    /// Last good barometer sample, if any
    pub barometer: Option<BarometerSample>,
}

/// Sensor lifecycle and read API over one register bus.
///
/// # Examples
///
/// ```
/// use flight_hal::bus::i2c::I2cRegisterBus;
/// use flight_hal::bus::sim::SimulatedBus;
/// use flight_hal::delay::StdDelay;
/// use flight_hal::sensors::SensorManager;
///
/// let bus = I2cRegisterBus::new(SimulatedBus::flight_stack());
/// let mut sensors = SensorManager::new(bus, StdDelay);
///
/// sensors.initialize();
/// let a = sensors.acceleration();
/// assert_eq!(a.z, 1.0);
/// assert_eq!(sensors.faults().total(), 0);
/// ```
#[derive(Debug)]
pub struct SensorManager<B, D> {
    bus: B,
    delay: D,
    state: LifecycleState,
    barometer: BarometerCompensator,
    last_barometer: Option<BarometerSample>,
    faults: FaultLog,
}

impl<B: RegisterBus, D: DelayNs> SensorManager<B, D> {
    /// Create a manager with the default barometer oversampling
    pub fn new(bus: B, delay: D) -> Self {
        Self::with_oversampling(bus, delay, Oversampling::default())
    }

    pub fn with_oversampling(bus: B, delay: D, oversampling: Oversampling) -> Self {
        Self {
            bus,
            delay,
            state: LifecycleState::Uninitialized,
            barometer: BarometerCompensator::new(oversampling),
            last_barometer: None,
            faults: FaultLog::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    /// Faults recorded by fail-open operations
    pub fn faults(&self) -> &FaultLog {
        &self.faults
    }

    pub fn faults_mut(&mut self) -> &mut FaultLog {
        &mut self.faults
    }

    pub fn compensator(&self) -> &BarometerCompensator {
        &self.barometer
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the bus and delay provider
    pub fn into_parts(self) -> (B, D) {
        (self.bus, self.delay)
    }

    /// Configure every sensor and read the barometer calibration.
    ///
    /// Does nothing when already [`LifecycleState::Ready`]. Each failed
    /// configuration write is recorded as a fault and the sequence carries
    /// on; the manager becomes ready regardless.
    pub fn initialize(&mut self) {
        if self.is_ready() {
            return;
        }

        info!("Initializing sensors");

        for device in DEVICES {
            let failures = self.apply_sequence(device, device.init);
            debug!("Configured {} ({} failed writes)", device.kind, failures);
        }

        self.read_calibration();

        self.delay.delay_us(SETTLE_DELAY_US);
        self.state = LifecycleState::Ready;
        info!("Sensors ready");
    }

    /// Read the barometer coefficient table, fail-open.
    ///
    /// Called by `initialize`; call it again after a failed boot-time read.
    /// Each failed slot is recorded as a fault and keeps its previous value.
    /// The lifecycle state is left unchanged. Returns `true` once every slot
    /// has been read at least once.
    pub fn read_calibration(&mut self) -> bool {
        let complete = self.barometer.read_calibration(&mut self.bus, &mut self.faults);
        if !complete {
            info!("Barometer calibration incomplete; call read_calibration again once the bus recovers");
        }
        complete
    }

    /// Power every sensor down and return to [`LifecycleState::Uninitialized`].
    ///
    /// Runs regardless of the current state. Calibration coefficients and
    /// the last barometer sample are kept.
    pub fn deinitialize(&mut self) {
        info!("Powering sensors down");

        for device in DEVICES {
            self.apply_sequence(device, device.deinit);
        }

        self.state = LifecycleState::Uninitialized;
    }

    fn apply_sequence(
        &mut self,
        device: &SensorDeviceDescriptor,
        writes: &[devices::RegisterWrite],
    ) -> usize {
        let mut failures = 0;
        for write in writes {
            if let Err(e) = self.bus.write(
                device.address,
                write.registers,
                write.value,
                write.order,
                write.auto_increment,
            ) {
                self.faults.record(FaultSource::Sensor(device.kind), &e);
                failures += 1;
            }
        }
        failures
    }

    /// Read a 3-axis sensor, initializing first if needed.
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidReadSpec` for a sensor without a vector
    /// layout, or the bus error of the failed read.
    pub fn try_read(&mut self, kind: SensorKind) -> Result<Vector3> {
        let descriptor = devices::descriptor(kind);
        let (spec, layout) = descriptor
            .read_spec()
            .zip(descriptor.vector)
            .ok_or_else(|| HalError::InvalidReadSpec(format!("{} has no vector registers", kind)))?;

        self.initialize();
        let v = read_vector(&mut self.bus, &spec)?;
        Ok(v.component_mul(layout.axis_signs))
    }

    /// Fail-open form of [`SensorManager::try_read`]
    pub fn read(&mut self, kind: SensorKind) -> Vector3 {
        match self.try_read(kind) {
            Ok(v) => v,
            Err(e) => {
                self.faults.record(FaultSource::Sensor(kind), &e);
                Vector3::ZERO
            }
        }
    }

    /// Read an arbitrary register layout, attributing failures to `kind`.
    ///
    /// An invalid layout yields the zero vector and one fault without any
    /// bus traffic.
    pub fn read_with_spec(&mut self, kind: SensorKind, spec: &RegisterReadSpec<'_>) -> Vector3 {
        match read_vector(&mut self.bus, spec) {
            Ok(v) => v,
            Err(e) => {
                self.faults.record(FaultSource::Sensor(kind), &e);
                Vector3::ZERO
            }
        }
    }

    /// Acceleration in g
    pub fn acceleration(&mut self) -> Vector3 {
        self.read(SensorKind::Accelerometer)
    }

    /// # Errors
    ///
    /// See [`SensorManager::try_read`].
    pub fn try_acceleration(&mut self) -> Result<Vector3> {
        self.try_read(SensorKind::Accelerometer)
    }

    /// Angular rate in deg/s
    pub fn rotation(&mut self) -> Vector3 {
        self.read(SensorKind::Gyroscope)
    }

    /// # Errors
    ///
    /// See [`SensorManager::try_read`].
    pub fn try_rotation(&mut self) -> Result<Vector3> {
        self.try_read(SensorKind::Gyroscope)
    }

    /// Magnetic field in uT, Z corrected for the inverted mounting
    pub fn magnetic_field(&mut self) -> Vector3 {
        self.read(SensorKind::Magnetometer)
    }

    /// # Errors
    ///
    /// See [`SensorManager::try_read`].
    pub fn try_magnetic_field(&mut self) -> Result<Vector3> {
        self.try_read(SensorKind::Magnetometer)
    }

    /// Take a compensated barometer sample, initializing first if needed.
    ///
    /// # Errors
    ///
    /// Returns `HalError::UncalibratedCompensation` if the coefficient table
    /// was never fully read, otherwise the bus or compensation error.
    pub fn try_barometer_sample(&mut self) -> Result<BarometerSample> {
        self.initialize();
        let sample = self.barometer.sample(&mut self.bus, &mut self.delay)?;
        self.last_barometer = Some(sample);
        Ok(sample)
    }

    /// Fail-open barometer sample: the last good sample on failure
    pub fn barometer_sample(&mut self) -> Option<BarometerSample> {
        match self.try_barometer_sample() {
            Ok(sample) => Some(sample),
            Err(e) => {
                self.faults.record(FaultSource::Sensor(SensorKind::Barometer), &e);
                self.last_barometer
            }
        }
    }

    /// Altitude in meters; the last good altitude (initially 0) on failure
    pub fn altitude(&mut self) -> f64 {
        self.barometer_sample().map_or(0.0, |s| s.altitude_m)
    }

    /// # Errors
    ///
    /// See [`SensorManager::try_barometer_sample`].
    pub fn try_altitude(&mut self) -> Result<f64> {
        self.try_barometer_sample().map(|s| s.altitude_m)
    }

    /// Temperature in degC; the last good value (initially 0) on failure
    pub fn temperature(&mut self) -> f64 {
        self.barometer_sample().map_or(0.0, |s| s.temperature_c())
    }

    /// # Errors
    ///
    /// See [`SensorManager::try_barometer_sample`].
    pub fn try_temperature(&mut self) -> Result<f64> {
        self.try_barometer_sample().map(|s| s.temperature_c())
    }

    /// Read every sensor once, fail-open
    pub fn snapshot(&mut self) -> SensorSnapshot {
        SensorSnapshot {
            timestamp: Utc::now(),
            acceleration: self.acceleration(),
            rotation: self.rotation(),
            magnetic_field: self.magnetic_field(),
            barometer: self.barometer_sample(),
        }
    }
}
