//! # Barometer Compensation
//!
//! The BMP180 leaves all compensation to the host: eleven factory
//! coefficients are read once from EEPROM and combined with raw temperature
//! (UT) and pressure (UP) samples using the datasheet's integer formula.
//!
//! ## Coefficient layout
//!
//! | Slot | Name | Register pair | Encoding |
//! |------|------|---------------|----------|
//! | 0    | AC1  | 0xAA/0xAB     | signed   |
//! | 1    | AC2  | 0xAC/0xAD     | signed   |
//! | 2    | AC3  | 0xAE/0xAF     | signed   |
//! | 3    | AC4  | 0xB0/0xB1     | unsigned |
//! | 4    | AC5  | 0xB2/0xB3     | unsigned |
//! | 5    | AC6  | 0xB4/0xB5     | unsigned |
//! | 6    | B1   | 0xB6/0xB7     | signed   |
//! | 7    | B2   | 0xB8/0xB9     | signed   |
//! | 8    | MB   | 0xBA/0xBB     | signed   |
//! | 9    | MC   | 0xBC/0xBD     | signed   |
//! | 10   | MD   | 0xBE/0xBF     | signed   |
//!
//! ## Integer semantics
//!
//! Every division truncates toward zero, and B4/B7 use unsigned 32-bit
//! wrap-around, exactly as the reference formula. Raw samples are bounded to
//! the sensor's output range (16-bit UT, 19-bit UP) before any arithmetic,
//! which keeps every intermediate product inside `i64`.

use embedded_hal::delay::DelayNs;
use serde::Serialize;
use tracing::debug;

use super::devices::{SensorKind, BAROMETER_ADDRESS};
use crate::bus::codec::to_signed;
use crate::bus::{AutoIncrement, ByteOrder, RegisterBus, WordWidth};
use crate::error::{HalError, Result};
use crate::fault::{FaultLog, FaultSource};

/// Number of EEPROM coefficients
pub const COEFFICIENT_COUNT: usize = 11;

/// First EEPROM register (AC1 MSB)
pub const CALIBRATION_START: u8 = 0xAA;

/// Conversion control register
pub const CONTROL_REGISTER: u8 = 0xF4;

/// Conversion result registers (MSB, LSB, XLSB)
pub const RESULT_REGISTERS: [u8; 3] = [0xF6, 0xF7, 0xF8];

/// Control value starting a temperature conversion
pub const TEMPERATURE_COMMAND: u8 = 0x2E;

/// Control value starting a pressure conversion at oversampling 0
pub const PRESSURE_COMMAND: u8 = 0x34;

/// Temperature conversion time in microseconds
pub const TEMPERATURE_CONVERSION_US: u32 = 4_500;

/// Largest raw temperature the ADC produces
pub const MAX_UNCOMPENSATED_TEMPERATURE: u32 = 0xFFFF;

/// Largest raw pressure the ADC produces (24 bits shifted right by at least 5)
pub const MAX_UNCOMPENSATED_PRESSURE: u32 = 0x7_FFFF;

/// Reference pressure for altitude, in pascals
pub const SEA_LEVEL_PRESSURE_PA: f64 = 101_325.0;

/// Slots stored unsigned in EEPROM (AC4, AC5, AC6)
const UNSIGNED_SLOTS: std::ops::RangeInclusive<usize> = 3..=5;

/// Pressure oversampling setting (`oss`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oversampling {
    UltraLowPower,
    Standard,
    HighResolution,
    #[default]
    UltraHighResolution,
}

impl Oversampling {
    /// The `oss` value, 0 to 3
    #[must_use]
    pub const fn setting(self) -> u8 {
        match self {
            Oversampling::UltraLowPower => 0,
            Oversampling::Standard => 1,
            Oversampling::HighResolution => 2,
            Oversampling::UltraHighResolution => 3,
        }
    }

    /// Pressure conversion time in microseconds
    #[must_use]
    pub const fn conversion_time_us(self) -> u32 {
        match self {
            Oversampling::UltraLowPower => 4_500,
            Oversampling::Standard => 7_500,
            Oversampling::HighResolution => 13_500,
            Oversampling::UltraHighResolution => 25_500,
        }
    }

    /// Control register value that starts a pressure conversion
    #[must_use]
    pub const fn pressure_command(self) -> u8 {
        PRESSURE_COMMAND + (self.setting() << 6)
    }
}

impl TryFrom<u8> for Oversampling {
    type Error = HalError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Oversampling::UltraLowPower),
            1 => Ok(Oversampling::Standard),
            2 => Ok(Oversampling::HighResolution),
            3 => Ok(Oversampling::UltraHighResolution),
            other => Err(HalError::InvalidOversampling(other)),
        }
    }
}

/// The eleven factory coefficients, in datasheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationCoefficients([i32; COEFFICIENT_COUNT]);

impl CalibrationCoefficients {
    #[must_use]
    pub const fn new(slots: [i32; COEFFICIENT_COUNT]) -> Self {
        Self(slots)
    }

    /// Decode raw EEPROM words, treating AC4-AC6 as unsigned.
    #[must_use]
    pub fn from_words(words: [u16; COEFFICIENT_COUNT]) -> Self {
        let mut slots = [0i32; COEFFICIENT_COUNT];
        for (index, (slot, word)) in slots.iter_mut().zip(words).enumerate() {
            *slot = decode_slot(index, u32::from(word));
        }
        Self(slots)
    }

    #[must_use]
    pub fn slots(&self) -> &[i32; COEFFICIENT_COUNT] {
        &self.0
    }

    pub fn ac1(&self) -> i64 { i64::from(self.0[0]) }
    pub fn ac2(&self) -> i64 { i64::from(self.0[1]) }
    pub fn ac3(&self) -> i64 { i64::from(self.0[2]) }
    pub fn ac4(&self) -> i64 { i64::from(self.0[3]) }
    pub fn ac5(&self) -> i64 { i64::from(self.0[4]) }
    pub fn ac6(&self) -> i64 { i64::from(self.0[5]) }
    pub fn b1(&self) -> i64 { i64::from(self.0[6]) }
    pub fn b2(&self) -> i64 { i64::from(self.0[7]) }
    pub fn mb(&self) -> i64 { i64::from(self.0[8]) }
    pub fn mc(&self) -> i64 { i64::from(self.0[9]) }
    pub fn md(&self) -> i64 { i64::from(self.0[10]) }
}

fn decode_slot(index: usize, word: u32) -> i32 {
    if UNSIGNED_SLOTS.contains(&index) {
        (word & 0xFFFF) as i32
    } else {
        to_signed(word, WordWidth::Bits16.bit_width())
    }
}

/// Compensated barometer output
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarometerSample {
    /// True pressure in pascals
    pub pressure_pa: i32,
    /// True temperature in 0.1 degC
    pub temperature_dc: i32,
    /// Altitude above the sea-level reference in meters
    pub altitude_m: f64,
}

impl BarometerSample {
    /// Temperature in degrees Celsius
    #[must_use]
    pub fn temperature_c(&self) -> f64 {
        f64::from(self.temperature_dc) / 10.0
    }
}

fn checked_div(numerator: i64, denominator: i64, step: &'static str) -> Result<i64> {
    numerator
        .checked_div(denominator)
        .ok_or(HalError::Compensation(step))
}

/// Apply the datasheet compensation chain to raw samples.
///
/// Returns `(true_temperature_dc, true_pressure_pa)`.
///
/// # Errors
///
/// Returns `HalError::Compensation` if a raw sample exceeds the ADC range,
/// a divisor in the chain is zero, or the pressure falls outside `i32`.
///
/// # Examples
///
/// Datasheet worked example:
///
/// ```
/// use flight_hal::sensors::barometer::{compensate, CalibrationCoefficients, Oversampling};
///
/// let coefficients = CalibrationCoefficients::new(
///     [408, -72, -14383, 32741, 32757, 23153, 6190, 4, -32768, -8711, 2868],
/// );
/// let (temperature, pressure) =
///     compensate(&coefficients, 27898, 23843, Oversampling::UltraLowPower)?;
/// assert_eq!(temperature, 150);
/// assert!((pressure - 69964).abs() <= 1);
/// # Ok::<(), flight_hal::error::HalError>(())
/// ```
pub fn compensate(
    coefficients: &CalibrationCoefficients,
    uncompensated_temperature: u32,
    uncompensated_pressure: u32,
    oversampling: Oversampling,
) -> Result<(i32, i32)> {
    if uncompensated_temperature > MAX_UNCOMPENSATED_TEMPERATURE {
        return Err(HalError::Compensation("UT exceeds 16 bits"));
    }
    if uncompensated_pressure > MAX_UNCOMPENSATED_PRESSURE {
        return Err(HalError::Compensation("UP exceeds 19 bits"));
    }

    let c = coefficients;
    let oss = u32::from(oversampling.setting());
    let ut = i64::from(uncompensated_temperature);

    // Temperature
    let x1 = (ut - c.ac6()) * c.ac5() / 32768;
    let x2 = checked_div(c.mc() * 2048, x1 + c.md(), "X1 + MD is zero")?;
    let b5 = x1 + x2;
    let temperature = (b5 + 8) / 16;

    // Pressure
    let b6 = b5 - 4000;
    let x1 = (c.b2() * (b6 * b6 / 4096)) / 2048;
    let x2 = c.ac2() * b6 / 2048;
    let x3 = x1 + x2;
    let b3 = (((c.ac1() * 4 + x3) << oss) + 2) / 4;
    let x1 = c.ac3() * b6 / 8192;
    let x2 = (c.b1() * (b6 * b6 / 4096)) / 65536;
    let x3 = (x1 + x2 + 2) / 4;

    let b4 = (c.ac4() as u32).wrapping_mul((x3 + 32768) as u32) / 32768;
    let b7 = uncompensated_pressure
        .wrapping_sub(b3 as u32)
        .wrapping_mul(50_000u32 >> oss);

    if b4 == 0 {
        return Err(HalError::Compensation("B4 is zero"));
    }

    let p = if b7 < 0x8000_0000 {
        (b7 * 2) / b4
    } else {
        (b7 / b4).wrapping_mul(2)
    };
    let p = i64::from(p as i32);

    let x1 = (p / 256) * (p / 256);
    let x1 = (x1 * 3038) / 65536;
    let x2 = (-7357 * p) / 65536;
    let pressure = p + (x1 + x2 + 3791) / 16;

    let temperature = i32::try_from(temperature)
        .map_err(|_| HalError::Compensation("temperature out of range"))?;
    let pressure = i32::try_from(pressure)
        .map_err(|_| HalError::Compensation("pressure out of range"))?;

    Ok((temperature, pressure))
}

/// International barometric formula with the 101325 Pa reference.
///
/// ```
/// use flight_hal::sensors::barometer::altitude_from_pressure;
///
/// assert_eq!(altitude_from_pressure(101_325), 0.0);
/// assert!(altitude_from_pressure(89_875) > 990.0);
/// ```
#[must_use]
pub fn altitude_from_pressure(pressure_pa: i32) -> f64 {
    44_330.0 * (1.0 - (f64::from(pressure_pa) / SEA_LEVEL_PRESSURE_PA).powf(1.0 / 5.255))
}

/// Coefficient table plus the conversion protocol of the barometer.
#[derive(Debug, Clone)]
pub struct BarometerCompensator {
    slots: [i32; COEFFICIENT_COUNT],
    loaded: [bool; COEFFICIENT_COUNT],
    oversampling: Oversampling,
}

impl Default for BarometerCompensator {
    fn default() -> Self {
        Self::new(Oversampling::default())
    }
}

impl BarometerCompensator {
    /// Creates a compensator with an empty coefficient table
    #[must_use]
    pub fn new(oversampling: Oversampling) -> Self {
        Self {
            slots: [0; COEFFICIENT_COUNT],
            loaded: [false; COEFFICIENT_COUNT],
            oversampling,
        }
    }

    /// Creates a compensator with a known coefficient table
    #[must_use]
    pub fn with_coefficients(coefficients: CalibrationCoefficients, oversampling: Oversampling) -> Self {
        Self {
            slots: *coefficients.slots(),
            loaded: [true; COEFFICIENT_COUNT],
            oversampling,
        }
    }

    #[must_use]
    pub fn oversampling(&self) -> Oversampling {
        self.oversampling
    }

    /// The coefficient table, once every slot has been read at least once
    #[must_use]
    pub fn coefficients(&self) -> Option<CalibrationCoefficients> {
        self.is_calibrated()
            .then(|| CalibrationCoefficients::new(self.slots))
    }

    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.loaded.iter().all(|&loaded| loaded)
    }

    /// Read all eleven coefficients from EEPROM.
    ///
    /// A failed slot is recorded in `faults` and keeps its previous value;
    /// the remaining slots are still read. Returns `true` once the whole
    /// table is populated.
    pub fn read_calibration<B: RegisterBus + ?Sized>(
        &mut self,
        bus: &mut B,
        faults: &mut FaultLog,
    ) -> bool {
        for index in 0..COEFFICIENT_COUNT {
            let msb = CALIBRATION_START + 2 * index as u8;
            let registers = [msb, msb + 1];
            let mut word = [0u32; 1];

            match bus.read_words(
                BAROMETER_ADDRESS,
                &registers,
                &mut word,
                WordWidth::Bits16,
                ByteOrder::HighByteFirst,
                AutoIncrement::Enabled,
            ) {
                Ok(()) => {
                    self.slots[index] = decode_slot(index, word[0]);
                    self.loaded[index] = true;
                }
                Err(e) => faults.record(FaultSource::Sensor(SensorKind::Barometer), &e),
            }
        }

        debug!("Barometer calibration table: {:?}", self.slots);
        self.is_calibrated()
    }

    /// Start a temperature conversion, wait for it, and read UT.
    ///
    /// # Errors
    ///
    /// Propagates the first failing bus transaction.
    pub fn read_uncompensated_temperature<B, D>(&self, bus: &mut B, delay: &mut D) -> Result<u32>
    where
        B: RegisterBus + ?Sized,
        D: DelayNs + ?Sized,
    {
        bus.write(
            BAROMETER_ADDRESS,
            &[CONTROL_REGISTER],
            u32::from(TEMPERATURE_COMMAND),
            ByteOrder::HighByteFirst,
            AutoIncrement::Enabled,
        )?;

        delay.delay_us(TEMPERATURE_CONVERSION_US);

        let mut word = [0u32; 1];
        bus.read_words(
            BAROMETER_ADDRESS,
            &RESULT_REGISTERS[..2],
            &mut word,
            WordWidth::Bits16,
            ByteOrder::HighByteFirst,
            AutoIncrement::Enabled,
        )?;

        Ok(word[0])
    }

    /// Start a pressure conversion, wait for it, and read UP.
    ///
    /// The 24-bit result is shifted right by `8 - oss`.
    ///
    /// # Errors
    ///
    /// Propagates the first failing bus transaction.
    pub fn read_uncompensated_pressure<B, D>(&self, bus: &mut B, delay: &mut D) -> Result<u32>
    where
        B: RegisterBus + ?Sized,
        D: DelayNs + ?Sized,
    {
        bus.write(
            BAROMETER_ADDRESS,
            &[CONTROL_REGISTER],
            u32::from(self.oversampling.pressure_command()),
            ByteOrder::HighByteFirst,
            AutoIncrement::Enabled,
        )?;

        delay.delay_us(self.oversampling.conversion_time_us());

        let mut word = [0u32; 1];
        bus.read_words(
            BAROMETER_ADDRESS,
            &RESULT_REGISTERS,
            &mut word,
            WordWidth::Bits24,
            ByteOrder::HighByteFirst,
            AutoIncrement::Enabled,
        )?;

        Ok(word[0] >> (8 - self.oversampling.setting()))
    }

    /// Compensate raw samples with the loaded table.
    ///
    /// # Errors
    ///
    /// Returns `HalError::UncalibratedCompensation` until the table is
    /// complete, and `HalError::Compensation` for a degenerate table.
    pub fn compensate(
        &self,
        uncompensated_temperature: u32,
        uncompensated_pressure: u32,
    ) -> Result<BarometerSample> {
        let coefficients = self.coefficients().ok_or(HalError::UncalibratedCompensation)?;
        let (temperature_dc, pressure_pa) = compensate(
            &coefficients,
            uncompensated_temperature,
            uncompensated_pressure,
            self.oversampling,
        )?;

        Ok(BarometerSample {
            pressure_pa,
            temperature_dc,
            altitude_m: altitude_from_pressure(pressure_pa),
        })
    }

    /// Convert pressure, then temperature, and compensate the pair.
    ///
    /// # Errors
    ///
    /// Fails before any bus traffic if the table is incomplete, otherwise
    /// propagates bus and compensation errors.
    pub fn sample<B, D>(&self, bus: &mut B, delay: &mut D) -> Result<BarometerSample>
    where
        B: RegisterBus + ?Sized,
        D: DelayNs + ?Sized,
    {
        if !self.is_calibrated() {
            return Err(HalError::UncalibratedCompensation);
        }

        let up = self.read_uncompensated_pressure(bus, delay)?;
        let ut = self.read_uncompensated_temperature(bus, delay)?;
        debug!("Barometer raw samples: UT={} UP={}", ut, up);

        self.compensate(ut, up)
    }
}
