//! # Sensor Device Table
//!
//! Static descriptors for every sensor on the flight stack: bus address,
//! power-up and power-down register sequences, and the data-register layout
//! of the 3-axis sensors.
//!
//! | Function      | Part    | Address | Data registers        | Order |
//! |---------------|---------|---------|-----------------------|-------|
//! | Accelerometer | LSM6DS33| 0x6B    | 0x28-0x2D (x,y,z)     | L,H   |
//! | Gyroscope     | LSM6DS33| 0x6B    | 0x22-0x27 (x,y,z)     | L,H   |
//! | Magnetometer  | MAG3110 | 0x0E    | 0x01-0x06 (x,y,z)     | H,L   |
//! | Barometer     | BMP180  | 0x77    | see [`super::barometer`] | H,L |

use std::fmt;

use super::reader::RegisterReadSpec;
use crate::bus::{AutoIncrement, ByteOrder, WordWidth};

/// Accelerometer and gyroscope share one chip
pub const ACCEL_GYRO_ADDRESS: u8 = 0x6B;
pub const MAGNETOMETER_ADDRESS: u8 = 0x0E;
pub const BAROMETER_ADDRESS: u8 = 0x77;

/// Six consecutive data registers starting at `first`, x then y then z
pub const fn data_registers(first: u8) -> [u8; 6] {
    [first, first + 1, first + 2, first + 3, first + 4, first + 5]
}

/// LSM6DS33 registers
pub mod lsm6ds33 {
    pub const CTRL1_XL: u8 = 0x10;
    pub const CTRL2_G: u8 = 0x11;
    pub const CTRL3_C: u8 = 0x12;
    pub const CTRL7_G: u8 = 0x16;
    pub const OUTX_L_G: u8 = 0x22;
    pub const OUTX_L_XL: u8 = 0x28;

    pub const GYRO_DATA: [u8; 6] = super::data_registers(OUTX_L_G);
    pub const ACCEL_DATA: [u8; 6] = super::data_registers(OUTX_L_XL);

    /// CTRL3_C: IF_INC, register address auto-increment
    pub const IF_INC: u8 = 0x04;
    /// 1.66 kHz output rate, +-16 g
    pub const ACCEL_1K66_16G: u8 = 0x84;
    /// 1.66 kHz output rate, +-2000 dps
    pub const GYRO_1K66_2000DPS: u8 = 0x84;
    /// High-pass filter on, 2.07 Hz cutoff, rounding enabled
    pub const GYRO_HIGH_PASS_2HZ: u8 = 0x70;
}

/// MAG3110 registers
pub mod mag3110 {
    pub const OUT_X_MSB: u8 = 0x01;
    pub const OFF_X_MSB: u8 = 0x09;
    pub const OFF_X_LSB: u8 = 0x0A;
    pub const OFF_Y_MSB: u8 = 0x0B;
    pub const OFF_Y_LSB: u8 = 0x0C;
    pub const OFF_Z_MSB: u8 = 0x0D;
    pub const OFF_Z_LSB: u8 = 0x0E;
    pub const CTRL_REG1: u8 = 0x10;
    pub const CTRL_REG2: u8 = 0x11;

    pub const DATA: [u8; 6] = super::data_registers(OUT_X_MSB);

    /// CTRL_REG1 standby; settings may only change while asleep
    pub const STANDBY: u8 = 0x00;
    /// CTRL_REG1 active mode at the configured output rate
    pub const ACTIVE: u8 = 0x09;
}

/// Bench-measured hard-iron offsets for the magnetometer.
///
/// The offset registers ignore bit 0, so the values are stored shifted left
/// by one. These belong to one airframe and must be re-measured for another.
pub const MAG_OFFSET_X: u32 = 0x7F4A << 1;
pub const MAG_OFFSET_Y: u32 = 0x0241 << 1;
pub const MAG_OFFSET_Z: u32 = 0x0604 << 1;

/// Counts per g at +-16 g: 2^(15 - log2(16)).
pub const ACCEL_DIVISOR: f64 = 2048.0;

/// Counts per dps.
///
/// The +-2000 dps range works out to 2^(15 - ceil(log2(2000))) = 16, but the
/// airframe was tuned against 14. Kept until it is re-validated on hardware.
pub const GYRO_DIVISOR: f64 = 14.0;

/// Counts per microtesla.
///
/// The +-1000 uT range works out to 32; 10 is what matched reference field
/// measurements. Kept until it is re-validated on hardware.
pub const MAG_DIVISOR: f64 = 10.0;

/// Sensor functions on the flight stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
    Barometer,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::Magnetometer => "magnetometer",
            SensorKind::Barometer => "barometer",
        };
        f.write_str(name)
    }
}

/// One configuration write: `value` split across `registers`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterWrite {
    pub registers: &'static [u8],
    pub value: u32,
    pub order: ByteOrder,
    pub auto_increment: AutoIncrement,
}

impl RegisterWrite {
    /// High-byte-first write with auto-increment
    pub const fn new(registers: &'static [u8], value: u32) -> Self {
        Self {
            registers,
            value,
            order: ByteOrder::HighByteFirst,
            auto_increment: AutoIncrement::Enabled,
        }
    }

    pub const fn without_auto_increment(mut self) -> Self {
        self.auto_increment = AutoIncrement::Disabled;
        self
    }
}

/// Where a 3-axis sensor keeps its sample and how to scale it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorLayout {
    /// Data registers in x, y, z order
    pub registers: &'static [u8],
    pub width: WordWidth,
    pub order: ByteOrder,
    /// Raw counts per engineering unit
    pub divisor: f64,
    /// Mounting correction applied after scaling
    pub axis_signs: [f64; 3],
}

/// Static description of one sensor function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorDeviceDescriptor {
    pub kind: SensorKind,
    pub address: u8,
    pub auto_increment: AutoIncrement,
    /// Applied in order by `initialize`
    pub init: &'static [RegisterWrite],
    /// Applied in order by `deinitialize`
    pub deinit: &'static [RegisterWrite],
    /// `None` for sensors that are not read as a vector
    pub vector: Option<VectorLayout>,
}

impl SensorDeviceDescriptor {
    /// Builds the read spec for this sensor's vector sample.
    #[must_use]
    pub fn read_spec(&self) -> Option<RegisterReadSpec<'static>> {
        self.vector.map(|layout| RegisterReadSpec {
            address: self.address,
            registers: layout.registers,
            width: layout.width,
            byte_order: layout.order,
            auto_increment: self.auto_increment,
            divisor: layout.divisor,
        })
    }
}

pub static ACCELEROMETER: SensorDeviceDescriptor = SensorDeviceDescriptor {
    kind: SensorKind::Accelerometer,
    address: ACCEL_GYRO_ADDRESS,
    auto_increment: AutoIncrement::Enabled,
    init: &[
        RegisterWrite::new(&[lsm6ds33::CTRL3_C], lsm6ds33::IF_INC as u32),
        RegisterWrite::new(&[lsm6ds33::CTRL1_XL], lsm6ds33::ACCEL_1K66_16G as u32),
    ],
    deinit: &[RegisterWrite::new(&[lsm6ds33::CTRL1_XL], 0x00)],
    vector: Some(VectorLayout {
        registers: &lsm6ds33::ACCEL_DATA,
        width: WordWidth::Bits16,
        order: ByteOrder::LowByteFirst,
        divisor: ACCEL_DIVISOR,
        axis_signs: [1.0, 1.0, 1.0],
    }),
};

pub static GYROSCOPE: SensorDeviceDescriptor = SensorDeviceDescriptor {
    kind: SensorKind::Gyroscope,
    address: ACCEL_GYRO_ADDRESS,
    auto_increment: AutoIncrement::Enabled,
    init: &[
        RegisterWrite::new(&[lsm6ds33::CTRL2_G], lsm6ds33::GYRO_1K66_2000DPS as u32),
        RegisterWrite::new(&[lsm6ds33::CTRL7_G], lsm6ds33::GYRO_HIGH_PASS_2HZ as u32),
    ],
    deinit: &[RegisterWrite::new(&[lsm6ds33::CTRL2_G], 0x00)],
    vector: Some(VectorLayout {
        registers: &lsm6ds33::GYRO_DATA,
        width: WordWidth::Bits16,
        order: ByteOrder::LowByteFirst,
        divisor: GYRO_DIVISOR,
        axis_signs: [1.0, 1.0, 1.0],
    }),
};

pub static MAGNETOMETER: SensorDeviceDescriptor = SensorDeviceDescriptor {
    kind: SensorKind::Magnetometer,
    address: MAGNETOMETER_ADDRESS,
    auto_increment: AutoIncrement::Enabled,
    init: &[
        RegisterWrite::new(&[mag3110::CTRL_REG1], mag3110::STANDBY as u32),
        RegisterWrite::new(&[mag3110::OFF_X_MSB, mag3110::OFF_X_LSB], MAG_OFFSET_X),
        RegisterWrite::new(&[mag3110::OFF_Y_MSB, mag3110::OFF_Y_LSB], MAG_OFFSET_Y),
        RegisterWrite::new(&[mag3110::OFF_Z_MSB, mag3110::OFF_Z_LSB], MAG_OFFSET_Z),
        RegisterWrite::new(&[mag3110::CTRL_REG1, mag3110::CTRL_REG2], 0x0900),
        RegisterWrite::new(&[mag3110::CTRL_REG1], mag3110::ACTIVE as u32),
    ],
    // Writes CTRL_REG2/0x12 rather than CTRL_REG1; see DESIGN.md before changing.
    deinit: &[RegisterWrite::new(&[mag3110::CTRL_REG2, 0x12], 0x0800)],
    vector: Some(VectorLayout {
        registers: &mag3110::DATA,
        width: WordWidth::Bits16,
        order: ByteOrder::HighByteFirst,
        divisor: MAG_DIVISOR,
        // Mounted upside down
        axis_signs: [1.0, 1.0, -1.0],
    }),
};

pub static BAROMETER: SensorDeviceDescriptor = SensorDeviceDescriptor {
    kind: SensorKind::Barometer,
    address: BAROMETER_ADDRESS,
    auto_increment: AutoIncrement::Enabled,
    init: &[],
    deinit: &[RegisterWrite::new(&[super::barometer::CONTROL_REGISTER], 0x00).without_auto_increment()],
    vector: None,
};

/// All sensors, in configuration order
pub static DEVICES: [&SensorDeviceDescriptor; 4] =
    [&ACCELEROMETER, &GYROSCOPE, &MAGNETOMETER, &BAROMETER];

/// Looks up the descriptor for a sensor function
#[must_use]
pub fn descriptor(kind: SensorKind) -> &'static SensorDeviceDescriptor {
    match kind {
        SensorKind::Accelerometer => &ACCELEROMETER,
        SensorKind::Gyroscope => &GYROSCOPE,
        SensorKind::Magnetometer => &MAGNETOMETER,
        SensorKind::Barometer => &BAROMETER,
    }
}
