//! # Simulated I2C Bus
//!
//! An in-memory `embedded-hal` I2C bus populated with register-file devices.
//! Used by the bench binary and throughout the test suite.
//!
//! Each device is a 256-byte register file with an auto-incrementing
//! pointer. Writing to a device sets the pointer from the first byte and
//! stores the remaining bytes; reading returns bytes from the pointer
//! onwards. The barometer at 0x77 also emulates conversion triggers on its
//! control register.

use std::collections::BTreeMap;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use super::codec::to_unsigned;
use super::WordWidth;
use crate::sensors::barometer::{
    CALIBRATION_START, CONTROL_REGISTER, PRESSURE_COMMAND, RESULT_REGISTERS, TEMPERATURE_COMMAND,
};
use crate::sensors::devices::{
    lsm6ds33, mag3110, ACCEL_GYRO_ADDRESS, BAROMETER_ADDRESS, MAGNETOMETER_ADDRESS,
};

/// Factory coefficients loaded into the simulated barometer (datasheet example)
pub const SIM_CALIBRATION: [i32; 11] =
    [408, -72, -14383, 32741, 32757, 23153, 6190, 4, -32768, -8711, 2868];

/// Raw temperature produced by a simulated temperature conversion
pub const SIM_UNCOMPENSATED_TEMPERATURE: u32 = 27898;

/// Raw pressure produced by a simulated pressure conversion
pub const SIM_UNCOMPENSATED_PRESSURE: u32 = 23843;

/// Transactions kept in the log before the oldest are dropped
pub const TRANSFER_LOG_CAPACITY: usize = 4096;

/// One recorded bus transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Write { address: u8, bytes: Vec<u8> },
    Read { address: u8, len: usize },
    WriteRead { address: u8, bytes: Vec<u8>, read_len: usize },
}

#[derive(Debug, Clone)]
struct Device {
    registers: [u8; 256],
    pointer: u8,
    failing: bool,
}

impl Device {
    fn new() -> Self {
        Self {
            registers: [0; 256],
            pointer: 0,
            failing: false,
        }
    }
}

/// In-memory I2C bus
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    devices: BTreeMap<u8, Device>,
    transfers: Vec<Transfer>,
    transfer_capacity: usize,
    uncompensated: (u32, u32),
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBus {
    /// Creates an empty bus: every address NACKs
    pub fn new() -> Self {
        Self {
            devices: BTreeMap::new(),
            transfers: Vec::new(),
            transfer_capacity: TRANSFER_LOG_CAPACITY,
            uncompensated: (SIM_UNCOMPENSATED_TEMPERATURE, SIM_UNCOMPENSATED_PRESSURE),
        }
    }

    /// Creates a bus with the accelerometer/gyroscope, magnetometer and
    /// barometer of the flight board, preloaded with a level, stationary
    /// reading and the datasheet calibration table.
    pub fn flight_stack() -> Self {
        let mut bus = Self::new();

        bus.add_device(ACCEL_GYRO_ADDRESS);
        // 1 g on +Z
        bus.set_registers(ACCEL_GYRO_ADDRESS, lsm6ds33::OUTX_L_XL, &[0, 0, 0, 0, 0x00, 0x08]);
        bus.set_registers(
            ACCEL_GYRO_ADDRESS,
            lsm6ds33::OUTX_L_G,
            &le_words(&[14, -28, 0]),
        );

        bus.add_device(MAGNETOMETER_ADDRESS);
        bus.set_registers(
            MAGNETOMETER_ADDRESS,
            mag3110::OUT_X_MSB,
            &be_words(&[250, -120, 480]),
        );

        bus.add_device(BAROMETER_ADDRESS);
        bus.set_registers(BAROMETER_ADDRESS, CALIBRATION_START, &be_words(&SIM_CALIBRATION));

        bus
    }

    /// Attach a device with an all-zero register file
    pub fn add_device(&mut self, address: u8) {
        self.devices.entry(address).or_insert_with(Device::new);
    }

    /// Preload registers starting at `start` (wrapping at 0xFF)
    pub fn set_registers(&mut self, address: u8, start: u8, values: &[u8]) {
        let device = self.devices.entry(address).or_insert_with(Device::new);
        let mut register = start;
        for &value in values {
            device.registers[usize::from(register)] = value;
            register = register.wrapping_add(1);
        }
    }

    /// Current value of a register, 0 for unknown devices
    pub fn register(&self, address: u8, register: u8) -> u8 {
        self.devices
            .get(&address)
            .map_or(0, |device| device.registers[usize::from(register)])
    }

    /// Acknowledged transactions, oldest first.
    ///
    /// Holds at most the transfer capacity; once full, each new transaction
    /// drops the oldest one.
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Bound the transfer log, trimming it if it already holds more
    pub fn set_transfer_capacity(&mut self, capacity: usize) {
        self.transfer_capacity = capacity;
        if self.transfers.len() > capacity {
            let excess = self.transfers.len() - capacity;
            self.transfers.drain(..excess);
        }
    }

    pub fn clear_transfers(&mut self) {
        self.transfers.clear();
    }

    /// Make a device NACK every transaction until restored
    pub fn fail_device(&mut self, address: u8) {
        if let Some(device) = self.devices.get_mut(&address) {
            device.failing = true;
        }
    }

    pub fn restore_device(&mut self, address: u8) {
        if let Some(device) = self.devices.get_mut(&address) {
            device.failing = false;
        }
    }

    /// Raw samples the barometer produces on its next conversions
    pub fn set_uncompensated(&mut self, temperature: u32, pressure: u32) {
        self.uncompensated = (temperature, pressure);
    }

    fn record(&mut self, transfer: Transfer) {
        if self.transfer_capacity == 0 {
            return;
        }
        if self.transfers.len() >= self.transfer_capacity {
            self.transfers.remove(0);
        }
        self.transfers.push(transfer);
    }

    fn write_bytes(&mut self, address: u8, bytes: &[u8]) {
        let Some((&first, values)) = bytes.split_first() else {
            return;
        };
        let Some(device) = self.devices.get_mut(&address) else {
            return;
        };

        device.pointer = first;
        let mut written = Vec::with_capacity(values.len());
        for &value in values {
            let register = device.pointer;
            device.registers[usize::from(register)] = value;
            device.pointer = register.wrapping_add(1);
            written.push((register, value));
        }

        if address == BAROMETER_ADDRESS {
            for (register, value) in written {
                self.barometer_control(register, value);
            }
        }
    }

    fn barometer_control(&mut self, register: u8, value: u8) {
        if register != CONTROL_REGISTER {
            return;
        }

        let (temperature, pressure) = self.uncompensated;
        if value == TEMPERATURE_COMMAND {
            let bytes = [(temperature >> 8) as u8, temperature as u8];
            self.set_registers(BAROMETER_ADDRESS, RESULT_REGISTERS[0], &bytes);
        } else if value & 0x3F == PRESSURE_COMMAND {
            let oss = u32::from(value >> 6);
            let raw = (pressure << (8 - oss)) & 0xFF_FFFF;
            let bytes = [(raw >> 16) as u8, (raw >> 8) as u8, raw as u8];
            self.set_registers(BAROMETER_ADDRESS, RESULT_REGISTERS[0], &bytes);
        }
    }

    fn read_bytes(&mut self, address: u8, buffer: &mut [u8]) {
        if let Some(device) = self.devices.get_mut(&address) {
            for slot in buffer.iter_mut() {
                *slot = device.registers[usize::from(device.pointer)];
                device.pointer = device.pointer.wrapping_add(1);
            }
        }
    }
}

fn be_words(values: &[i32]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|&v| {
            let word = to_unsigned(v, WordWidth::Bits16.bit_width());
            [(word >> 8) as u8, word as u8]
        })
        .collect()
}

fn le_words(values: &[i32]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|&v| {
            let word = to_unsigned(v, WordWidth::Bits16.bit_width());
            [word as u8, (word >> 8) as u8]
        })
        .collect()
}

impl ErrorType for SimulatedBus {
    type Error = ErrorKind;
}

impl I2c for SimulatedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let present = self
            .devices
            .get(&address)
            .is_some_and(|device| !device.failing);
        if !present {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let mut written = Vec::new();
        let mut read_len = 0;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    let bytes: &[u8] = bytes;
                    self.write_bytes(address, bytes);
                    written.extend_from_slice(bytes);
                }
                Operation::Read(buffer) => {
                    self.read_bytes(address, buffer);
                    read_len += buffer.len();
                }
            }
        }

        let transfer = match (written.is_empty(), read_len) {
            (false, 0) => Transfer::Write { address, bytes: written },
            (true, len) => Transfer::Read { address, len },
            (false, len) => Transfer::WriteRead { address, bytes: written, read_len: len },
        };
        self.record(transfer);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_address_nacks_without_recording() {
        let mut bus = SimulatedBus::new();
        let result = bus.write(0x42, &[0x00, 0x01]);
        assert_eq!(result, Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)));
        assert!(bus.transfers().is_empty());
    }

    #[test]
    fn test_write_then_read_with_auto_increment() {
        let mut bus = SimulatedBus::new();
        bus.add_device(0x10);
        bus.write(0x10, &[0x20, 0xAA, 0xBB]).unwrap();

        let mut buffer = [0u8; 2];
        bus.write_read(0x10, &[0x20], &mut buffer).unwrap();

        assert_eq!(buffer, [0xAA, 0xBB]);
        assert_eq!(
            bus.transfers(),
            &[
                Transfer::Write { address: 0x10, bytes: vec![0x20, 0xAA, 0xBB] },
                Transfer::WriteRead { address: 0x10, bytes: vec![0x20], read_len: 2 },
            ]
        );
    }

    #[test]
    fn test_transfer_log_drops_oldest_when_full() {
        let mut bus = SimulatedBus::new();
        bus.add_device(0x10);
        bus.set_transfer_capacity(2);

        for value in 1..=3u8 {
            bus.write(0x10, &[0x20, value]).unwrap();
        }

        assert_eq!(
            bus.transfers(),
            &[
                Transfer::Write { address: 0x10, bytes: vec![0x20, 2] },
                Transfer::Write { address: 0x10, bytes: vec![0x20, 3] },
            ]
        );
        assert_eq!(bus.register(0x10, 0x20), 3);

        bus.set_transfer_capacity(1);
        assert_eq!(bus.transfers().len(), 1);
    }

    #[test]
    fn test_default_transfer_log_is_bounded() {
        let mut bus = SimulatedBus::new();
        bus.add_device(0x10);

        for _ in 0..TRANSFER_LOG_CAPACITY + 10 {
            bus.write(0x10, &[0x20, 0x01]).unwrap();
        }

        assert_eq!(bus.transfers().len(), TRANSFER_LOG_CAPACITY);
    }

    #[test]
    fn test_failed_device_recovers() {
        let mut bus = SimulatedBus::flight_stack();
        bus.fail_device(BAROMETER_ADDRESS);
        assert!(bus.write(BAROMETER_ADDRESS, &[0xF4, 0x2E]).is_err());

        bus.restore_device(BAROMETER_ADDRESS);
        assert!(bus.write(BAROMETER_ADDRESS, &[0xF4, 0x2E]).is_ok());
    }

    #[test]
    fn test_barometer_temperature_conversion() {
        let mut bus = SimulatedBus::flight_stack();
        bus.write(BAROMETER_ADDRESS, &[CONTROL_REGISTER, TEMPERATURE_COMMAND]).unwrap();

        assert_eq!(bus.register(BAROMETER_ADDRESS, 0xF6), 0x6C);
        assert_eq!(bus.register(BAROMETER_ADDRESS, 0xF7), 0xFA);
    }

    #[test]
    fn test_barometer_pressure_conversion_shifts_by_oversampling() {
        let mut bus = SimulatedBus::flight_stack();
        bus.set_uncompensated(27898, 0x5D23);
        bus.write(BAROMETER_ADDRESS, &[CONTROL_REGISTER, 0x34]).unwrap();

        assert_eq!(bus.register(BAROMETER_ADDRESS, 0xF6), 0x5D);
        assert_eq!(bus.register(BAROMETER_ADDRESS, 0xF7), 0x23);
        assert_eq!(bus.register(BAROMETER_ADDRESS, 0xF8), 0x00);
    }

    #[test]
    fn test_flight_stack_calibration_words() {
        let bus = SimulatedBus::flight_stack();
        // AC1 = 408 = 0x0198
        assert_eq!(bus.register(BAROMETER_ADDRESS, 0xAA), 0x01);
        assert_eq!(bus.register(BAROMETER_ADDRESS, 0xAB), 0x98);
        // MB = -32768
        assert_eq!(bus.register(BAROMETER_ADDRESS, 0xBA), 0x80);
        assert_eq!(bus.register(BAROMETER_ADDRESS, 0xBB), 0x00);
    }
}
