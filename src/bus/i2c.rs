//! # I2C Register Bus
//!
//! Implements [`RegisterBus`] on top of any `embedded-hal` 1.0 I2C bus.
//!
//! When auto-increment is enabled and the register list is consecutive, a
//! whole group moves in one burst (`write` of `[first_register, bytes..]` or
//! `write_read` of `[first_register]`). Otherwise every register gets its
//! own transaction.

use embedded_hal::i2c::I2c;
use tracing::debug;

use super::codec::{assemble_word, split_word};
use super::{AutoIncrement, ByteOrder, RegisterBus, WordWidth};
use crate::error::{HalError, Result};

/// Register bus over an `embedded-hal` I2C peripheral
#[derive(Debug)]
pub struct I2cRegisterBus<I> {
    i2c: I,
}

impl<I: I2c> I2cRegisterBus<I> {
    /// Wrap an I2C peripheral
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Borrow the underlying peripheral
    pub fn inner(&self) -> &I {
        &self.i2c
    }

    /// Mutably borrow the underlying peripheral
    pub fn inner_mut(&mut self) -> &mut I {
        &mut self.i2c
    }

    /// Release the underlying peripheral
    pub fn into_inner(self) -> I {
        self.i2c
    }
}

fn is_consecutive(registers: &[u8]) -> bool {
    registers
        .windows(2)
        .all(|pair| pair[0].checked_add(1) == Some(pair[1]))
}

fn bus_error<E: embedded_hal::i2c::Error>(address: u8, error: E) -> HalError {
    HalError::BusTransaction {
        address,
        reason: format!("{:?}", error.kind()),
    }
}

impl<I: I2c> RegisterBus for I2cRegisterBus<I> {
    fn write(
        &mut self,
        address: u8,
        registers: &[u8],
        value: u32,
        order: ByteOrder,
        auto_increment: AutoIncrement,
    ) -> Result<()> {
        if registers.is_empty() || registers.len() > 4 {
            return Err(HalError::BusTransaction {
                address,
                reason: format!("cannot split a value across {} registers", registers.len()),
            });
        }

        let bytes = split_word(value, registers.len(), order);

        if auto_increment.is_enabled() && is_consecutive(registers) {
            let mut frame = Vec::with_capacity(bytes.len() + 1);
            frame.push(registers[0]);
            frame.extend_from_slice(&bytes);

            self.i2c
                .write(address, &frame)
                .map_err(|e| bus_error(address, e))?;
        } else {
            for (&register, &byte) in registers.iter().zip(&bytes) {
                self.i2c
                    .write(address, &[register, byte])
                    .map_err(|e| bus_error(address, e))?;
            }
        }

        debug!(
            "Wrote 0x{:X} to device 0x{:02X} registers {:02X?}",
            value, address, registers
        );
        Ok(())
    }

    fn read_words(
        &mut self,
        address: u8,
        registers: &[u8],
        out: &mut [u32],
        width: WordWidth,
        order: ByteOrder,
        auto_increment: AutoIncrement,
    ) -> Result<()> {
        let bytes_per_word = width.bytes();
        if registers.is_empty() || registers.len() != out.len() * bytes_per_word {
            return Err(HalError::BusTransaction {
                address,
                reason: format!(
                    "{} registers cannot fill {} words of {} bytes",
                    registers.len(),
                    out.len(),
                    bytes_per_word
                ),
            });
        }

        let mut raw = vec![0u8; registers.len()];

        if auto_increment.is_enabled() && is_consecutive(registers) {
            self.i2c
                .write_read(address, &[registers[0]], &mut raw)
                .map_err(|e| bus_error(address, e))?;
        } else {
            for (&register, slot) in registers.iter().zip(raw.iter_mut()) {
                let mut byte = [0u8; 1];
                self.i2c
                    .write_read(address, &[register], &mut byte)
                    .map_err(|e| bus_error(address, e))?;
                *slot = byte[0];
            }
        }

        for (word, chunk) in out.iter_mut().zip(raw.chunks_exact(bytes_per_word)) {
            *word = assemble_word(chunk, order);
        }

        debug!(
            "Read {} bytes from device 0x{:02X} starting at register 0x{:02X}",
            raw.len(),
            address,
            registers[0]
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::sim::{SimulatedBus, Transfer};

    fn bus_with_device(address: u8) -> I2cRegisterBus<SimulatedBus> {
        let mut sim = SimulatedBus::new();
        sim.add_device(address);
        I2cRegisterBus::new(sim)
    }

    #[test]
    fn test_is_consecutive() {
        assert!(is_consecutive(&[0x28, 0x29, 0x2A]));
        assert!(is_consecutive(&[0x10]));
        assert!(!is_consecutive(&[0x10, 0x12]));
        assert!(!is_consecutive(&[0xFF, 0x00]));
    }

    #[test]
    fn test_burst_write_splits_value_high_byte_first() {
        let mut bus = bus_with_device(0x0E);
        bus.write(0x0E, &[0x09, 0x0A], 0xFE94, ByteOrder::HighByteFirst, AutoIncrement::Enabled)
            .unwrap();

        assert_eq!(bus.inner().register(0x0E, 0x09), 0xFE);
        assert_eq!(bus.inner().register(0x0E, 0x0A), 0x94);
        assert_eq!(
            bus.inner().transfers(),
            &[Transfer::Write { address: 0x0E, bytes: vec![0x09, 0xFE, 0x94] }]
        );
    }

    #[test]
    fn test_write_without_auto_increment_uses_one_transaction_per_register() {
        let mut bus = bus_with_device(0x0E);
        bus.write(0x0E, &[0x11, 0x12], 0x0800, ByteOrder::HighByteFirst, AutoIncrement::Disabled)
            .unwrap();

        assert_eq!(bus.inner().transfers().len(), 2);
        assert_eq!(bus.inner().register(0x0E, 0x11), 0x08);
        assert_eq!(bus.inner().register(0x0E, 0x12), 0x00);
    }

    #[test]
    fn test_write_rejects_oversized_register_list() {
        let mut bus = bus_with_device(0x0E);
        let result = bus.write(
            0x0E,
            &[1, 2, 3, 4, 5],
            0,
            ByteOrder::HighByteFirst,
            AutoIncrement::Enabled,
        );
        assert!(matches!(result, Err(HalError::BusTransaction { address: 0x0E, .. })));
        assert!(bus.inner().transfers().is_empty());
    }

    #[test]
    fn test_read_words_little_endian() {
        let mut bus = bus_with_device(0x6B);
        bus.inner_mut().set_registers(0x6B, 0x28, &[0x00, 0x08, 0x00, 0xF8, 0x34, 0x12]);

        let mut words = [0u32; 3];
        bus.read_words(
            0x6B,
            &[0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D],
            &mut words,
            WordWidth::Bits16,
            ByteOrder::LowByteFirst,
            AutoIncrement::Enabled,
        )
        .unwrap();

        assert_eq!(words, [0x0800, 0xF800, 0x1234]);
        assert_eq!(bus.inner().transfers().len(), 1);
    }

    #[test]
    fn test_read_words_per_register_when_not_auto_incrementing() {
        let mut bus = bus_with_device(0x77);
        bus.inner_mut().set_registers(0x77, 0xF6, &[0x5D, 0x23, 0x00]);

        let mut word = [0u32; 1];
        bus.read_words(
            0x77,
            &[0xF6, 0xF7, 0xF8],
            &mut word,
            WordWidth::Bits24,
            ByteOrder::HighByteFirst,
            AutoIncrement::Disabled,
        )
        .unwrap();

        assert_eq!(word[0], 0x5D2300);
        assert_eq!(bus.inner().transfers().len(), 3);
    }

    #[test]
    fn test_read_words_size_mismatch() {
        let mut bus = bus_with_device(0x6B);
        let mut words = [0u32; 3];
        let result = bus.read_words(
            0x6B,
            &[0x28, 0x29, 0x2A],
            &mut words,
            WordWidth::Bits16,
            ByteOrder::LowByteFirst,
            AutoIncrement::Enabled,
        );
        assert!(result.is_err());
        assert!(bus.inner().transfers().is_empty());
    }

    #[test]
    fn test_nack_maps_to_bus_transaction_error() {
        let mut bus = I2cRegisterBus::new(SimulatedBus::new());
        let result = bus.write(0x50, &[0x00], 0x01, ByteOrder::HighByteFirst, AutoIncrement::Enabled);

        match result {
            Err(HalError::BusTransaction { address, reason }) => {
                assert_eq!(address, 0x50);
                assert!(reason.contains("NoAcknowledge"), "reason: {}", reason);
            }
            other => panic!("Expected BusTransaction error, got: {:?}", other),
        }
    }
}
