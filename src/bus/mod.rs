//! # Register Bus Module
//!
//! The register-level contract the sensor layer is written against.
//!
//! This module handles:
//! - The [`RegisterBus`] trait (multi-register writes and word reads)
//! - Byte order, auto-increment and word width descriptors
//! - Two's-complement decoding ([`codec`])
//! - An `embedded-hal` I2C adapter ([`i2c`]) and an in-memory device simulator ([`sim`])

pub mod codec;
pub mod i2c;
pub mod sim;

use crate::error::Result;
use codec::BitWidth;

/// Which register of a multi-byte group holds the most significant byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// First register is the most significant byte
    HighByteFirst,
    /// First register is the least significant byte
    LowByteFirst,
}

/// Whether the device advances its register pointer after each byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoIncrement {
    Enabled,
    Disabled,
}

impl AutoIncrement {
    #[inline]
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self == AutoIncrement::Enabled
    }
}

/// Width of one word read from a group of registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordWidth {
    Bits8,
    Bits16,
    Bits24,
}

impl WordWidth {
    /// Registers (bytes) per word
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            WordWidth::Bits8 => 1,
            WordWidth::Bits16 => 2,
            WordWidth::Bits24 => 3,
        }
    }

    /// Two's-complement width of a word
    #[must_use]
    pub const fn bit_width(self) -> BitWidth {
        match self {
            WordWidth::Bits8 => BitWidth::BITS_8,
            WordWidth::Bits16 => BitWidth::BITS_16,
            WordWidth::Bits24 => BitWidth::BITS_24,
        }
    }
}

/// Register-level bus transactions.
///
/// Implementations perform blocking transfers and are not reentrant; a host
/// that shares one physical bus between threads must serialize access.
#[cfg_attr(test, mockall::automock)]
pub trait RegisterBus {
    /// Write `value` split across `registers` (one byte per register).
    ///
    /// # Errors
    ///
    /// Returns `HalError::BusTransaction` if the device does not accept the write.
    fn write(
        &mut self,
        address: u8,
        registers: &[u8],
        value: u32,
        order: ByteOrder,
        auto_increment: AutoIncrement,
    ) -> Result<()>;

    /// Read one word per group of `width.bytes()` registers into `out`.
    ///
    /// `registers.len()` must equal `out.len() * width.bytes()`.
    ///
    /// # Errors
    ///
    /// Returns `HalError::BusTransaction` if the transfer fails or the
    /// buffer sizes disagree.
    fn read_words(
        &mut self,
        address: u8,
        registers: &[u8],
        out: &mut [u32],
        width: WordWidth,
        order: ByteOrder,
        auto_increment: AutoIncrement,
    ) -> Result<()>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn write(
        &mut self,
        address: u8,
        registers: &[u8],
        value: u32,
        order: ByteOrder,
        auto_increment: AutoIncrement,
    ) -> Result<()> {
        (**self).write(address, registers, value, order, auto_increment)
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
        (**self).read_words(address, registers, out, width, order, auto_increment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_width_bytes() {
        assert_eq!(WordWidth::Bits8.bytes(), 1);
        assert_eq!(WordWidth::Bits16.bytes(), 2);
        assert_eq!(WordWidth::Bits24.bytes(), 3);
        assert_eq!(WordWidth::Bits24.bit_width().bits(), 24);
    }

    #[test]
    fn test_auto_increment_flag() {
        assert!(AutoIncrement::Enabled.is_enabled());
        assert!(!AutoIncrement::Disabled.is_enabled());
    }
}
