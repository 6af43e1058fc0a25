//! # Two's Complement and Byte Order Codec
//!
//! Sensor registers hold fixed-width two's-complement words, often split
//! across several 8-bit registers. This module converts between those raw
//! encodings and signed integers.
//!
//! ```
//! use flight_hal::bus::codec::{to_signed, to_unsigned, BitWidth};
//!
//! assert_eq!(to_signed(0xFFFF, BitWidth::BITS_16), -1);
//! assert_eq!(to_unsigned(-1, BitWidth::BITS_16), 0xFFFF);
//! assert_eq!(to_signed(0x7FFF, BitWidth::BITS_16), 32767);
//! ```

use super::ByteOrder;

/// Width of a two's-complement encoding, 1 to 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitWidth(u8);

impl BitWidth {
    pub const BITS_8: BitWidth = BitWidth(8);
    pub const BITS_16: BitWidth = BitWidth(16);
    pub const BITS_24: BitWidth = BitWidth(24);

    /// Creates a bit width, rejecting 0 and anything wider than 32 bits.
    #[must_use]
    pub const fn new(bits: u8) -> Option<Self> {
        if bits == 0 || bits > 32 {
            None
        } else {
            Some(Self(bits))
        }
    }

    /// Number of bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// 2^bits
    #[inline]
    const fn modulus(self) -> i64 {
        1i64 << self.0
    }
}

/// Interprets `raw` as a two's-complement value of the given width.
///
/// Bits above the width are ignored. Values above the largest positive
/// number (2^(bits-1) - 1) wrap to negative by subtracting 2^bits.
///
/// # Examples
///
/// ```
/// use flight_hal::bus::codec::{to_signed, BitWidth};
///
/// assert_eq!(to_signed(0x80, BitWidth::BITS_8), -128);
/// assert_eq!(to_signed(0x7F, BitWidth::BITS_8), 127);
/// assert_eq!(to_signed(0xFF_FFFE, BitWidth::BITS_24), -2);
/// ```
#[must_use]
pub fn to_signed(raw: u32, width: BitWidth) -> i32 {
    let modulus = width.modulus();
    let value = i64::from(raw) & (modulus - 1);
    let max_positive = (modulus >> 1) - 1;

    let signed = if value > max_positive {
        value - modulus
    } else {
        value
    };

    signed as i32
}

/// Encodes `value` as a two's-complement word of the given width.
///
/// Negative values map to 2^bits - |value|. Values that do not fit the
/// width are truncated to its low bits.
#[must_use]
pub fn to_unsigned(value: i32, width: BitWidth) -> u32 {
    let modulus = width.modulus();
    let value = i64::from(value);

    let encoded = if value < 0 {
        modulus - value.abs()
    } else {
        value
    };

    (encoded & (modulus - 1)) as u32
}

/// Combines register bytes into one word.
///
/// `bytes` are in register order; `order` says whether the first register
/// holds the most or least significant byte. At most 4 bytes are used.
#[must_use]
pub fn assemble_word(bytes: &[u8], order: ByteOrder) -> u32 {
    let bytes = &bytes[..bytes.len().min(4)];
    match order {
        ByteOrder::HighByteFirst => bytes
            .iter()
            .fold(0u32, |word, &byte| (word << 8) | u32::from(byte)),
        ByteOrder::LowByteFirst => bytes
            .iter()
            .rev()
            .fold(0u32, |word, &byte| (word << 8) | u32::from(byte)),
    }
}

/// Splits the low `count` bytes of `value` into register order.
///
/// Inverse of [`assemble_word`]. `count` is capped at 4.
#[must_use]
pub fn split_word(value: u32, count: usize, order: ByteOrder) -> Vec<u8> {
    let count = count.min(4);
    let mut bytes: Vec<u8> = (0..count)
        .map(|i| (value >> (8 * (count - 1 - i))) as u8)
        .collect();

    if order == ByteOrder::LowByteFirst {
        bytes.reverse();
    }

    bytes
}
