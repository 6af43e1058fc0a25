//! # Register Vector Reader
//!
//! Reads a 1- to 3-axis quantity spread across a run of device registers,
//! decodes each word as two's complement and scales it to engineering units.

use super::vector::Vector3;
use crate::bus::codec::to_signed;
use crate::bus::{AutoIncrement, ByteOrder, RegisterBus, WordWidth};
use crate::error::{HalError, Result};

/// Largest number of axes a single read can cover
pub const MAX_AXES: usize = 3;

/// Parameters of one vector read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterReadSpec<'a> {
    pub address: u8,
    /// Register groups in x, y, z order
    pub registers: &'a [u8],
    pub width: WordWidth,
    pub byte_order: ByteOrder,
    pub auto_increment: AutoIncrement,
    /// Raw counts per engineering unit
    pub divisor: f64,
}

impl RegisterReadSpec<'_> {
    /// Number of axes described by the register list.
    ///
    /// # Errors
    ///
    /// Returns `HalError::InvalidReadSpec` if the register count is not a
    /// whole number of words, covers zero or more than three axes, or the
    /// divisor cannot scale a value.
    pub fn axis_count(&self) -> Result<usize> {
        let bytes_per_value = self.width.bytes();
        let registers = self.registers.len();

        if registers % bytes_per_value != 0 {
            return Err(HalError::InvalidReadSpec(format!(
                "{} registers is not a multiple of {}-byte values",
                registers, bytes_per_value
            )));
        }

        let axes = registers / bytes_per_value;
        if axes == 0 || axes > MAX_AXES {
            return Err(HalError::InvalidReadSpec(format!(
                "{} registers of {}-byte values gives {} axes (must be 1-{})",
                registers, bytes_per_value, axes, MAX_AXES
            )));
        }

        if !self.divisor.is_finite() || self.divisor == 0.0 {
            return Err(HalError::InvalidReadSpec(format!(
                "divisor {} cannot scale a reading",
                self.divisor
            )));
        }

        Ok(axes)
    }
}

/// Perform one vector read.
///
/// The read spec is validated before touching the bus, so an invalid one never
/// produces a transaction. Axes not covered by the register list read as 0.
///
/// # Errors
///
/// Returns `HalError::InvalidReadSpec` for a malformed read spec and propagates
/// the bus error if the transaction fails.
///
/// # Examples
///
/// ```
/// use flight_hal::bus::i2c::I2cRegisterBus;
/// use flight_hal::bus::sim::SimulatedBus;
/// use flight_hal::bus::{AutoIncrement, ByteOrder, WordWidth};
/// use flight_hal::sensors::reader::{read_vector, RegisterReadSpec};
///
/// let mut sim = SimulatedBus::new();
/// sim.add_device(0x6B);
/// sim.set_registers(0x6B, 0x28, &[0x00, 0x08, 0x00, 0x00, 0x00, 0xF8]);
/// let mut bus = I2cRegisterBus::new(sim);
///
/// let spec = RegisterReadSpec {
///     address: 0x6B,
///     registers: &[0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D],
///     width: WordWidth::Bits16,
///     byte_order: ByteOrder::LowByteFirst,
///     auto_increment: AutoIncrement::Enabled,
///     divisor: 2048.0,
/// };
///
/// let v = read_vector(&mut bus, &spec)?;
/// assert_eq!((v.x, v.y, v.z), (1.0, 0.0, -1.0));
/// # Ok::<(), flight_hal::error::HalError>(())
/// ```
pub fn read_vector<B: RegisterBus + ?Sized>(
    bus: &mut B,
    spec: &RegisterReadSpec<'_>,
) -> Result<Vector3> {
    let axes = spec.axis_count()?;

    let mut words = [0u32; MAX_AXES];
    bus.read_words(
        spec.address,
        spec.registers,
        &mut words[..axes],
        spec.width,
        spec.byte_order,
        spec.auto_increment,
    )?;

    let mut components = [0.0f64; MAX_AXES];
    for (component, &word) in components.iter_mut().zip(&words[..axes]) {
        *component = f64::from(to_signed(word, spec.width.bit_width())) / spec.divisor;
    }

    Ok(Vector3::new(components[0], components[1], components[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockRegisterBus;

    fn spec(registers: &[u8], width: WordWidth) -> RegisterReadSpec<'_> {
        RegisterReadSpec {
            address: 0x6B,
            registers,
            width,
            byte_order: ByteOrder::LowByteFirst,
            auto_increment: AutoIncrement::Enabled,
            divisor: 2048.0,
        }
    }

    #[test]
    fn test_axis_count_valid() {
        assert_eq!(spec(&[1, 2, 3, 4, 5, 6], WordWidth::Bits16).axis_count().unwrap(), 3);
        assert_eq!(spec(&[1, 2], WordWidth::Bits16).axis_count().unwrap(), 1);
        assert_eq!(spec(&[1, 2, 3], WordWidth::Bits8).axis_count().unwrap(), 3);
        assert_eq!(
            spec(&[1, 2, 3, 4, 5, 6, 7, 8, 9], WordWidth::Bits24).axis_count().unwrap(),
            3
        );
    }

    #[test]
    fn test_axis_count_rejects_partial_words() {
        let result = spec(&[1, 2, 3, 4, 5], WordWidth::Bits16).axis_count();
        assert!(matches!(result, Err(HalError::InvalidReadSpec(_))));
    }

    #[test]
    fn test_axis_count_rejects_too_many_axes() {
        let result = spec(&[1, 2, 3, 4, 5, 6, 7, 8], WordWidth::Bits16).axis_count();
        assert!(matches!(result, Err(HalError::InvalidReadSpec(_))));
    }

    #[test]
    fn test_axis_count_rejects_empty_and_zero_divisor() {
        assert!(spec(&[], WordWidth::Bits16).axis_count().is_err());

        let mut zero = spec(&[1, 2], WordWidth::Bits16);
        zero.divisor = 0.0;
        assert!(zero.axis_count().is_err());
    }

    #[test]
    fn test_invalid_spec_performs_no_transaction() {
        let mut bus = MockRegisterBus::new();
        bus.expect_read_words().never();
        bus.expect_write().never();

        let result = read_vector(&mut bus, &spec(&[1, 2, 3, 4, 5], WordWidth::Bits16));
        assert!(matches!(result, Err(HalError::InvalidReadSpec(_))));

        let result = read_vector(&mut bus, &spec(&[0; 8], WordWidth::Bits16));
        assert!(matches!(result, Err(HalError::InvalidReadSpec(_))));
    }

    #[test]
    fn test_read_decodes_and_scales() {
        let mut bus = MockRegisterBus::new();
        bus.expect_read_words()
            .times(1)
            .returning(|address, registers, out, width, _, _| {
                assert_eq!(address, 0x6B);
                assert_eq!(registers.len(), 6);
                assert_eq!(width, WordWidth::Bits16);
                out.copy_from_slice(&[0x0800, 0xF800, 0x0400]);
                Ok(())
            });

        let v = read_vector(&mut bus, &spec(&[0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D], WordWidth::Bits16))
            .unwrap();
        assert_eq!(v, Vector3::new(1.0, -1.0, 0.5));
    }

    #[test]
    fn test_read_decodes_8_bit_words() {
        let mut bus = MockRegisterBus::new();
        bus.expect_read_words()
            .times(1)
            .returning(|_, registers, out, width, _, _| {
                assert_eq!(registers.len(), 3);
                assert_eq!(width, WordWidth::Bits8);
                out.copy_from_slice(&[0x80, 0x7F, 0x01]);
                Ok(())
            });

        let v = read_vector(&mut bus, &spec(&[0x28, 0x29, 0x2A], WordWidth::Bits8)).unwrap();
        assert_eq!(v, Vector3::new(-128.0 / 2048.0, 127.0 / 2048.0, 1.0 / 2048.0));
    }

    #[test]
    fn test_read_decodes_24_bit_words() {
        let mut bus = MockRegisterBus::new();
        bus.expect_read_words()
            .times(1)
            .returning(|_, registers, out, width, _, _| {
                assert_eq!(registers.len(), 9);
                assert_eq!(width, WordWidth::Bits24);
                out.copy_from_slice(&[0xFF_F800, 0x00_0800, 0x80_0000]);
                Ok(())
            });

        let registers = [0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18];
        let v = read_vector(&mut bus, &spec(&registers, WordWidth::Bits24)).unwrap();
        assert_eq!(v, Vector3::new(-1.0, 1.0, -4096.0));
    }

    #[test]
    fn test_24_bit_read_over_simulated_bus() {
        use crate::bus::i2c::I2cRegisterBus;
        use crate::bus::sim::SimulatedBus;

        let mut sim = SimulatedBus::new();
        sim.add_device(0x6B);
        sim.set_registers(
            0x6B,
            0x10,
            &[0x00, 0xF8, 0xFF, 0x00, 0x08, 0x00, 0xFF, 0xFF, 0x7F],
        );
        let mut bus = I2cRegisterBus::new(sim);

        let registers = [0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18];
        let v = read_vector(&mut bus, &spec(&registers, WordWidth::Bits24)).unwrap();
        assert_eq!(v, Vector3::new(-1.0, 1.0, 8_388_607.0 / 2048.0));
    }

    #[test]
    fn test_partial_read_fills_remaining_axes_with_zero() {
        let mut bus = MockRegisterBus::new();
        bus.expect_read_words()
            .times(1)
            .returning(|_, _, out, _, _, _| {
                assert_eq!(out.len(), 1);
                out[0] = 0x1000;
                Ok(())
            });

        let v = read_vector(&mut bus, &spec(&[0x28, 0x29], WordWidth::Bits16)).unwrap();
        assert_eq!(v, Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_bus_failure_propagates() {
        let mut bus = MockRegisterBus::new();
        bus.expect_read_words().times(1).returning(|address, _, _, _, _, _| {
            Err(HalError::BusTransaction { address, reason: "NoAcknowledge".to_string() })
        });

        let result = read_vector(&mut bus, &spec(&[0x28, 0x29], WordWidth::Bits16));
        assert!(matches!(result, Err(HalError::BusTransaction { address: 0x6B, .. })));
    }
}
