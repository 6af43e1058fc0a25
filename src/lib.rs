//! # Flight HAL
//!
//! Hardware abstraction for a quadrotor flight board: an IMU, magnetometer
//! and barometer on one register bus, and four ESCs on PWM outputs.
//!
//! This library provides register-level sensor access with two's-complement
//! decoding, the BMP180 compensation chain, a sensor lifecycle, and
//! thrust-to-duty mapping for the motors. Hardware is reached through
//! `embedded-hal` 1.0 traits, so the same code runs against real
//! peripherals or the bundled simulator.

pub mod bus;
pub mod config;
pub mod delay;
pub mod error;
pub mod fault;
pub mod motor;
pub mod sensors;
