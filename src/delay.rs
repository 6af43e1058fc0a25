//! # Blocking Delay
//!
//! `embedded-hal` delay provider for hosted targets.

use embedded_hal::delay::DelayNs;
use std::thread;
use std::time::Duration;

/// Delay backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
