//! # Fault Log
//!
//! Fail-open operations (sensor reads that fall back to a default, motor
//! commands that leave the previous output in place) record what went wrong
//! here instead of returning an error. Each fault is also emitted as a
//! `WARN` event through `tracing`.
//!
//! The log keeps the most recent faults and a running total, so a host can
//! poll it between control iterations.

use std::collections::VecDeque;
use std::fmt;

use tracing::warn;

use crate::error::{FaultKind, HalError};
use crate::sensors::devices::SensorKind;

/// Faults retained before the oldest are discarded
pub const FAULT_LOG_CAPACITY: usize = 64;

/// Component that reported a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSource {
    Sensor(SensorKind),
    Motor(usize),
}

impl fmt::Display for FaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultSource::Sensor(kind) => write!(f, "{}", kind),
            FaultSource::Motor(index) => write!(f, "motor {}", index),
        }
    }
}

/// One recorded fault
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: FaultKind,
    pub source: FaultSource,
    pub message: String,
}

/// Bounded record of fail-open faults
#[derive(Debug, Clone)]
pub struct FaultLog {
    recent: VecDeque<Fault>,
    capacity: usize,
    total: u64,
}

impl Default for FaultLog {
    fn default() -> Self {
        Self::with_capacity(FAULT_LOG_CAPACITY)
    }
}

impl FaultLog {
    /// Create a log retaining at most `capacity` faults (minimum 1)
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            recent: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    /// Record a fault and emit it as a warning
    pub fn record(&mut self, source: FaultSource, error: &HalError) {
        let kind = error.kind();
        warn!(source = %source, kind = ?kind, "{}", error);

        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(Fault {
            kind,
            source,
            message: error.to_string(),
        });
        self.total += 1;
    }

    /// Faults recorded since creation, including discarded ones
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Retained faults, oldest first
    pub fn recent(&self) -> impl Iterator<Item = &Fault> {
        self.recent.iter()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Fault> {
        self.recent.back()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    /// Remove and return the retained faults; the total is unchanged
    pub fn drain(&mut self) -> Vec<Fault> {
        self.recent.drain(..).collect()
    }
}
