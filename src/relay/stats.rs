//! Transfer counters and the read-only statistics snapshot

use std::time::SystemTime;

use serde::Serialize;

/// Cumulative transfer statistics, kept under the relay lock
///
/// Survives reset and resize.
#[derive(Debug, Default, Clone)]
pub(crate) struct Counters {
    pub last_read_time: Option<SystemTime>,
    pub last_write_time: Option<SystemTime>,
    pub overrun_count: u64,
    pub underrun_count: u64,
}

impl Counters {
    pub fn record_read(&mut self) {
        self.last_read_time = Some(SystemTime::now());
    }

    pub fn record_write(&mut self) {
        self.last_write_time = Some(SystemTime::now());
    }

    pub fn record_overrun(&mut self) {
        self.overrun_count += 1;
    }

    pub fn record_underrun(&mut self) {
        self.underrun_count += 1;
    }
}

/// Consistent point-in-time view of the relay
///
/// All fields are read under a single lock acquisition. Formatting is left
/// to the reporting layer (see `report`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Current capacity in bytes
    pub capacity: usize,
    /// Unread bytes
    pub occupied: usize,
    /// Free space in bytes
    pub free: usize,
    /// Whether anything has been written since creation or the last reset
    pub active: bool,
    pub last_read_time: Option<SystemTime>,
    pub last_write_time: Option<SystemTime>,
    /// Writes that found the buffer full
    pub overrun_count: u64,
    /// Reads that found the buffer empty
    pub underrun_count: u64,
}
