//! Relay module - the shared byte-stream buffer
//!
//! This module provides:
//! - Circular byte storage with wraparound transfers
//! - Blocking/non-blocking read and write with interruptible waits
//! - Capacity resize and reset control operations
//! - Statistics snapshots and `std::io` handles

mod control;
mod error;
mod handle;
mod ring;
mod stats;
mod stream;

// Re-export public types
pub use error::{RelayError, Result};
pub use handle::RelayHandle;
pub use stats::StatsSnapshot;
pub use stream::{Mode, StreamBuffer};
