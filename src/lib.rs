//! audio-relay - bounded byte-stream relay for audio pipelines
//!
//! Decouples the timing of audio producers from the timing of consumers
//! through a shared circular byte buffer with blocking and non-blocking
//! transfers, interruptible waits, and in-place capacity changes.
//!
//! ## Modules
//! - `relay`: the ring buffer engine, control operations and stats snapshot
//! - `settings`: persisted configuration
//! - `tone`, `harness`, `report`: the demo producer/consumer pair and its
//!   text report

pub mod harness;
pub mod relay;
pub mod report;
pub mod settings;
pub mod tone;

pub use relay::{Mode, RelayError, RelayHandle, Result, StatsSnapshot, StreamBuffer};
