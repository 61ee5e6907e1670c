//! Shared stream buffer with blocking and non-blocking transfers
//!
//! This module turns the bare `RingState` arithmetic into the caller-facing
//! `read`/`write` operations. One mutex guards all shared state; two
//! condition variables carry the "data available" and "space available"
//! wakeups.
//!
//! ## Wait discipline
//!
//! A blocked caller releases the lock while suspended and re-checks its
//! predicate after every wakeup. Wakeups are broadcast, so several waiters
//! may race for one freed unit; the loser simply waits again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::control::{allocate, validate_capacity};
use super::error::{RelayError, Result};
use super::ring::RingState;
use super::stats::{Counters, StatsSnapshot};

/// Caller-selected transfer behaviour when the buffer cannot proceed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Wait for data or space
    #[default]
    Blocking,
    /// Fail with `WouldBlock` instead of waiting
    NonBlocking,
}

impl Mode {
    pub fn from_blocking(blocking: bool) -> Self {
        if blocking {
            Mode::Blocking
        } else {
            Mode::NonBlocking
        }
    }
}

/// How long a transfer may wait for its predicate
#[derive(Clone, Copy, Debug)]
enum Wait {
    Never,
    Forever,
    Until(Instant),
}

impl From<Mode> for Wait {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Blocking => Wait::Forever,
            Mode::NonBlocking => Wait::Never,
        }
    }
}

/// Everything guarded by the relay lock
pub(super) struct Inner {
    pub ring: RingState,
    pub counters: Counters,
    /// Bumped by `interrupt()`; waiters that see it change give up
    pub interrupt_epoch: u64,
}

pub(super) struct Shared {
    pub state: Mutex<Inner>,
    pub data_ready: Condvar,
    pub space_ready: Condvar,
    /// Largest capacity `set_capacity` accepts
    pub max_capacity: usize,
}

impl Shared {
    /// Wake every waiter of both kinds so they re-evaluate their predicates
    pub fn wake_all(&self) {
        self.data_ready.notify_all();
        self.space_ready.notify_all();
    }
}

/// Bounded byte-stream relay between producers and consumers
///
/// Cloning is cheap and yields another handle to the same buffer, so the
/// relay can be passed to any number of producer and consumer threads.
///
/// ## Example
///
/// ```
/// use audio_relay::{Mode, StreamBuffer};
///
/// let relay = StreamBuffer::new(1024, 4096).unwrap();
///
/// // Producer thread:
/// relay.write(b"pcm bytes", Mode::Blocking).unwrap();
///
/// // Consumer thread:
/// let bytes = relay.read(512, Mode::NonBlocking).unwrap();
/// assert_eq!(bytes, b"pcm bytes");
/// ```
pub struct StreamBuffer {
    pub(super) shared: Arc<Shared>,
}

impl StreamBuffer {
    /// Create a relay with `capacity` bytes of storage
    ///
    /// `max_capacity` is the ceiling later enforced by `set_capacity`.
    /// Fails with `InvalidArgument` if `capacity` is zero or above the
    /// ceiling, and with `OutOfMemory` if the storage can't be allocated.
    pub fn new(capacity: usize, max_capacity: usize) -> Result<Self> {
        validate_capacity(capacity, max_capacity)?;
        let storage = allocate(capacity)?;

        log::info!(
            "Relay created: {} bytes (max {} bytes)",
            capacity,
            max_capacity
        );

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Inner {
                    ring: RingState::new(storage),
                    counters: Counters::default(),
                    interrupt_epoch: 0,
                }),
                data_ready: Condvar::new(),
                space_ready: Condvar::new(),
                max_capacity,
            }),
        })
    }

    /// Create a relay whose capacity can only shrink
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(capacity, capacity)
    }

    /// Read up to `dst.len()` bytes into `dst`
    ///
    /// With `Mode::Blocking` an empty buffer suspends the caller until a
    /// writer adds data or `interrupt()` cancels the wait. A zero-length
    /// `dst` returns `Ok(0)` immediately.
    pub fn read_into(&self, dst: &mut [u8], mode: Mode) -> Result<usize> {
        self.read_with(dst.len(), mode.into(), |ring| {
            let count = ring.copy_out(dst);
            (count, count)
        })
    }

    /// Read up to `max_len` bytes into a new vector
    ///
    /// The vector is sized by what is buffered, not by `max_len`, so any
    /// `max_len` is accepted.
    pub fn read(&self, max_len: usize, mode: Mode) -> Result<Vec<u8>> {
        self.read_with(max_len, mode.into(), |ring| {
            let mut buf = vec![0u8; max_len.min(ring.available_to_read())];
            let count = ring.copy_out(&mut buf);
            (count, buf)
        })
    }

    /// Blocking read that gives up with `TimedOut` after `timeout`
    pub fn read_timeout(&self, dst: &mut [u8], timeout: Duration) -> Result<usize> {
        self.read_with(dst.len(), deadline(timeout), |ring| {
            let count = ring.copy_out(dst);
            (count, count)
        })
    }

    /// Write as much of `src` as fits, returning the number of bytes stored
    ///
    /// With `Mode::Blocking` a full buffer suspends the caller until a
    /// reader frees space or `interrupt()` cancels the wait. The count may
    /// be less than `src.len()`; callers loop to push the rest.
    pub fn write(&self, src: &[u8], mode: Mode) -> Result<usize> {
        self.write_with(src, mode.into())
    }

    /// Blocking write that gives up with `TimedOut` after `timeout`
    pub fn write_timeout(&self, src: &[u8], timeout: Duration) -> Result<usize> {
        self.write_with(src, deadline(timeout))
    }

    /// Wait for data, then let `take` copy out of the ring under the lock
    ///
    /// `take` returns the byte count it consumed alongside its result.
    fn read_with<T>(
        &self,
        wanted: usize,
        wait: Wait,
        take: impl FnOnce(&mut RingState) -> (usize, T),
    ) -> Result<T> {
        let mut state = self.shared.state.lock();
        if wanted == 0 {
            // Copies nothing; never waits or counts
            return Ok(take(&mut state.ring).1);
        }

        if state.ring.is_empty() {
            state.counters.record_underrun();
        }

        wait_ready(&self.shared.data_ready, &mut state, wait, |ring| {
            ring.available_to_read() > 0
        })?;

        let (count, taken) = take(&mut state.ring);
        debug_assert!(state.ring.invariant_holds());
        state.counters.record_read();
        drop(state);

        self.shared.space_ready.notify_all();
        log::trace!("Read {} bytes", count);
        Ok(taken)
    }

    fn write_with(&self, src: &[u8], wait: Wait) -> Result<usize> {
        if src.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.state.lock();
        if state.ring.is_full() {
            state.counters.record_overrun();
        }

        wait_ready(&self.shared.space_ready, &mut state, wait, |ring| {
            ring.available_to_write() > 0
        })?;

        let count = state.ring.copy_in(src);
        debug_assert!(state.ring.invariant_holds());
        state.counters.record_write();
        drop(state);

        self.shared.data_ready.notify_all();
        log::trace!("Wrote {} bytes", count);
        Ok(count)
    }

    /// Store a single byte without waiting
    ///
    /// Returns `false` and counts an overrun if the buffer is full.
    pub fn write_byte(&self, byte: u8) -> bool {
        let mut state = self.shared.state.lock();
        if state.ring.copy_in(&[byte]) == 0 {
            state.counters.record_overrun();
            return false;
        }
        state.counters.record_write();
        drop(state);

        self.shared.data_ready.notify_all();
        true
    }

    /// Take a single byte without waiting
    ///
    /// Returns `None` and counts an underrun if the buffer is empty.
    pub fn read_byte(&self) -> Option<u8> {
        let mut byte = [0u8; 1];
        let mut state = self.shared.state.lock();
        if state.ring.copy_out(&mut byte) == 0 {
            state.counters.record_underrun();
            return None;
        }
        state.counters.record_read();
        drop(state);

        self.shared.space_ready.notify_all();
        Some(byte[0])
    }

    /// Cancel every wait currently blocked in `read` or `write`
    ///
    /// Each cancelled caller gets `Interrupted`. Calls that start waiting
    /// after this returns are not affected.
    pub fn interrupt(&self) {
        let mut state = self.shared.state.lock();
        state.interrupt_epoch = state.interrupt_epoch.wrapping_add(1);
        drop(state);

        self.shared.wake_all();
        log::debug!("Relay waiters interrupted");
    }

    /// Take a consistent snapshot of capacity, usage and counters
    pub fn snapshot(&self) -> StatsSnapshot {
        let state = self.shared.state.lock();
        StatsSnapshot {
            capacity: state.ring.capacity(),
            occupied: state.ring.occupied(),
            free: state.ring.available_to_write(),
            active: state.ring.is_active(),
            last_read_time: state.counters.last_read_time,
            last_write_time: state.counters.last_write_time,
            overrun_count: state.counters.overrun_count,
            underrun_count: state.counters.underrun_count,
        }
    }

    /// Clone the handle to share with another thread
    pub fn clone_ref(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_ring<R>(&self, f: impl FnOnce(&RingState) -> R) -> R {
        f(&self.shared.state.lock().ring)
    }
}

impl Clone for StreamBuffer {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}

impl std::fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("max_capacity", &self.shared.max_capacity)
            .finish_non_exhaustive()
    }
}

fn deadline(timeout: Duration) -> Wait {
    match Instant::now().checked_add(timeout) {
        Some(at) => Wait::Until(at),
        None => Wait::Forever,
    }
}

/// Suspend on `condvar` until `ready` holds for the ring
///
/// Returns with the lock held and the predicate true, or with an error and
/// the predicate still false.
fn wait_ready(
    condvar: &Condvar,
    state: &mut MutexGuard<'_, Inner>,
    wait: Wait,
    ready: impl Fn(&RingState) -> bool,
) -> Result<()> {
    let epoch = state.interrupt_epoch;

    while !ready(&state.ring) {
        if state.interrupt_epoch != epoch {
            log::debug!("Relay wait interrupted");
            return Err(RelayError::Interrupted);
        }

        match wait {
            Wait::Never => return Err(RelayError::WouldBlock),
            Wait::Forever => condvar.wait(state),
            Wait::Until(at) => {
                if Instant::now() >= at {
                    return Err(RelayError::TimedOut);
                }
                condvar.wait_until(state, at);
            }
        }
    }

    Ok(())
}
