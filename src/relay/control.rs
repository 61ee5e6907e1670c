//! Capacity and reset control operations
//!
//! Resizing allocates the new storage before taking the lock, then swaps it
//! in and resets the cursors. Buffered data is discarded: callers lose any
//! bytes in flight when the capacity changes.

use super::error::{RelayError, Result};
use super::stream::StreamBuffer;

/// Reject zero and over-limit capacities
pub(crate) fn validate_capacity(requested: usize, max: usize) -> Result<()> {
    if requested == 0 || requested > max {
        return Err(RelayError::InvalidArgument { requested, max });
    }
    Ok(())
}

/// Allocate zeroed storage, reporting failure instead of aborting
pub(crate) fn allocate(capacity: usize) -> Result<Vec<u8>> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(capacity)
        .map_err(|_| RelayError::OutOfMemory {
            requested: capacity,
        })?;
    storage.resize(capacity, 0);
    Ok(storage)
}

impl StreamBuffer {
    /// Current capacity in bytes
    pub fn capacity(&self) -> usize {
        self.shared.state.lock().ring.capacity()
    }

    /// Largest capacity `set_capacity` accepts
    pub fn max_capacity(&self) -> usize {
        self.shared.max_capacity
    }

    /// Whether anything has been written since creation or the last reset
    pub fn is_active(&self) -> bool {
        self.shared.state.lock().ring.is_active()
    }

    /// Discard all buffered data
    ///
    /// Every blocked reader and writer is woken to re-check against the
    /// emptied buffer.
    pub fn reset(&self) {
        self.shared.state.lock().ring.reset();
        self.shared.wake_all();
        log::info!("Relay reset");
    }

    /// Replace the storage with `new_capacity` bytes
    ///
    /// Fails with `InvalidArgument` for zero or anything above
    /// `max_capacity()`, and with `OutOfMemory` if allocation fails. On
    /// failure the buffer is untouched and keeps its data. On success all
    /// buffered data is discarded and every blocked caller re-checks
    /// against the new capacity.
    pub fn set_capacity(&self, new_capacity: usize) -> Result<()> {
        if let Err(e) = validate_capacity(new_capacity, self.shared.max_capacity) {
            log::warn!("Rejected resize: {}", e);
            return Err(e);
        }
        let storage = allocate(new_capacity)?;

        let mut state = self.shared.state.lock();
        let old = state.ring.replace_storage(storage);
        drop(state);

        self.shared.wake_all();
        log::info!("Relay resized: {} -> {} bytes", old.len(), new_capacity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::relay::Mode;

    #[test]
    fn test_validate_capacity() {
        assert!(validate_capacity(1, 8).is_ok());
        assert!(validate_capacity(8, 8).is_ok());
        assert_eq!(
            validate_capacity(0, 8),
            Err(RelayError::InvalidArgument { requested: 0, max: 8 })
        );
        assert!(validate_capacity(9, 8).is_err());
    }

    #[test]
    fn test_new_rejects_bad_capacity() {
        assert!(StreamBuffer::new(0, 8).is_err());
        assert!(StreamBuffer::new(9, 8).is_err());
    }

    #[test]
    fn test_allocate_failure() {
        assert_eq!(
            allocate(usize::MAX),
            Err(RelayError::OutOfMemory {
                requested: usize::MAX
            })
        );
    }

    #[test]
    fn test_resize_rejects_invalid_and_keeps_state() {
        let r = StreamBuffer::new(8, 16).unwrap();
        r.write(b"ABCDE", Mode::NonBlocking).unwrap();
        r.read(2, Mode::NonBlocking).unwrap();

        assert!(matches!(
            r.set_capacity(0),
            Err(RelayError::InvalidArgument { .. })
        ));
        assert!(matches!(
            r.set_capacity(17),
            Err(RelayError::InvalidArgument { .. })
        ));

        assert_eq!(r.capacity(), 8);
        r.with_ring(|ring| {
            assert_eq!(ring.occupied(), 3);
            assert_eq!(ring.read_cursor(), 2);
            assert_eq!(ring.write_cursor(), 5);
        });
        assert_eq!(r.read(8, Mode::NonBlocking).unwrap(), b"CDE");
    }

    #[test]
    fn test_resize_discards_data() {
        let r = StreamBuffer::new(8, 16).unwrap();
        r.write(b"stale", Mode::NonBlocking).unwrap();

        r.set_capacity(16).unwrap();
        assert_eq!(r.capacity(), 16);

        let snap = r.snapshot();
        assert_eq!(snap.occupied, 0);
        assert_eq!(snap.free, 16);
        assert!(!snap.active);
        assert_eq!(r.read(16, Mode::NonBlocking), Err(RelayError::WouldBlock));

        r.write(b"fresh", Mode::NonBlocking).unwrap();
        assert_eq!(r.read(16, Mode::NonBlocking).unwrap(), b"fresh");
    }

    #[test]
    fn test_resize_wakes_blocked_writer() {
        let r = StreamBuffer::new(4, 16).unwrap();
        r.write(b"full", Mode::Blocking).unwrap();

        let writer = r.clone();
        let handle = thread::spawn(move || writer.write(b"after", Mode::Blocking));

        thread::sleep(Duration::from_millis(50));
        r.set_capacity(8).unwrap();

        assert_eq!(handle.join().unwrap(), Ok(5));
        assert_eq!(r.read(8, Mode::Blocking).unwrap(), b"after");
    }

    #[test]
    fn test_resize_keeps_blocked_reader_waiting_on_new_state() {
        let r = StreamBuffer::new(4, 16).unwrap();
        let reader = r.clone();
        let handle = thread::spawn(move || reader.read(8, Mode::Blocking));

        thread::sleep(Duration::from_millis(50));
        r.set_capacity(2).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        r.write(b"hi!", Mode::Blocking).unwrap();
        assert_eq!(handle.join().unwrap().unwrap(), b"hi");
    }

    #[test]
    fn test_reset_wakes_blocked_writer() {
        let r = StreamBuffer::with_capacity(3).unwrap();
        r.write(b"abc", Mode::Blocking).unwrap();

        let writer = r.clone();
        let handle = thread::spawn(move || writer.write(b"xyz", Mode::Blocking));

        thread::sleep(Duration::from_millis(50));
        r.reset();

        assert_eq!(handle.join().unwrap(), Ok(3));
        assert_eq!(r.read(3, Mode::Blocking).unwrap(), b"xyz");
    }

    #[test]
    fn test_counters_survive_reset() {
        let r = StreamBuffer::with_capacity(4).unwrap();
        let _ = r.read(1, Mode::NonBlocking);
        r.write(b"a", Mode::NonBlocking).unwrap();
        r.reset();

        let snap = r.snapshot();
        assert_eq!(snap.underrun_count, 1);
        assert!(snap.last_write_time.is_some());
        assert!(!r.is_active());
    }
}
