//! Circular byte storage and cursor bookkeeping
//!
//! `RingState` does the transfer arithmetic only. It has no locking of its
//! own; `StreamBuffer` keeps it behind a mutex and every method here assumes
//! the caller already holds exclusive access.
//!
//! ## Layout
//!
//! ```text
//!   0        read_cursor          write_cursor      capacity
//!   |-----------|######################|----------------|
//!                <------ occupied ----->
//! ```
//!
//! When `occupied` bytes straddle the end of `storage` the span is split
//! into two contiguous copies: `capacity - cursor` bytes first, then the
//! remainder from offset 0.

/// Ring buffer storage and cursors
#[derive(Debug)]
pub struct RingState {
    /// Backing bytes, `storage.len() == capacity`
    storage: Vec<u8>,
    /// Next byte to read, in `[0, capacity)`
    read_cursor: usize,
    /// Next byte to write, in `[0, capacity)`
    write_cursor: usize,
    /// Number of valid unread bytes
    occupied: usize,
    /// Set by the first write after creation or reset
    active: bool,
}

impl RingState {
    /// Create ring state over pre-allocated storage
    ///
    /// `storage` must not be empty.
    pub fn new(storage: Vec<u8>) -> Self {
        debug_assert!(!storage.is_empty(), "ring storage must not be empty");
        Self {
            storage,
            read_cursor: 0,
            write_cursor: 0,
            occupied: 0,
            active: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    #[cfg(test)]
    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    #[cfg(test)]
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Bytes available to a reader
    pub fn available_to_read(&self) -> usize {
        self.occupied
    }

    /// Free space available to a writer
    pub fn available_to_write(&self) -> usize {
        self.capacity() - self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn is_full(&self) -> bool {
        self.occupied == self.capacity()
    }

    /// Copy up to `dst.len()` unread bytes into `dst`
    ///
    /// Returns the number of bytes copied, which is less than `dst.len()`
    /// only when fewer bytes are buffered.
    pub fn copy_out(&mut self, dst: &mut [u8]) -> usize {
        let count = dst.len().min(self.occupied);
        if count == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let first = count.min(capacity - self.read_cursor);
        dst[..first].copy_from_slice(&self.storage[self.read_cursor..self.read_cursor + first]);
        // Wrapped remainder starts at offset 0
        dst[first..count].copy_from_slice(&self.storage[..count - first]);

        self.read_cursor = (self.read_cursor + count) % capacity;
        self.occupied -= count;
        count
    }

    /// Copy as much of `src` as fits into free space
    ///
    /// Returns the number of bytes stored. Any byte stored marks the ring
    /// as active.
    pub fn copy_in(&mut self, src: &[u8]) -> usize {
        let count = src.len().min(self.available_to_write());
        if count == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let first = count.min(capacity - self.write_cursor);
        self.storage[self.write_cursor..self.write_cursor + first].copy_from_slice(&src[..first]);
        self.storage[..count - first].copy_from_slice(&src[first..count]);

        self.write_cursor = (self.write_cursor + count) % capacity;
        self.occupied += count;
        self.active = true;
        count
    }

    /// Forget all buffered data
    ///
    /// Storage bytes are left as they are.
    pub fn reset(&mut self) {
        self.read_cursor = 0;
        self.write_cursor = 0;
        self.occupied = 0;
        self.active = false;
    }

    /// Swap in new storage and reset, returning the old storage
    pub fn replace_storage(&mut self, storage: Vec<u8>) -> Vec<u8> {
        debug_assert!(!storage.is_empty(), "ring storage must not be empty");
        let old = std::mem::replace(&mut self.storage, storage);
        self.reset();
        old
    }

    /// Check the cursor/count invariant
    pub fn invariant_holds(&self) -> bool {
        let capacity = self.capacity();
        self.occupied <= capacity
            && self.read_cursor < capacity
            && self.write_cursor < capacity
            && self.write_cursor == (self.read_cursor + self.occupied) % capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(capacity: usize) -> RingState {
        RingState::new(vec![0; capacity])
    }

    #[test]
    fn test_empty_ring() {
        let r = ring(8);
        assert!(r.is_empty());
        assert!(!r.is_full());
        assert!(!r.is_active());
        assert_eq!(r.available_to_read(), 0);
        assert_eq!(r.available_to_write(), 8);
        assert!(r.invariant_holds());
    }

    #[test]
    fn test_zero_length_is_noop() {
        let mut r = ring(8);
        assert_eq!(r.copy_in(&[]), 0);
        assert!(!r.is_active());

        let mut out = [0u8; 0];
        assert_eq!(r.copy_out(&mut out), 0);
        assert!(r.invariant_holds());
    }

    #[test]
    fn test_wraparound_scenario() {
        let mut r = ring(8);

        assert_eq!(r.copy_in(b"ABCDE"), 5);
        assert_eq!(r.occupied(), 5);
        assert_eq!(r.write_cursor(), 5);

        let mut out = [0u8; 3];
        assert_eq!(r.copy_out(&mut out), 3);
        assert_eq!(&out, b"ABC");
        assert_eq!(r.occupied(), 2);
        assert_eq!(r.read_cursor(), 3);

        assert_eq!(r.available_to_write(), 6);
        assert_eq!(r.copy_in(b"FGHIJK"), 6);
        assert!(r.is_full());
        assert_eq!(r.write_cursor(), 3);
        assert!(r.invariant_holds());

        let mut out = [0u8; 8];
        assert_eq!(r.copy_out(&mut out), 8);
        assert_eq!(&out, b"DEFGHIJK");
        assert!(r.is_empty());
        assert!(r.invariant_holds());
    }

    #[test]
    fn test_copy_bounded_by_space_and_data() {
        let mut r = ring(4);
        assert_eq!(r.copy_in(b"123456"), 4);
        assert_eq!(r.copy_in(b"7"), 0);

        let mut out = [0u8; 10];
        assert_eq!(r.copy_out(&mut out), 4);
        assert_eq!(&out[..4], b"1234");
        assert_eq!(r.copy_out(&mut out), 0);
    }

    #[test]
    fn test_cursor_lands_on_end() {
        let mut r = ring(4);
        r.copy_in(b"abcd");
        assert_eq!(r.write_cursor(), 0);

        let mut out = [0u8; 4];
        r.copy_out(&mut out);
        assert_eq!(r.read_cursor(), 0);
        assert!(r.invariant_holds());
    }

    #[test]
    fn test_fifo_across_many_wraps() {
        let mut r = ring(7);
        let input: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut output = Vec::new();
        let mut buf = [0u8; 5];

        let mut pos = 0;
        while output.len() < input.len() {
            let end = (pos + 3).min(input.len());
            pos += r.copy_in(&input[pos..end]);
            assert!(r.invariant_holds());

            let n = r.copy_out(&mut buf);
            output.extend_from_slice(&buf[..n]);
            assert!(r.invariant_holds());
        }

        assert_eq!(output, input);
    }

    #[test]
    fn test_reset() {
        let mut r = ring(8);
        r.copy_in(b"hello");
        let mut out = [0u8; 2];
        r.copy_out(&mut out);
        assert!(r.is_active());

        r.reset();
        assert!(r.is_empty());
        assert!(!r.is_active());
        assert_eq!(r.read_cursor(), 0);
        assert_eq!(r.write_cursor(), 0);
        assert_eq!(r.capacity(), 8);
    }

    #[test]
    fn test_replace_storage() {
        let mut r = ring(8);
        r.copy_in(b"hello");

        let old = r.replace_storage(vec![0; 3]);
        assert_eq!(old.len(), 8);
        assert_eq!(r.capacity(), 3);
        assert!(r.is_empty());
        assert!(r.invariant_holds());
    }
}
