//! Open handles with `std::io` semantics
//!
//! A handle pairs a relay with a blocking mode, the way an open file carries
//! its own non-blocking flag. Relay errors surface as `io::Error` with the
//! matching `ErrorKind`.
//!
//! Note that `read_exact`/`write_all` retry on `ErrorKind::Interrupted`, so
//! `interrupt()` only cancels the current wait of a handle driven through
//! those helpers.

use std::io;

use super::stream::{Mode, StreamBuffer};

/// A reader/writer endpoint on a shared relay
#[derive(Debug)]
pub struct RelayHandle {
    buffer: StreamBuffer,
    mode: Mode,
}

impl StreamBuffer {
    /// Open a handle with the given blocking mode
    pub fn open(&self, mode: Mode) -> RelayHandle {
        log::info!("Relay handle opened ({:?})", mode);
        RelayHandle {
            buffer: self.clone_ref(),
            mode,
        }
    }
}

impl RelayHandle {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// The relay this handle reads from and writes to
    pub fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }
}

impl io::Read for RelayHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.buffer.read_into(buf, self.mode)?)
    }
}

impl io::Write for RelayHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.buffer.write(buf, self.mode)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        log::info!("Relay handle closed");
    }
}
