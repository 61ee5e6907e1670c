//! Demo harness - drives the relay with a tone producer and a consumer
//!
//! The generator thread writes PCM chunks into the relay at a fixed pace;
//! the playback thread drains it as fast as data arrives, standing in for
//! an audio sink. Both threads use bounded waits so they notice a stop
//! request promptly, and `stop()` also interrupts any wait in progress.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::relay::{RelayError, StreamBuffer};
use crate::report;
use crate::settings::{RelaySettings, SettingsError};
use crate::tone::{peak_level, ToneGenerator, SAMPLE_BYTES};

/// Errors that stop the harness from running
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("Worker thread {0} panicked")]
    WorkerPanicked(String),
}

/// Progress counters shared with the worker threads
#[derive(Default)]
struct Progress {
    bytes_generated: AtomicU64,
    bytes_played: AtomicU64,
    peak: AtomicU32,
}

/// Point-in-time view of harness progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HarnessProgress {
    pub bytes_generated: u64,
    pub frames_played: u64,
    /// Largest absolute 16-bit sample consumed so far
    pub peak: u32,
}

/// Timing shared by both worker threads
#[derive(Clone, Copy)]
struct Pace {
    chunk_bytes: usize,
    frame_bytes: usize,
    poll_timeout: Duration,
}

fn run_generator(
    relay: StreamBuffer,
    mut tone: ToneGenerator,
    is_running: &AtomicBool,
    progress: &Progress,
    pace: Pace,
    interval: Duration,
) {
    log::info!("Generator thread started");

    while is_running.load(Ordering::Relaxed) {
        let chunk = tone.next_chunk(pace.chunk_bytes);
        let mut pos = 0;

        while pos < chunk.len() && is_running.load(Ordering::Relaxed) {
            match relay.write_timeout(&chunk[pos..], pace.poll_timeout) {
                Ok(n) => pos += n,
                // Buffer still full - check the stop flag and try again
                Err(RelayError::TimedOut) => {}
                Err(RelayError::Interrupted) => break,
                Err(e) => {
                    log::error!("Generator write failed: {}", e);
                    return;
                }
            }
        }

        progress.bytes_generated.fetch_add(pos as u64, Ordering::Relaxed);
        log::debug!("Generated and wrote {} bytes of audio data", pos);

        // stop() unparks us
        thread::park_timeout(interval);
    }

    log::info!("Generator thread stopped");
}

fn run_playback(relay: StreamBuffer, is_running: &AtomicBool, progress: &Progress, pace: Pace) {
    log::info!("Playback thread started");

    let mut buf = vec![0u8; pace.chunk_bytes];
    // Bytes of a frame split across two reads
    let mut pending = Vec::with_capacity(pace.chunk_bytes + pace.frame_bytes);

    while is_running.load(Ordering::Relaxed) {
        match relay.read_timeout(&mut buf, pace.poll_timeout) {
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let whole = pending.len() - pending.len() % pace.frame_bytes;
                let peak = peak_level(&pending[..whole]) as u32;
                pending.drain(..whole);

                progress.bytes_played.fetch_add(n as u64, Ordering::Relaxed);
                progress.peak.fetch_max(peak, Ordering::Relaxed);
                log::trace!("Played {} frames", whole / pace.frame_bytes);
            }
            // No data yet
            Err(RelayError::TimedOut) => {}
            Err(RelayError::Interrupted) => break,
            Err(e) => {
                log::error!("Playback read failed: {}", e);
                break;
            }
        }
    }

    log::info!("Playback thread stopped");
}

/// Producer/consumer pair exercising a shared relay
pub struct RelayHarness {
    /// The relay under test
    relay: StreamBuffer,

    settings: RelaySettings,

    /// Whether the worker threads should keep running
    is_running: Arc<AtomicBool>,

    progress: Arc<Progress>,

    threads: Vec<JoinHandle<()>>,

    /// Status message
    pub status: String,
}

impl RelayHarness {
    pub fn new(relay: StreamBuffer, settings: RelaySettings) -> Self {
        Self {
            relay,
            settings,
            is_running: Arc::new(AtomicBool::new(false)),
            progress: Arc::new(Progress::default()),
            threads: Vec::new(),
            status: "Ready".to_string(),
        }
    }

    /// Check if the worker threads are running
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    pub fn relay(&self) -> &StreamBuffer {
        &self.relay
    }

    /// Spawn the generator and playback threads
    ///
    /// Fails without spawning anything if the settings don't validate.
    pub fn start(&mut self) -> Result<(), HarnessError> {
        if !self.threads.is_empty() {
            return Ok(()); // Already running
        }

        if let Err(e) = self.settings.validate() {
            self.status = format!("Invalid settings: {}", e);
            return Err(e.into());
        }

        let tone = ToneGenerator::new(
            self.settings.sample_rate,
            self.settings.channels,
            self.settings.frequency,
        )
        .waveform(self.settings.waveform)
        .amplitude(self.settings.amplitude);

        let pace = Pace {
            chunk_bytes: self.settings.chunk_bytes,
            frame_bytes: tone.frame_bytes(),
            poll_timeout: Duration::from_millis(self.settings.poll_timeout_ms),
        };
        let interval = Duration::from_millis(self.settings.generator_interval_ms);

        self.is_running.store(true, Ordering::Relaxed);

        let playback = {
            let relay = self.relay.clone_ref();
            let is_running = Arc::clone(&self.is_running);
            let progress = Arc::clone(&self.progress);
            thread::Builder::new()
                .name("relay-playback".to_string())
                .spawn(move || run_playback(relay, &is_running, &progress, pace))
        };
        match playback {
            Ok(handle) => self.threads.push(handle),
            Err(e) => {
                self.is_running.store(false, Ordering::Relaxed);
                self.status = format!("Error starting playback: {}", e);
                return Err(e.into());
            }
        }

        let generator = {
            let relay = self.relay.clone_ref();
            let is_running = Arc::clone(&self.is_running);
            let progress = Arc::clone(&self.progress);
            thread::Builder::new()
                .name("relay-generator".to_string())
                .spawn(move || run_generator(relay, tone, &is_running, &progress, pace, interval))
        };
        match generator {
            Ok(handle) => self.threads.push(handle),
            Err(e) => {
                if let Err(stop_err) = self.stop() {
                    log::error!("{}", stop_err);
                }
                self.status = format!("Error starting generator: {}", e);
                return Err(e.into());
            }
        }

        self.status = format!(
            "Streaming: {:?} at {}Hz, {} ch",
            self.settings.waveform, self.settings.frequency, self.settings.channels
        );
        log::info!("Harness started");
        Ok(())
    }

    /// Stop both threads and wait for them to exit
    ///
    /// Every thread is joined; a worker that panicked is reported as
    /// `WorkerPanicked` once all of them have exited.
    pub fn stop(&mut self) -> Result<(), HarnessError> {
        self.is_running.store(false, Ordering::Relaxed);
        let mut panicked = None;

        for handle in self.threads.drain(..) {
            // A worker can begin a fresh wait between its flag check and
            // our interrupt, so keep cancelling until it exits
            while !handle.is_finished() {
                self.relay.interrupt();
                handle.thread().unpark();
                thread::sleep(Duration::from_millis(1));
            }
            let name = handle.thread().name().unwrap_or("unnamed").to_string();
            if handle.join().is_err() {
                log::error!("Harness thread {} panicked", name);
                panicked.get_or_insert(name);
            }
        }

        self.status = "Stopped".to_string();
        log::info!("Harness stopped");

        match panicked {
            Some(name) => Err(HarnessError::WorkerPanicked(name)),
            None => Ok(()),
        }
    }

    pub fn progress(&self) -> HarnessProgress {
        let frame_bytes = (self.settings.channels.max(1) as usize * SAMPLE_BYTES) as u64;
        HarnessProgress {
            bytes_generated: self.progress.bytes_generated.load(Ordering::Relaxed),
            frames_played: self.progress.bytes_played.load(Ordering::Relaxed) / frame_bytes,
            peak: self.progress.peak.load(Ordering::Relaxed),
        }
    }
}

impl Drop for RelayHarness {
    fn drop(&mut self) {
        if !self.threads.is_empty() {
            if let Err(e) = self.stop() {
                log::error!("{}", e);
            }
        }
    }
}

/// Build a relay from `settings`, stream for `run_seconds`, then stop
///
/// Logs a stats report every `stats_interval_ms`.
pub fn run(settings: RelaySettings) -> Result<HarnessProgress, HarnessError> {
    settings.validate()?;
    let relay = StreamBuffer::new(settings.initial_capacity, settings.max_capacity)?;
    let stats_interval = Duration::from_millis(settings.stats_interval_ms.max(10));
    let deadline = Instant::now() + Duration::from_secs(settings.run_seconds);

    let mut harness = RelayHarness::new(relay.clone_ref(), settings);
    harness.start()?;
    log::info!("{}", harness.status);

    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(stats_interval.min(deadline - now));
        let snapshot = relay.snapshot();
        log::info!("\n{}", report::render(&snapshot));
        match report::render_json(&snapshot) {
            Ok(json) => log::debug!("Stats: {}", json),
            Err(e) => log::warn!("Failed to serialize stats: {}", e),
        }
    }

    harness.stop()?;
    Ok(harness.progress())
}
