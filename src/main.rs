//! audio-relay - demo harness
//!
//! Streams a test tone through a relay buffer from a generator thread to a
//! playback thread and logs buffer statistics while it runs.
//!
//! Usage: `audio-relay [settings.json]`. Without an argument the settings
//! are loaded from the platform config directory, which is seeded with
//! the defaults on first run.

use std::path::Path;
use std::process::ExitCode;

use audio_relay::harness;
use audio_relay::settings::RelaySettings;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting audio-relay");

    let settings = match std::env::args().nth(1) {
        Some(path) => RelaySettings::load_from(Path::new(&path)),
        None => RelaySettings::load(),
    };

    if let Err(e) = settings.validate() {
        log::error!("Invalid settings: {}", e);
        return ExitCode::FAILURE;
    }

    match harness::run(settings) {
        Ok(progress) => {
            log::info!(
                "Played {} frames (peak {}), generated {} bytes",
                progress.frames_played,
                progress.peak,
                progress.bytes_generated
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
