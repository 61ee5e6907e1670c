//! Human-readable statistics report

use std::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::relay::StatsSnapshot;

/// Format a timestamp as `seconds.nanoseconds` since the Unix epoch
fn format_time(time: Option<SystemTime>) -> String {
    match time.map(|t| t.duration_since(UNIX_EPOCH)) {
        Some(Ok(since)) => format!("{}.{:09}", since.as_secs(), since.subsec_nanos()),
        Some(Err(_)) | None => "never".to_string(),
    }
}

/// Render a snapshot as a multi-line text report
pub fn render(snapshot: &StatsSnapshot) -> String {
    let mut out = String::new();
    // Writing to a String can't fail
    let _ = writeln!(out, "Audio Relay Stats:");
    let _ = writeln!(out, "Last Read Time: {}", format_time(snapshot.last_read_time));
    let _ = writeln!(out, "Last Write Time: {}", format_time(snapshot.last_write_time));
    let _ = writeln!(out, "Total Buffer Size: {} bytes", snapshot.capacity);
    let _ = writeln!(out, "Current Buffer Usage: {} bytes", snapshot.occupied);
    let _ = writeln!(out, "Available Buffer Space: {} bytes", snapshot.free);
    let _ = writeln!(out, "Streaming: {}", if snapshot.active { "yes" } else { "no" });
    let _ = writeln!(out, "Buffer Overruns: {}", snapshot.overrun_count);
    let _ = writeln!(out, "Buffer Underruns: {}", snapshot.underrun_count);
    out
}

/// Render a snapshot as a single-line JSON object
pub fn render_json(snapshot: &StatsSnapshot) -> serde_json::Result<String> {
    serde_json::to_string(snapshot)
}
