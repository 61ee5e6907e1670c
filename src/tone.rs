//! Test tone generator
//!
//! Synthesises interleaved signed 16-bit little-endian PCM for the demo
//! harness. Every channel of a frame carries the same sample. Phase carries
//! over between chunks so consecutive chunks join without clicks.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

/// Bytes per sample (16-bit PCM)
pub const SAMPLE_BYTES: usize = 2;

/// Tone waveform shapes
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Waveform {
    /// Smooth sine wave
    Sine,
    /// Linear triangle wave
    Triangle,
    /// Abrupt square wave
    Square,
    /// Rising sawtooth
    Sawtooth,
}

impl Waveform {
    /// Sample the waveform at phase (0.0 to 1.0)
    /// Returns value in range -1.0 to 1.0
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * TAU).sin(),

            Waveform::Triangle => {
                let p = phase * 4.0;
                if p < 1.0 {
                    p
                } else if p < 3.0 {
                    2.0 - p
                } else {
                    p - 4.0
                }
            }

            Waveform::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }

            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

/// Periodic PCM tone source
#[derive(Clone, Debug)]
pub struct ToneGenerator {
    /// Tone frequency in Hz
    pub frequency: f32,
    /// Peak level (0.0 to 1.0)
    pub amplitude: f32,
    pub waveform: Waveform,
    sample_rate: u32,
    channels: u16,
    /// Current phase (0.0 to 1.0)
    phase: f32,
}

impl ToneGenerator {
    pub fn new(sample_rate: u32, channels: u16, frequency: f32) -> Self {
        Self {
            frequency,
            amplitude: 1.0,
            waveform: Waveform::Sine,
            sample_rate,
            channels,
            phase: 0.0,
        }
    }

    /// Set the waveform
    pub fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Set the peak level, clamped to 0.0..=1.0
    pub fn amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Bytes in one interleaved frame
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * SAMPLE_BYTES
    }

    /// Fill `out` with whole frames, returning the number of bytes written
    ///
    /// A trailing partial frame is left untouched.
    pub fn fill(&mut self, out: &mut [u8]) -> usize {
        let frame_bytes = self.frame_bytes();
        let step = self.frequency / self.sample_rate as f32;
        let mut written = 0;

        for frame in out.chunks_exact_mut(frame_bytes) {
            let value = self.waveform.sample(self.phase) * self.amplitude;
            let pcm = (value * i16::MAX as f32) as i16;
            for sample in frame.chunks_exact_mut(SAMPLE_BYTES) {
                sample.copy_from_slice(&pcm.to_le_bytes());
            }

            self.phase = (self.phase + step).fract();
            written += frame_bytes;
        }

        written
    }

    /// Generate roughly `bytes` worth of whole frames
    pub fn next_chunk(&mut self, bytes: usize) -> Vec<u8> {
        let mut chunk = vec![0u8; bytes - bytes % self.frame_bytes()];
        self.fill(&mut chunk);
        chunk
    }
}

/// Largest absolute sample in a block of 16-bit little-endian PCM
pub fn peak_level(pcm: &[u8]) -> i16 {
    pcm.chunks_exact(SAMPLE_BYTES)
        .map(|s| i16::from_le_bytes([s[0], s[1]]).saturating_abs())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_sine() {
        assert!((Waveform::Sine.sample(0.0) - 0.0).abs() < 0.01);
        assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 0.01);
        assert!((Waveform::Sine.sample(0.75) - (-1.0)).abs() < 0.01);
    }

    #[test]
    fn test_waveform_square() {
        assert_eq!(Waveform::Square.sample(0.25), 1.0);
        assert_eq!(Waveform::Square.sample(0.75), -1.0);
    }

    #[test]
    fn test_stereo_frames_are_duplicated() {
        let mut tone = ToneGenerator::new(44100, 2, 440.0);
        let chunk = tone.next_chunk(64);
        assert_eq!(chunk.len(), 64);

        for frame in chunk.chunks_exact(4) {
            assert_eq!(frame[0..2], frame[2..4]);
        }
    }

    #[test]
    fn test_partial_frame_dropped() {
        let mut tone = ToneGenerator::new(44100, 2, 440.0);
        assert_eq!(tone.next_chunk(10).len(), 8);

        let mut out = [0xAAu8; 6];
        assert_eq!(tone.fill(&mut out), 4);
        assert_eq!(out[4..], [0xAA, 0xAA]);
    }

    #[test]
    fn test_square_peak() {
        let mut tone = ToneGenerator::new(8000, 1, 100.0)
            .waveform(Waveform::Square)
            .amplitude(0.5);
        let chunk = tone.next_chunk(200);
        let peak = peak_level(&chunk);
        assert!((peak as i32 - i16::MAX as i32 / 2).abs() <= 1);
    }

    #[test]
    fn test_phase_continues_across_chunks() {
        let mut split = ToneGenerator::new(44100, 1, 440.0);
        let mut whole = ToneGenerator::new(44100, 1, 440.0);

        let mut joined = split.next_chunk(100);
        joined.extend(split.next_chunk(100));
        assert_eq!(joined, whole.next_chunk(200));
    }
}
