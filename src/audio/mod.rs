//! Audio buffers, file I/O, signal processing and microphone capture.
//!
//! Everything inside the crate works on mono `f32` samples in [-1, 1];
//! channel layout only matters when a file is finally written.

pub mod capture;
pub mod dsp;
mod mp3;
mod wav;

pub use mp3::{encode_mp3, write_mp3};
pub use wav::{
    AudioInfo, decode_file, decode_wav_bytes, probe_audio, probe_wav, read_wav, write_wav,
};

use thiserror::Error;

/// Errors that can occur while reading, processing or capturing audio.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Failed to encode audio: {0}")]
    Encode(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Audio contains no samples")]
    Empty,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A mono waveform at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Length in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Return the clip resampled to `sample_rate`.
    pub fn resampled(self, sample_rate: u32) -> Self {
        if self.sample_rate == sample_rate {
            return self;
        }
        Self {
            samples: dsp::resample_linear(&self.samples, self.sample_rate, sample_rate),
            sample_rate,
        }
    }

    /// Keep at most the first `max_secs` seconds. Returns whether anything
    /// was cut.
    pub fn truncate_secs(&mut self, max_secs: f32) -> bool {
        let max_samples = (max_secs * self.sample_rate as f32) as usize;
        if self.samples.len() > max_samples {
            self.samples.truncate(max_samples);
            return true;
        }
        false
    }
}
