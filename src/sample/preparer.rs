//! Reference clip preparation.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audio::{self, AudioClip, AudioError, dsp};
use crate::cli::Language;
use crate::voice::{VoiceError, VoiceManager, VoiceMetadata};

/// Sample rate the cloning model expects for reference clips.
pub const TARGET_SAMPLE_RATE: u32 = 22_050;
/// Shortest clip that clones reliably.
pub const MIN_DURATION_SECS: f32 = 6.0;
/// The model only conditions on the first 30 seconds.
pub const MAX_DURATION_SECS: f32 = 30.0;

const TRIM_TOP_DB: f32 = 20.0;
const NOISE_PERCENTILE: f32 = 10.0;
const NOISE_ATTENUATION: f32 = 0.1;
const PEAK_TARGET: f32 = 0.95;
const CLIPPING_LEVEL: f32 = 0.99;
const MIN_SNR_DB: f32 = 10.0;

/// Errors that can occur while preparing a sample.
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("Input file not found: {0}")]
    FileNotFound(String),

    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to decode input audio: {0}")]
    Decode(String),

    #[error("Input audio contains no samples")]
    EmptyAudio,

    #[error("Audio error: {0}")]
    Audio(AudioError),

    #[error("Voice metadata error: {0}")]
    Voice(#[from] VoiceError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<AudioError> for SampleError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::FileNotFound(path) => SampleError::FileNotFound(path),
            AudioError::DeviceUnavailable(msg) => SampleError::DeviceUnavailable(msg),
            AudioError::Decode(msg) | AudioError::UnsupportedFormat(msg) => {
                SampleError::Decode(msg)
            }
            AudioError::Empty => SampleError::EmptyAudio,
            other => SampleError::Audio(other),
        }
    }
}

/// How the prepared clip's length relates to the accepted window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationStatus {
    /// Shorter than the minimum; kept as-is, cloning quality may suffer.
    TooShort,
    Optimal,
    /// Longer than the maximum; cut to the first 30 seconds.
    Truncated,
}

/// Validation summary of a written clip.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleReport {
    pub path: PathBuf,
    pub duration_secs: f32,
    pub sample_rate: u32,
    pub channels: u16,
    pub peak: f32,
    pub snr_db: f32,
    pub status: DurationStatus,
}

impl SampleReport {
    pub fn is_clipping(&self) -> bool {
        self.peak > CLIPPING_LEVEL
    }

    pub fn is_noisy(&self) -> bool {
        self.snr_db < MIN_SNR_DB
    }
}

/// Trims, cleans and normalizes audio into a reference clip.
#[derive(Debug, Clone)]
pub struct SamplePreparer {
    target_sample_rate: u32,
    max_secs: f32,
}

impl Default for SamplePreparer {
    fn default() -> Self {
        Self {
            target_sample_rate: TARGET_SAMPLE_RATE,
            max_secs: MAX_DURATION_SECS,
        }
    }
}

impl SamplePreparer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the cleanup chain on a clip. Returns the processed clip and
    /// whether it was cut to the maximum length.
    pub fn process(&self, clip: AudioClip) -> Result<(AudioClip, bool), SampleError> {
        if clip.is_empty() {
            return Err(SampleError::EmptyAudio);
        }

        let mut clip = clip;
        debug!("normalizing volume");
        dsp::normalize_peak(&mut clip.samples, PEAK_TARGET);

        let mut clip = clip.resampled(self.target_sample_rate);

        debug!("trimming silence");
        clip.samples = dsp::trim_silence(&clip.samples, TRIM_TOP_DB);

        debug!("reducing noise");
        clip.samples = dsp::noise_gate(&clip.samples, NOISE_PERCENTILE, NOISE_ATTENUATION);

        let truncated = clip.truncate_secs(self.max_secs);
        dsp::normalize_peak(&mut clip.samples, PEAK_TARGET);

        Ok((clip, truncated))
    }

    /// Prepare an existing audio file (wav, mp3 or flac).
    pub fn prepare_file(&self, input: &Path, output: &Path) -> Result<SampleReport, SampleError> {
        info!("processing audio file: {}", input.display());
        let clip = audio::decode_file(input)?;
        self.prepare_clip(clip, output)
    }

    /// Record from the default microphone and prepare the result.
    pub fn record(&self, seconds: u32, output: &Path) -> Result<SampleReport, SampleError> {
        let clip = audio::capture::record(seconds)?;
        self.prepare_clip(clip, output)
    }

    /// Process a clip and write it to `output`, overwriting any existing
    /// file.
    pub fn prepare_clip(&self, clip: AudioClip, output: &Path) -> Result<SampleReport, SampleError> {
        let (clip, truncated) = self.process(clip)?;

        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        if output.exists() {
            debug!("overwriting {}", output.display());
        }
        audio::write_wav(output, &clip, 1)?;

        self.validate(output, truncated)
    }

    /// Split an input longer than the maximum into consecutive chunks and
    /// prepare each as `<stem>_chunk<N>.wav` beside `output`.
    pub fn prepare_split(&self, input: &Path, output: &Path) -> Result<Vec<SampleReport>, SampleError> {
        let clip = audio::decode_file(input)?;
        if clip.is_empty() {
            return Err(SampleError::EmptyAudio);
        }

        let chunks = if clip.duration_secs() <= self.max_secs {
            info!("audio is {:.1}s, no splitting needed", clip.duration_secs());
            vec![clip.samples]
        } else {
            info!(
                "audio is {:.1}s, splitting into {}s chunks",
                clip.duration_secs(),
                self.max_secs
            );
            dsp::split_into_chunks(&clip.samples, clip.sample_rate, self.max_secs)
        };

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, samples)| {
                let path = chunk_path(output, i + 1);
                self.prepare_clip(AudioClip::new(samples, clip.sample_rate), &path)
            })
            .collect()
    }

    /// Inspect a written clip.
    pub fn validate(&self, path: &Path, truncated: bool) -> Result<SampleReport, SampleError> {
        let info = audio::probe_wav(path)?;
        let clip = audio::read_wav(path)?;

        let status = if truncated {
            DurationStatus::Truncated
        } else if info.duration_secs < MIN_DURATION_SECS {
            DurationStatus::TooShort
        } else {
            DurationStatus::Optimal
        };

        let report = SampleReport {
            path: path.to_path_buf(),
            duration_secs: info.duration_secs,
            sample_rate: info.sample_rate,
            channels: info.channels,
            peak: dsp::peak(&clip.samples),
            snr_db: dsp::estimate_snr_db(&clip.samples),
            status,
        };

        match report.status {
            DurationStatus::TooShort => warn!(
                "audio is short ({:.1}s), recommended {MIN_DURATION_SECS}-{MAX_DURATION_SECS}s; \
                 shorter samples may clone poorly",
                report.duration_secs
            ),
            DurationStatus::Truncated => warn!(
                "audio was longer than {MAX_DURATION_SECS}s and has been cut to the first {:.1}s",
                report.duration_secs
            ),
            DurationStatus::Optimal => debug!("duration {:.1}s is optimal", report.duration_secs),
        }
        if report.is_clipping() {
            warn!("audio may be clipping (peak {:.3})", report.peak);
        }
        if report.is_noisy() {
            warn!(
                "audio may have too much noise (SNR estimate {:.1} dB)",
                report.snr_db
            );
        }

        Ok(report)
    }
}

/// Path of the `index`-th (1-based) chunk for a split output.
pub fn chunk_path(output: &Path, index: usize) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("voice");
    output.with_file_name(format!("{stem}_chunk{index}.wav"))
}

/// Write the voice metadata sidecar for a prepared clip.
///
/// The name defaults to the clip's file stem.
pub fn write_metadata(
    report: &SampleReport,
    name: Option<&str>,
    description: Option<&str>,
    language: Option<Language>,
) -> Result<VoiceMetadata, SampleError> {
    let name = name
        .map(str::to_string)
        .or_else(|| {
            report
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "voice".to_string());

    let metadata = VoiceMetadata {
        name,
        description: description.map(str::to_string),
        language: language.map(|l| l.as_str().to_string()),
        duration: Some(report.duration_secs),
        sample_rate: Some(report.sample_rate),
        created_at: Utc::now().to_rfc3339(),
    };
    VoiceManager::save_metadata(&report.path, &metadata)?;

    Ok(metadata)
}

/// Write sidecars for every clip of one run.
///
/// When a run produced several chunks, an explicit name gets the same
/// `_chunk<N>` suffix as the files so each chunk resolves to one voice.
pub fn write_metadata_all(
    reports: &[SampleReport],
    name: Option<&str>,
    description: Option<&str>,
    language: Option<Language>,
) -> Result<Vec<VoiceMetadata>, SampleError> {
    let split = reports.len() > 1;

    reports
        .iter()
        .enumerate()
        .map(|(i, report)| {
            let name = match name {
                Some(name) if split => Some(format!("{name}_chunk{}", i + 1)),
                other => other.map(str::to_string),
            };
            write_metadata(report, name.as_deref(), description, language)
        })
        .collect()
}
