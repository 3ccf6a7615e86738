//! Voiceover engine implementation.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::audio::{self, AudioClip, AudioError, dsp};
use crate::backend::{Backend, BackendError, HealthResponse, SynthesizeRequest};
use crate::cli::Language;
use crate::config::{Config, OutputFormat};
use crate::text;
use crate::voice::{VoiceError, VoiceManager, VoiceProfile};

/// Accepted speed multipliers.
pub const SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.25..=4.0;

/// Errors that can occur while generating voiceovers.
#[derive(Error, Debug)]
pub enum VoiceoverError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unknown voice profile: {0}")]
    UnknownVoice(String),

    #[error("Unsupported language code: {0}")]
    UnsupportedLanguage(String),

    #[error("Model invocation failed: {0}")]
    ModelInvocation(#[from] BackendError),

    #[error("Text is empty")]
    EmptyText,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Audio error: {0}")]
    Audio(AudioError),

    #[error("Voice error: {0}")]
    Voice(VoiceError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<VoiceError> for VoiceoverError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::NotFound(name) => VoiceoverError::UnknownVoice(name),
            VoiceError::SampleMissing { path, .. } => VoiceoverError::FileNotFound(path),
            other => VoiceoverError::Voice(other),
        }
    }
}

impl From<AudioError> for VoiceoverError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::FileNotFound(path) => VoiceoverError::FileNotFound(path),
            other => VoiceoverError::Audio(other),
        }
    }
}

/// One generation run's inputs. Unset options fall back to the voice
/// profile and the config defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub text: String,
    pub voice: String,
    pub language: Option<Language>,
    pub speed: Option<f32>,
    pub temperature: Option<f32>,
    pub output: Option<PathBuf>,
}

impl GenerationRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            language: None,
            speed: None,
            temperature: None,
            output: None,
        }
    }

    pub fn with_language(mut self, language: Option<Language>) -> Self {
        self.language = language;
        self
    }

    pub fn with_speed(mut self, speed: Option<f32>) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }
}

/// What a successful generation wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub path: PathBuf,
    pub duration_secs: f32,
    pub sample_rate: u32,
    pub channels: u16,
    pub segments: usize,
}

/// A text file that could not be voiced in batch mode.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub generated: Vec<GenerationResult>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Resolved voice and parameters shared by every text unit of a run.
#[derive(Debug, Clone)]
struct VoicePlan {
    profile: VoiceProfile,
    language: Language,
    speed: f32,
    temperature: f32,
    max_chars: usize,
}

/// Drives the model backend to turn text into voiceover files.
///
/// The engine owns the backend for the whole run; dropping the engine
/// releases it.
pub struct VoiceoverEngine<B: Backend> {
    backend: B,
    voices: VoiceManager,
    config: Config,
}

impl<B: Backend> VoiceoverEngine<B> {
    /// Create a new voiceover engine.
    pub fn new(backend: B, voices: VoiceManager, config: Config) -> Self {
        Self {
            backend,
            voices,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check the model server and report the loaded model and device.
    pub fn health_check(&self) -> Result<HealthResponse, VoiceoverError> {
        let health = self.backend.health()?;

        if !health.is_healthy() {
            return Err(BackendError::ModelError(format!(
                "model server status is '{}'",
                health.status
            ))
            .into());
        }
        if health.model != self.config.model.name {
            warn!(
                "server reports model '{}', config expects '{}'",
                health.model, self.config.model.name
            );
        }
        info!("model {} ready on {}", health.model, health.device);

        Ok(health)
    }

    /// Resolve the voice, then check the model server, so a bad voice name
    /// is reported even when the server is down.
    pub fn preflight(
        &self,
        voice: &str,
    ) -> Result<(VoiceProfile, HealthResponse), VoiceoverError> {
        let profile = self.resolve_voice(voice)?;
        let health = self.health_check()?;
        Ok((profile, health))
    }

    /// List every resolvable voice profile.
    pub fn list_voices(&self) -> Result<Vec<VoiceProfile>, VoiceoverError> {
        Ok(self.voices.list()?)
    }

    /// Resolve a voice name to its profile.
    pub fn resolve_voice(&self, name: &str) -> Result<VoiceProfile, VoiceoverError> {
        Ok(self.voices.resolve(name)?)
    }

    /// Generate one voiceover file.
    pub fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, VoiceoverError> {
        let script = request.text.trim();
        if script.is_empty() {
            return Err(VoiceoverError::EmptyText);
        }

        let plan = self.plan(
            &request.voice,
            request.language,
            request.speed,
            request.temperature,
        )?;

        let output = match &request.output {
            Some(path) => path.clone(),
            None => self.next_output_path()?,
        };

        self.render(script, &plan, &output)
    }

    /// Generate a voiceover for every `.txt` file in `dir`.
    ///
    /// Files are visited in directory order. Empty files are skipped; a file
    /// that fails is recorded and the rest are still attempted. Voice,
    /// language and parameter problems abort before any file is processed.
    pub fn generate_batch(
        &self,
        dir: &Path,
        voice: &str,
        language: Option<Language>,
        speed: Option<f32>,
        temperature: Option<f32>,
    ) -> Result<BatchReport, VoiceoverError> {
        if !dir.is_dir() {
            return Err(VoiceoverError::FileNotFound(dir.display().to_string()));
        }

        let plan = self.plan(voice, language, speed, temperature)?;

        let mut text_files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                text_files.push(path);
            }
        }

        let mut report = BatchReport::default();
        if text_files.is_empty() {
            info!("no .txt files found in {}", dir.display());
            return Ok(report);
        }
        info!("found {} text files to process", text_files.len());

        let progress = ProgressBar::new(text_files.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message("Processing files");

        for text_file in text_files {
            let outcome = text::read_text_file(&text_file)
                .map_err(VoiceoverError::from)
                .and_then(|script| {
                    if script.is_empty() {
                        return Ok(None);
                    }
                    let output = self.batch_output_path(&text_file);
                    self.render(&script, &plan, &output).map(Some)
                });

            match outcome {
                Ok(Some(result)) => report.generated.push(result),
                Ok(None) => {
                    warn!("skipping empty file: {}", text_file.display());
                    report.skipped.push(text_file);
                }
                Err(e) => {
                    error!("error processing {}: {e}", text_file.display());
                    report.failed.push(BatchFailure {
                        path: text_file,
                        message: e.to_string(),
                    });
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(report)
    }

    /// Resolve voice, language and parameters, and check the reference clip.
    fn plan(
        &self,
        voice: &str,
        language: Option<Language>,
        speed: Option<f32>,
        temperature: Option<f32>,
    ) -> Result<VoicePlan, VoiceoverError> {
        let profile = self.resolve_voice(voice)?;

        let language = match (language, profile.language.as_deref()) {
            (Some(lang), _) => lang,
            (None, Some(code)) => Language::from_code(code)
                .ok_or_else(|| VoiceoverError::UnsupportedLanguage(code.to_string()))?,
            (None, None) => Language::default(),
        };

        let speed = speed.unwrap_or(self.config.model.speed);
        if !SPEED_RANGE.contains(&speed) {
            return Err(VoiceoverError::InvalidParameter(format!(
                "speed {speed} is outside {}..={}",
                SPEED_RANGE.start(),
                SPEED_RANGE.end()
            )));
        }

        let temperature = temperature.unwrap_or(self.config.model.temperature);
        if !(temperature > 0.0 && temperature <= 1.0) {
            return Err(VoiceoverError::InvalidParameter(format!(
                "temperature {temperature} must be greater than 0 and at most 1"
            )));
        }

        validate_voice_sample(&profile.sample_path)?;

        Ok(VoicePlan {
            max_chars: language.char_limit().min(self.config.model.max_segment_chars),
            profile,
            language,
            speed,
            temperature,
        })
    }

    /// Synthesize, post-process and write one text unit.
    fn render(
        &self,
        script: &str,
        plan: &VoicePlan,
        output: &Path,
    ) -> Result<GenerationResult, VoiceoverError> {
        let segments = text::segment_text(script, plan.max_chars);
        if segments.is_empty() {
            return Err(VoiceoverError::EmptyText);
        }

        info!(
            "generating speech: voice {}, language {}, {} segment(s)",
            plan.profile.name,
            plan.language,
            segments.len()
        );
        debug!("text: {}", preview(script, 100));

        let clip = self.synthesize_segments(&segments, plan)?;
        let clip = self.post_process(clip);
        let channels = self.config.output.channels;
        let format = self.output_format(output);

        write_atomic(output, &clip, channels, format)?;
        info!("audio generated: {}", output.display());

        Ok(GenerationResult {
            path: output.to_path_buf(),
            duration_secs: clip.duration_secs(),
            sample_rate: clip.sample_rate,
            channels,
            segments: segments.len(),
        })
    }

    fn synthesize_segments(
        &self,
        segments: &[String],
        plan: &VoicePlan,
    ) -> Result<AudioClip, VoiceoverError> {
        let mut parts: Vec<Vec<f32>> = Vec::with_capacity(segments.len());
        let mut sample_rate = None;

        for (i, segment) in segments.iter().enumerate() {
            debug!("synthesizing segment {}/{}", i + 1, segments.len());

            let request = SynthesizeRequest::new(segment.as_str(), plan.profile.sample_path.clone())
                .with_language(plan.language)
                .with_speed(plan.speed)
                .with_temperature(plan.temperature);

            let bytes = self.backend.synthesize(&request)?;
            let clip = audio::decode_wav_bytes(&bytes).map_err(|e| {
                BackendError::InvalidResponse(format!("undecodable audio from model: {e}"))
            })?;

            let rate = *sample_rate.get_or_insert(clip.sample_rate);
            parts.push(clip.resampled(rate).samples);
        }

        let sample_rate = sample_rate.unwrap_or(self.config.output.sample_rate);
        let gap = (self.config.output.segment_gap_ms as u64 * sample_rate as u64 / 1000) as usize;

        Ok(AudioClip::new(dsp::concat_with_gap(&parts, gap), sample_rate))
    }

    fn post_process(&self, mut clip: AudioClip) -> AudioClip {
        let output = &self.config.output;

        if output.normalize {
            dsp::normalize_loudness(&mut clip.samples, output.target_dbfs);
        }

        clip.resampled(output.sample_rate)
    }

    /// The format to encode `output` in: its extension when that names a
    /// writable format, otherwise the configured one.
    fn output_format(&self, output: &Path) -> OutputFormat {
        output
            .extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_extension)
            .unwrap_or(self.config.output.format)
    }

    /// `<output dir>/output_<N>.<ext>`, N one past the directory's current
    /// entry count (skipping names already taken).
    pub fn next_output_path(&self) -> Result<PathBuf, VoiceoverError> {
        let dir = &self.config.output.directory;
        std::fs::create_dir_all(dir)?;

        let mut n = std::fs::read_dir(dir)?.count() + 1;
        let ext = self.config.output.format.extension();
        loop {
            let candidate = dir.join(format!("output_{n}.{ext}"));
            if !candidate.exists() {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    fn batch_output_path(&self, text_file: &Path) -> PathBuf {
        let stem = text_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        self.config.output.directory.join(format!(
            "{stem}_voiceover.{}",
            self.config.output.format.extension()
        ))
    }
}

/// Check a reference clip exists and decodes, and log how its length
/// compares to what the model works best with. Returns the duration.
pub fn validate_voice_sample(path: &Path) -> Result<f32, VoiceoverError> {
    let clip = audio::decode_file(path)?;
    let duration = clip.duration_secs();

    if duration < 3.0 {
        warn!("voice sample is {duration:.1}s, recommended 6-30s for best results");
    } else if duration < 6.0 {
        info!("voice sample is {duration:.1}s, acceptable but 10-15s is optimal");
    } else if duration > 30.0 {
        info!("voice sample is {duration:.1}s, the model uses the first 30 seconds");
    } else {
        debug!("voice sample duration {duration:.1}s");
    }

    Ok(duration)
}

/// Write through a sibling temp file so a failed write leaves nothing at
/// `path`. An existing file is replaced.
fn write_atomic(
    path: &Path,
    clip: &AudioClip,
    channels: u16,
    format: OutputFormat,
) -> Result<(), VoiceoverError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    if path.exists() {
        warn!("overwriting existing file: {}", path.display());
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output.wav");
    let tmp = path.with_file_name(format!(".{file_name}.part"));

    let written = match format {
        OutputFormat::Wav => audio::write_wav(&tmp, clip, channels),
        OutputFormat::Mp3 => audio::write_mp3(&tmp, clip, channels),
    };
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    std::fs::rename(&tmp, path)?;

    Ok(())
}

fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    format!("{head}...")
}
