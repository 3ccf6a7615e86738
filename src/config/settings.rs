//! Configuration file model and loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid config value: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A voice entry from the `voices` section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceEntry {
    pub sample_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub voices: BTreeMap<String, VoiceEntry>,
    pub voices_dir: PathBuf,
    pub model: ModelConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            voices: BTreeMap::new(),
            voices_dir: PathBuf::from("voices"),
            model: ModelConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Model server and generation defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier reported by (and checked against) the server.
    pub name: String,
    pub temperature: f32,
    pub speed: f32,
    pub host: String,
    pub port: u16,
    /// Per-request timeout; synthesis on CPU can take minutes.
    pub timeout_secs: u64,
    /// Upper bound on characters per model call, on top of the
    /// per-language limit.
    pub max_segment_chars: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "tts_models/multilingual/multi-dataset/xtts_v2".to_string(),
            temperature: 0.7,
            speed: 1.0,
            host: "localhost".to_string(),
            port: 8020,
            timeout_secs: 300,
            max_segment_chars: 250,
        }
    }
}

/// Output container format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Wav,
    /// 192 kbps constant bitrate.
    Mp3,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Mp3 => "mp3",
        }
    }

    /// Format named by a file extension, if it is one we can write.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(OutputFormat::Wav),
            "mp3" => Some(OutputFormat::Mp3),
            _ => None,
        }
    }
}

/// Post-processing applied to generated audio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub format: OutputFormat,
    pub sample_rate: u32,
    pub channels: u16,
    pub normalize: bool,
    pub target_dbfs: f32,
    /// Silence inserted between synthesized segments.
    pub segment_gap_ms: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            format: OutputFormat::Wav,
            sample_rate: 44_100,
            channels: 1,
            normalize: true,
            target_dbfs: -14.0,
            segment_gap_ms: 150,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `./config.yaml` and then the
    /// user config directory are tried, falling back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.display().to_string()));
                }
                Self::from_file(path)?
            }
            None => match Self::default_locations().into_iter().find(|p| p.exists()) {
                Some(found) => Self::from_file(&found)?,
                None => {
                    debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a config file. Missing sections and fields take defaults; an
    /// empty file is the default config.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("loading config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    fn from_yaml(contents: &str) -> Result<Self, String> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed: Option<Self> = serde_yaml::from_str(contents).map_err(|e| e.to_string())?;
        Ok(parsed.unwrap_or_default())
    }

    /// Candidate config paths when none is given explicitly.
    pub fn default_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("voiceover").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "output.sample_rate must be greater than 0".to_string(),
            ));
        }
        if !(1..=2).contains(&self.output.channels) {
            return Err(ConfigError::Invalid(format!(
                "output.channels must be 1 or 2, got {}",
                self.output.channels
            )));
        }
        if self.model.max_segment_chars == 0 {
            return Err(ConfigError::Invalid(
                "model.max_segment_chars must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the model server.
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.model.host, self.model.port)
    }
}
