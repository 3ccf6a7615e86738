//! Voice profile resolution and metadata storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, VoiceEntry};

/// Audio extensions searched in the voices directory, in priority order.
pub const SAMPLE_EXTENSIONS: [&str; 3] = ["wav", "mp3", "flac"];

/// Errors that can occur during voice management.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Voice '{0}' not found. Add it to the voices/ directory or the config file")]
    NotFound(String),

    #[error("Voice sample for '{name}' not found: {path}")]
    SampleMissing { name: String, path: String },

    #[error("Invalid voice name: {0}")]
    InvalidName(String),

    #[error("Voice '{name}' is claimed by more than one sample: {paths}")]
    DuplicateName { name: String, paths: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Where a profile was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    Config,
    Directory,
}

/// A named reference clip plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceProfile {
    pub name: String,
    pub sample_path: PathBuf,
    pub language: Option<String>,
    pub description: Option<String>,
    pub source: ProfileSource,
}

/// Sidecar metadata written next to a prepared sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    pub created_at: String,
}

/// Resolves voice names against the config file and the voices directory.
pub struct VoiceManager {
    voices_dir: PathBuf,
    configured: BTreeMap<String, VoiceEntry>,
}

impl VoiceManager {
    /// Create a VoiceManager from loaded configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            voices_dir: config.voices_dir.clone(),
            configured: config.voices.clone(),
        }
    }

    /// Create a VoiceManager over a directory only.
    pub fn with_dir(voices_dir: PathBuf) -> Self {
        Self {
            voices_dir,
            configured: BTreeMap::new(),
        }
    }

    /// Get the voices directory path.
    pub fn voices_dir(&self) -> PathBuf {
        self.voices_dir.clone()
    }

    /// Validate a voice name used for directory lookup.
    fn validate_name(name: &str) -> Result<(), VoiceError> {
        if name.trim().is_empty() {
            return Err(VoiceError::InvalidName("Name cannot be empty".to_string()));
        }

        // Prevent path traversal
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(VoiceError::InvalidName(
                "Name cannot contain path separators".to_string(),
            ));
        }

        Ok(())
    }

    /// Sidecar path for a sample: same stem, `.json` extension.
    pub fn metadata_path(sample_path: &Path) -> PathBuf {
        sample_path.with_extension("json")
    }

    /// Write the metadata sidecar next to a sample.
    pub fn save_metadata(sample_path: &Path, metadata: &VoiceMetadata) -> Result<(), VoiceError> {
        if let Some(parent) = sample_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(metadata)?;
        std::fs::write(Self::metadata_path(sample_path), json)?;

        Ok(())
    }

    /// Read the metadata sidecar for a sample, if there is one.
    pub fn load_metadata(sample_path: &Path) -> Result<Option<VoiceMetadata>, VoiceError> {
        let path = Self::metadata_path(sample_path);
        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Resolve a voice name to its profile.
    ///
    /// Config entries win, then the directory convention
    /// `<voices_dir>/<name>.{wav,mp3,flac}`, then a sample whose metadata
    /// sidecar carries `name`. A sidecar name claimed by two samples is an
    /// error.
    pub fn resolve(&self, name: &str) -> Result<VoiceProfile, VoiceError> {
        if let Some(entry) = self.configured.get(name) {
            if !entry.sample_path.exists() {
                return Err(VoiceError::SampleMissing {
                    name: name.to_string(),
                    path: entry.sample_path.display().to_string(),
                });
            }
            debug!("voice '{name}' resolved from config");
            return Ok(VoiceProfile {
                name: name.to_string(),
                sample_path: entry.sample_path.clone(),
                language: entry.language.clone(),
                description: entry.description.clone(),
                source: ProfileSource::Config,
            });
        }

        Self::validate_name(name)?;

        if let Some(path) = SAMPLE_EXTENSIONS
            .iter()
            .map(|ext| self.voices_dir.join(format!("{name}.{ext}")))
            .find(|path| path.exists())
        {
            debug!("voice '{name}' resolved to {}", path.display());
            let metadata = Self::read_sidecar(&path);
            return Ok(Self::directory_profile(name, path, metadata));
        }

        let mut claimed: Vec<(PathBuf, VoiceMetadata)> = self
            .directory_samples()?
            .into_iter()
            .filter_map(|path| {
                let metadata = Self::read_sidecar(&path)?;
                (metadata.name == name).then_some((path, metadata))
            })
            .collect();

        match claimed.len() {
            0 => Err(VoiceError::NotFound(name.to_string())),
            1 => {
                let (path, metadata) = claimed.remove(0);
                debug!("voice '{name}' resolved by metadata to {}", path.display());
                Ok(Self::directory_profile(name, path, Some(metadata)))
            }
            _ => Err(VoiceError::DuplicateName {
                name: name.to_string(),
                paths: claimed
                    .iter()
                    .map(|(path, _)| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// List every resolvable voice, sorted by name.
    ///
    /// Directory samples are listed under their sidecar name when they have
    /// one. When two samples claim the same name only the first is listed.
    pub fn list(&self) -> Result<Vec<VoiceProfile>, VoiceError> {
        let mut voices: BTreeMap<String, VoiceProfile> = self
            .configured
            .iter()
            .map(|(name, entry)| {
                let profile = VoiceProfile {
                    name: name.clone(),
                    sample_path: entry.sample_path.clone(),
                    language: entry.language.clone(),
                    description: entry.description.clone(),
                    source: ProfileSource::Config,
                };
                (name.clone(), profile)
            })
            .collect();

        for path in self.directory_samples()? {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let metadata = Self::read_sidecar(&path);
            let name = metadata
                .as_ref()
                .map(|m| m.name.clone())
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| stem.to_string());

            if let Some(existing) = voices.get(&name) {
                if existing.source == ProfileSource::Directory {
                    warn!(
                        "voice '{name}' is claimed by both {} and {}",
                        existing.sample_path.display(),
                        path.display()
                    );
                }
                continue;
            }
            let profile = Self::directory_profile(&name, path, metadata);
            voices.insert(name, profile);
        }

        Ok(voices.into_values().collect())
    }

    /// Sample files in the voices directory, one per stem (by extension
    /// priority), sorted by path.
    fn directory_samples(&self) -> Result<Vec<PathBuf>, VoiceError> {
        if !self.voices_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut by_stem: BTreeMap<String, (usize, PathBuf)> = BTreeMap::new();
        for entry in std::fs::read_dir(&self.voices_dir)? {
            let path = entry?.path();
            let Some(rank) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(|e| {
                    let e = e.to_ascii_lowercase();
                    SAMPLE_EXTENSIONS.iter().position(|ext| *ext == e)
                })
            else {
                continue;
            };
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let better = by_stem.get(stem).is_none_or(|(best, _)| rank < *best);
            if better {
                by_stem.insert(stem.to_string(), (rank, path));
            }
        }

        Ok(by_stem.into_values().map(|(_, path)| path).collect())
    }

    fn read_sidecar(sample_path: &Path) -> Option<VoiceMetadata> {
        match Self::load_metadata(sample_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    "ignoring unreadable metadata for {}: {e}",
                    sample_path.display()
                );
                None
            }
        }
    }

    fn directory_profile(
        name: &str,
        sample_path: PathBuf,
        metadata: Option<VoiceMetadata>,
    ) -> VoiceProfile {
        let (language, description) = metadata
            .map(|m| (m.language, m.description))
            .unwrap_or_default();

        VoiceProfile {
            name: name.to_string(),
            sample_path,
            language,
            description,
            source: ProfileSource::Directory,
        }
    }
}
