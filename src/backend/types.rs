//! Backend request/response types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Language;

/// Errors that can occur when communicating with the model server.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Model error: {0}")]
    ModelError(String),
}

/// Health check response from the model server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    #[serde(default)]
    pub cuda_available: bool,
    pub device: String,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}

/// One model call: a text segment conditioned on a reference clip.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizeRequest {
    pub text: String,
    pub speaker_wav: PathBuf,
    pub language: Language,
    pub speed: f32,
    pub temperature: f32,
}

impl SynthesizeRequest {
    /// Create a new synthesis request with default parameters.
    pub fn new(text: impl Into<String>, speaker_wav: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            speaker_wav: speaker_wav.into(),
            language: Language::default(),
            speed: 1.0,
            temperature: 0.7,
        }
    }

    /// Set the language.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set the speech speed.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}
