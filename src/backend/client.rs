//! HTTP client for the XTTS model server.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use tracing::debug;

use crate::config::Config;

use super::Backend;
use super::types::{BackendError, HealthResponse, SynthesizeRequest};

/// HTTP-based backend client.
///
/// Owns the connection pool for the lifetime of a run; the model stays
/// loaded in the server process.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    /// Create a new HTTP backend client.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Create a client for the server named in the config.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        Self::new(
            config.server_url(),
            Duration::from_secs(config.model.timeout_secs),
        )
    }

    /// Get the base URL for this backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn speaker_part(path: &Path) -> Result<Part, BackendError> {
        let audio_data = std::fs::read(path)
            .map_err(|_| BackendError::FileNotFound(path.display().to_string()))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("speaker.wav")
            .to_string();

        let mime = match path.extension().and_then(|e| e.to_str()) {
            Some("mp3") => "audio/mpeg",
            Some("flac") => "audio/flac",
            _ => "audio/wav",
        };

        Part::bytes(audio_data)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| BackendError::RequestFailed(e.to_string()))
    }
}

impl Backend for HttpBackend {
    fn health(&self) -> Result<HealthResponse, BackendError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::RequestFailed(format!(
                "Status: {}",
                response.status()
            )));
        }

        response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn synthesize(&self, request: &SynthesizeRequest) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}/synthesize", self.base_url);
        debug!(
            "POST {url} ({} chars, {}, speed {}, temperature {})",
            request.text.chars().count(),
            request.language,
            request.speed,
            request.temperature
        );

        let form = Form::new()
            .text("text", request.text.clone())
            .text("language", request.language.as_str())
            .text("speed", request.speed.to_string())
            .text("temperature", request.temperature.to_string())
            .part("speaker_wav", Self::speaker_part(&request.speaker_wav)?);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            let detail = response.text().unwrap_or_default();
            return Err(BackendError::ModelError(format!("{status}: {detail}")));
        }
        if !status.is_success() {
            return Err(BackendError::RequestFailed(format!("Status: {status}")));
        }

        let body = response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        if !body.starts_with(b"RIFF") {
            return Err(BackendError::InvalidResponse(
                "response is not a WAV file".to_string(),
            ));
        }

        Ok(body)
    }
}
