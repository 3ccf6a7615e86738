//! Backend communication with the voice-cloning model server.
//!
//! The model itself (speaker embedding, acoustic model, vocoder) runs in an
//! external XTTS server; this module only moves requests and WAV bytes.

mod client;
mod types;

pub use client::HttpBackend;
pub use types::{BackendError, HealthResponse, SynthesizeRequest};

/// Trait for model backend communication.
///
/// This trait abstracts the HTTP communication with the model server,
/// allowing for mock implementations in tests.
#[cfg_attr(test, mockall::automock)]
pub trait Backend: Send + Sync {
    /// Check server health and report the loaded model and device.
    fn health(&self) -> Result<HealthResponse, BackendError>;

    /// Synthesize one text segment with the given reference clip.
    ///
    /// # Returns
    /// Raw WAV audio data
    fn synthesize(&self, request: &SynthesizeRequest) -> Result<Vec<u8>, BackendError>;
}
