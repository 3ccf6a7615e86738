//! Configuration loading.
//!
//! The YAML config maps voice names to reference clips and carries global
//! defaults for generation and output post-processing.

mod settings;

pub use settings::{
    CONFIG_FILE_NAME, Config, ConfigError, ModelConfig, OutputConfig, OutputFormat, VoiceEntry,
};
