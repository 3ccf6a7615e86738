//! voiceover-rs: Voice cloning and voiceover generation CLI.
//!
//! This crate provides two command-line tools around the XTTS v2 voice
//! cloning model: one prepares reference voice samples, the other turns
//! text into speech in a cloned voice through a local model server.

pub mod audio;
pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod sample;
pub mod text;
pub mod voice;
