//! Voice profiles: named reference clips used to condition the model.
//!
//! Profiles come from the config file's `voices` section or from the
//! `voices/` directory convention written by the sample preparer.

mod manager;

pub use manager::{
    ProfileSource, SAMPLE_EXTENSIONS, VoiceError, VoiceManager, VoiceMetadata, VoiceProfile,
};
