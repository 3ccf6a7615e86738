//! Voice sample preparation for cloning.
//!
//! Turns a microphone capture or an existing recording into a mono
//! 22.05 kHz reference clip of a usable length, written under the
//! `voices/` convention the generator reads from.

mod preparer;

pub use preparer::{
    DurationStatus, MAX_DURATION_SECS, MIN_DURATION_SECS, SampleError, SamplePreparer,
    SampleReport, TARGET_SAMPLE_RATE, chunk_path, write_metadata, write_metadata_all,
};
