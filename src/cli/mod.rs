//! CLI argument parsing and validation.

mod args;

pub use args::{GenerateArgs, Language, SampleArgs, TextSource};
