//! Text preparation before synthesis.
//!
//! The model truncates audio for inputs past a per-language character
//! limit, so long scripts are cut into sentence-aligned segments that are
//! synthesized one at a time and stitched back together.

mod segment;

pub use segment::{segment_text, split_sentences};

/// Read a text file and trim surrounding whitespace.
pub fn read_text_file(path: &std::path::Path) -> std::io::Result<String> {
    Ok(std::fs::read_to_string(path)?.trim().to_string())
}
