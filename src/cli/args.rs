//! CLI argument definitions and parsing.

use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

/// Generate voiceovers from text using a cloned voice.
#[derive(Parser, Debug)]
#[command(name = "voiceover")]
#[command(about = "Generate voiceovers using voice cloning (XTTS v2)")]
#[command(version)]
#[command(group(ArgGroup::new("source").args(["text", "input", "batch"])))]
pub struct GenerateArgs {
    /// Text to convert to speech
    pub text: Option<String>,

    /// Input text file path
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Process all .txt files in a directory
    #[arg(short, long)]
    pub batch: Option<PathBuf>,

    /// Voice name (from the config file or the voices/ directory)
    #[arg(short, long, required_unless_present = "list_voices")]
    pub voice: Option<String>,

    /// Language code (defaults to the voice's language, then "en")
    #[arg(short, long, value_enum)]
    pub language: Option<Language>,

    /// Output file path (single text mode only)
    #[arg(short, long, conflicts_with = "batch")]
    pub output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Generation temperature (0.0 to 1.0, default from config)
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Speech speed multiplier (0.25 to 4.0, default from config)
    #[arg(short, long)]
    pub speed: Option<f32>,

    /// Model server host (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Model server port (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// List all resolvable voices and exit
    #[arg(long)]
    pub list_voices: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,
}

/// Where the text for a generation run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    Literal(String),
    File(PathBuf),
    Batch(PathBuf),
}

impl GenerateArgs {
    /// The selected text source, if any.
    ///
    /// Clap guarantees at most one of the three is present.
    pub fn text_source(&self) -> Option<TextSource> {
        if let Some(dir) = &self.batch {
            return Some(TextSource::Batch(dir.clone()));
        }
        if let Some(path) = &self.input {
            return Some(TextSource::File(path.clone()));
        }
        self.text.clone().map(TextSource::Literal)
    }
}

/// Record or preprocess a voice sample for cloning.
#[derive(Parser, Debug)]
#[command(name = "voiceover-sample")]
#[command(about = "Record or preprocess voice samples for voice cloning")]
#[command(version)]
pub struct SampleArgs {
    /// Output file path (e.g. voices/my_voice.wav)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Input audio file to preprocess instead of recording
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Recording duration in seconds
    #[arg(
        short,
        long,
        default_value_t = 15,
        conflicts_with = "input",
        value_parser = clap::value_parser!(u32).range(6..=30)
    )]
    pub duration: u32,

    /// Split long input audio into 30 second chunks
    #[arg(long, requires = "input")]
    pub split: bool,

    /// Voice name stored in the metadata sidecar
    #[arg(short, long)]
    pub name: Option<String>,

    /// Voice description stored in the metadata sidecar
    #[arg(long)]
    pub description: Option<String>,

    /// Voice language stored in the metadata sidecar
    #[arg(short, long, value_enum)]
    pub language: Option<Language>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl SampleArgs {
    /// Whether a metadata sidecar should be written next to the clip.
    pub fn wants_metadata(&self) -> bool {
        self.name.is_some() || self.description.is_some() || self.language.is_some()
    }
}

/// Languages supported by the XTTS v2 model.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    #[value(name = "en")]
    English,
    #[value(name = "es")]
    Spanish,
    #[value(name = "fr")]
    French,
    #[value(name = "de")]
    German,
    #[value(name = "it")]
    Italian,
    #[value(name = "pt")]
    Portuguese,
    #[value(name = "pl")]
    Polish,
    #[value(name = "tr")]
    Turkish,
    #[value(name = "ru")]
    Russian,
    #[value(name = "nl")]
    Dutch,
    #[value(name = "cs")]
    Czech,
    #[value(name = "ar")]
    Arabic,
    #[value(name = "zh-cn")]
    Chinese,
    #[value(name = "ja")]
    Japanese,
    #[value(name = "hu")]
    Hungarian,
    #[value(name = "ko")]
    Korean,
}

impl Language {
    pub const ALL: [Language; 16] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
        Language::Polish,
        Language::Turkish,
        Language::Russian,
        Language::Dutch,
        Language::Czech,
        Language::Arabic,
        Language::Chinese,
        Language::Japanese,
        Language::Hungarian,
        Language::Korean,
    ];

    /// Returns the model's language code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
            Language::Italian => "it",
            Language::Portuguese => "pt",
            Language::Polish => "pl",
            Language::Turkish => "tr",
            Language::Russian => "ru",
            Language::Dutch => "nl",
            Language::Czech => "cs",
            Language::Arabic => "ar",
            Language::Chinese => "zh-cn",
            Language::Japanese => "ja",
            Language::Hungarian => "hu",
            Language::Korean => "ko",
        }
    }

    /// Parse a language code, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|lang| lang.as_str() == code)
    }

    /// Maximum characters per model call for this language.
    ///
    /// Longer inputs get truncated audio from the model, so text is
    /// segmented below this limit before synthesis.
    pub fn char_limit(&self) -> usize {
        match self {
            Language::English => 250,
            Language::Spanish => 239,
            Language::French => 273,
            Language::German => 253,
            Language::Italian => 213,
            Language::Portuguese => 203,
            Language::Polish => 224,
            Language::Turkish => 226,
            Language::Russian => 182,
            Language::Dutch => 251,
            Language::Czech => 186,
            Language::Arabic => 166,
            Language::Chinese => 82,
            Language::Japanese => 71,
            Language::Hungarian => 224,
            Language::Korean => 95,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
