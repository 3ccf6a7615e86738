//! voiceover CLI entry point.

use anyhow::{Context, Result, bail};
use clap::Parser;
use voiceover_rs::backend::{Backend, HttpBackend};
use voiceover_rs::cli::{GenerateArgs, TextSource};
use voiceover_rs::config::Config;
use voiceover_rs::engine::{
    BatchReport, GenerationRequest, GenerationResult, VoiceoverEngine, VoiceoverError,
};
use voiceover_rs::text;
use voiceover_rs::voice::VoiceManager;

fn main() -> Result<()> {
    let args = GenerateArgs::parse();
    voiceover_rs::logging::init(args.verbose);

    let mut config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(host) = &args.host {
        config.model.host = host.clone();
    }
    if let Some(port) = args.port {
        config.model.port = port;
    }

    let voice_manager = VoiceManager::new(&config);
    let backend = HttpBackend::from_config(&config).context("Failed to create HTTP client")?;
    let engine = VoiceoverEngine::new(backend, voice_manager, config);

    // Handle utility commands first
    if args.list_voices {
        return list_voices(&engine);
    }

    let voice = args.voice.as_deref().context("--voice is required")?;
    let Some(source) = args.text_source() else {
        bail!("No input specified. Provide text, --input FILE or --batch DIR (see --help)");
    };

    match engine.preflight(voice) {
        Ok((profile, _)) => println!("Using voice: {}", profile.name),
        Err(e @ VoiceoverError::ModelInvocation(_)) => {
            return Err(e).with_context(|| {
                format!(
                    "Model server at {} is not available",
                    engine.config().server_url()
                )
            });
        }
        Err(e) => return Err(e).with_context(|| format!("Voice '{voice}' is not usable")),
    }

    match source {
        TextSource::Batch(dir) => {
            let report = engine
                .generate_batch(&dir, voice, args.language, args.speed, args.temperature)
                .with_context(|| format!("Batch processing failed for {}", dir.display()))?;
            print_batch_report(&report);
            if !report.is_success() {
                bail!("{} file(s) failed", report.failed.len());
            }
            Ok(())
        }
        TextSource::File(path) => {
            let script = text::read_text_file(&path)
                .with_context(|| format!("Failed to read text file: {}", path.display()))?;
            generate(&engine, &args, voice, script)
        }
        TextSource::Literal(script) => generate(&engine, &args, voice, script),
    }
}

fn list_voices<B: Backend>(engine: &VoiceoverEngine<B>) -> Result<()> {
    let voices = engine.list_voices().context("Failed to list voices")?;

    if voices.is_empty() {
        println!("No voices found.");
        return Ok(());
    }

    println!("Available voices:");
    for voice in voices {
        println!("  {}: {}", voice.name, voice.sample_path.display());
        if let Some(description) = &voice.description {
            println!("    {description}");
        }
        if let Some(language) = &voice.language {
            println!("    Language: {language}");
        }
    }

    Ok(())
}

fn generate<B: Backend>(
    engine: &VoiceoverEngine<B>,
    args: &GenerateArgs,
    voice: &str,
    script: String,
) -> Result<()> {
    let request = GenerationRequest::new(script, voice)
        .with_language(args.language)
        .with_speed(args.speed)
        .with_temperature(args.temperature)
        .with_output(args.output.clone());

    println!("Generating voiceover...");

    let result = engine
        .generate(&request)
        .context("Failed to generate voiceover")?;
    print_result(&result);

    Ok(())
}

fn print_result(result: &GenerationResult) {
    println!("Audio saved to: {}", result.path.display());
    println!("  Duration: {:.2}s", result.duration_secs);
    if let Ok(meta) = std::fs::metadata(&result.path) {
        println!("  Size: {:.1} KB", meta.len() as f64 / 1024.0);
    }
}

fn print_batch_report(report: &BatchReport) {
    for result in &report.generated {
        print_result(result);
    }
    for path in &report.skipped {
        println!("Skipped empty file: {}", path.display());
    }
    for failure in &report.failed {
        eprintln!("Failed: {}: {}", failure.path.display(), failure.message);
    }
    println!(
        "Batch complete: {} generated, {} skipped, {} failed",
        report.generated.len(),
        report.skipped.len(),
        report.failed.len()
    );
}
