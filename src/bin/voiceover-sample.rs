//! voiceover-sample CLI entry point.

use std::io::Write;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use voiceover_rs::cli::SampleArgs;
use voiceover_rs::sample::{self, DurationStatus, SamplePreparer, SampleReport};

fn main() -> Result<()> {
    let args = SampleArgs::parse();
    voiceover_rs::logging::init(args.verbose);

    let preparer = SamplePreparer::new();

    let reports = match &args.input {
        Some(input) => {
            if !input.exists() {
                bail!("Input file not found: {}", input.display());
            }
            if args.split {
                preparer
                    .prepare_split(input, &args.output)
                    .with_context(|| format!("Failed to split {}", input.display()))?
            } else {
                vec![
                    preparer
                        .prepare_file(input, &args.output)
                        .with_context(|| format!("Failed to process {}", input.display()))?,
                ]
            }
        }
        None => {
            countdown(3)?;
            println!("Recording for {} seconds... Speak now!", args.duration);
            vec![
                preparer
                    .record(args.duration, &args.output)
                    .context("Failed to record voice sample")?,
            ]
        }
    };

    for report in &reports {
        print_report(report);
    }

    let mut voice_name = reports
        .first()
        .and_then(|r| r.path.file_stem())
        .and_then(|s| s.to_str())
        .map(str::to_string);

    if args.wants_metadata() {
        let written = sample::write_metadata_all(
            &reports,
            args.name.as_deref(),
            args.description.as_deref(),
            args.language,
        )
        .context("Failed to write voice metadata")?;
        for metadata in &written {
            println!("Metadata saved for voice '{}'", metadata.name);
        }
        if let Some(first) = written.first() {
            voice_name = Some(first.name.clone());
        }
    }

    if let Some(name) = voice_name {
        print_usage_hint(&name);
    }

    Ok(())
}

fn countdown(seconds: u32) -> Result<()> {
    println!("Recording starts in:");
    let mut stdout = std::io::stdout();
    for i in (1..=seconds).rev() {
        print!("  {i}...");
        stdout.flush()?;
        thread::sleep(Duration::from_secs(1));
    }
    println!();
    Ok(())
}

fn print_report(report: &SampleReport) {
    println!("Voice sample saved to: {}", report.path.display());
    println!("  Duration: {:.2}s", report.duration_secs);
    println!("  Sample rate: {} Hz", report.sample_rate);
    println!("  Channels: {}", report.channels);
    match report.status {
        DurationStatus::TooShort => println!(
            "  Warning: shorter than {}s, cloning quality may suffer",
            sample::MIN_DURATION_SECS
        ),
        DurationStatus::Truncated => println!(
            "  Note: truncated to the first {}s",
            sample::MAX_DURATION_SECS
        ),
        DurationStatus::Optimal => {}
    }
    if report.is_clipping() {
        println!("  Warning: audio may be clipping");
    }
    if report.is_noisy() {
        println!("  Warning: audio may be noisy (SNR ~{:.1} dB)", report.snr_db);
    }
}

fn print_usage_hint(voice: &str) {
    println!();
    println!("Use this voice with:");
    println!("  voiceover \"Your text here\" --voice {voice}");
}
