//! Diagnostic logging setup shared by both binaries.

use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects debug output for
/// this crate. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let default = if verbose {
        "voiceover_rs=debug,voiceover=debug,voiceover_sample=debug,reqwest=warn,symphonia=warn"
    } else {
        "voiceover_rs=info,voiceover=info,voiceover_sample=info,reqwest=warn,symphonia=warn"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
