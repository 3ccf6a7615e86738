//! MP3 encoding through LAME.

use std::path::Path;

use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, InterleavedPcm, MonoPcm, Quality};

use super::{AudioClip, AudioError};

/// Frames LAME may still hold back at flush time.
const FLUSH_RESERVE: usize = 7200;

/// Encode a clip as 192 kbps MP3, duplicating the mono signal across
/// `channels` (1 or 2).
pub fn encode_mp3(clip: &AudioClip, channels: u16) -> Result<Vec<u8>, AudioError> {
    if !(1..=2).contains(&channels) {
        return Err(AudioError::Encode(format!(
            "mp3 supports 1 or 2 channels, got {channels}"
        )));
    }

    let mut builder = Builder::new()
        .ok_or_else(|| AudioError::Encode("failed to initialize LAME".to_string()))?;
    builder.set_num_channels(channels as u8).map_err(lame_err)?;
    builder.set_sample_rate(clip.sample_rate).map_err(lame_err)?;
    builder.set_brate(Bitrate::Kbps192).map_err(lame_err)?;
    builder.set_quality(Quality::Best).map_err(lame_err)?;
    let mut encoder = builder.build().map_err(lame_err)?;

    let pcm: Vec<i16> = clip
        .samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect();

    let mut out = Vec::new();
    out.reserve(mp3lame_encoder::max_required_buffer_size(pcm.len() * channels as usize));

    if channels == 1 {
        encoder
            .encode_to_vec(MonoPcm(&pcm), &mut out)
            .map_err(lame_err)?;
    } else {
        let interleaved: Vec<i16> = pcm.iter().flat_map(|&s| [s, s]).collect();
        encoder
            .encode_to_vec(InterleavedPcm(&interleaved), &mut out)
            .map_err(lame_err)?;
    }

    out.reserve(FLUSH_RESERVE);
    encoder
        .flush_to_vec::<FlushNoGap>(&mut out)
        .map_err(lame_err)?;

    Ok(out)
}

/// Encode and write a clip as MP3.
pub fn write_mp3(path: &Path, clip: &AudioClip, channels: u16) -> Result<(), AudioError> {
    let bytes = encode_mp3(clip, channels)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn lame_err<E: std::fmt::Debug>(e: E) -> AudioError {
    AudioError::Encode(format!("mp3: {e:?}"))
}
