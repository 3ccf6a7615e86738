//! Reading and writing audio files.

use std::io::{Cursor, Read};
use std::path::Path;

use tracing::debug;

use super::dsp::to_mono;
use super::{AudioClip, AudioError};

/// Basic facts about a WAV file on disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub duration_secs: f32,
}

/// Read a WAV file into a mono clip.
pub fn read_wav(path: &Path) -> Result<AudioClip, AudioError> {
    let reader = hound::WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            AudioError::FileNotFound(path.display().to_string())
        }
        hound::Error::Unsupported => AudioError::UnsupportedFormat(format!(
            "'{}': unsupported WAV encoding",
            path.display()
        )),
        other => AudioError::Decode(format!("failed to open '{}': {other}", path.display())),
    })?;
    decode_reader(reader)
}

/// Decode an in-memory WAV body, as returned by the model server.
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<AudioClip, AudioError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| AudioError::Decode(format!("invalid WAV data: {e}")))?;
    decode_reader(reader)
}

/// Read the header of a WAV file without decoding samples.
pub fn probe_wav(path: &Path) -> Result<AudioInfo, AudioError> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| AudioError::Decode(format!("failed to open '{}': {e}", path.display())))?;
    let spec = reader.spec();
    Ok(AudioInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        duration_secs: reader.duration() as f32 / spec.sample_rate as f32,
    })
}

fn decode_reader<R: Read>(reader: hound::WavReader<R>) -> Result<AudioClip, AudioError> {
    let spec = reader.spec();
    let read_err = |e: hound::Error| AudioError::Decode(format!("failed to read samples: {e}"));

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32_768.0))
            .collect::<Result<_, _>>()
            .map_err(read_err)?,
        (hound::SampleFormat::Int, 24) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0))
            .collect::<Result<_, _>>()
            .map_err(read_err)?,
        (hound::SampleFormat::Int, 32) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect::<Result<_, _>>()
            .map_err(read_err)?,
        (hound::SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(read_err)?,
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{format:?} {bits}-bit WAV"
            )));
        }
    };

    Ok(AudioClip::new(
        to_mono(&samples, spec.channels),
        spec.sample_rate,
    ))
}

/// Decode any supported audio file (wav, mp3, flac) into a mono clip.
///
/// WAV goes through `hound`; everything else is probed with symphonia.
pub fn decode_file(path: &Path) -> Result<AudioClip, AudioError> {
    if !path.exists() {
        return Err(AudioError::FileNotFound(path.display().to_string()));
    }

    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if is_wav {
        return match read_wav(path) {
            Err(AudioError::UnsupportedFormat(msg)) => {
                debug!("{msg}, retrying with symphonia");
                decode_with_symphonia(path).map(|(clip, _)| clip)
            }
            other => other,
        };
    }

    decode_with_symphonia(path).map(|(clip, _)| clip)
}

/// Header facts for any supported audio file.
///
/// WAV headers are read directly; compressed files are decoded in full to
/// measure their length.
pub fn probe_audio(path: &Path) -> Result<AudioInfo, AudioError> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if is_wav {
        return probe_wav(path);
    }

    if !path.exists() {
        return Err(AudioError::FileNotFound(path.display().to_string()));
    }
    let (clip, channels) = decode_with_symphonia(path)?;
    Ok(AudioInfo {
        sample_rate: clip.sample_rate,
        channels,
        bits_per_sample: 0,
        duration_secs: clip.duration_secs(),
    })
}

/// Decode through symphonia. Returns the mono clip and the source channel
/// count.
fn decode_with_symphonia(path: &Path) -> Result<(AudioClip, u16), AudioError> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::errors::Error as SymphError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("failed to probe '{}': {e}", path.display())))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AudioError::Decode("no default audio track".into()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("failed to create decoder: {e}")))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut source_channels = codec_params.channels.map_or(0, |c| c.count() as u16);

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(AudioError::Decode(format!("audio read error: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphError::DecodeError(e)) => {
                debug!("skipping undecodable packet: {e}");
                continue;
            }
            Err(e) => return Err(AudioError::Decode(format!("audio decode error: {e}"))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let frames = decoded.frames();
        source_channels = channels as u16;

        let needs_new = sample_buf
            .as_ref()
            .is_none_or(|b| b.capacity() < frames * channels);
        if needs_new {
            sample_buf = Some(SampleBuffer::<f32>::new(frames as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            mono.extend(to_mono(buf.samples(), channels as u16));
        }
    }

    Ok((AudioClip::new(mono, sample_rate), source_channels))
}

/// Write a clip as 16-bit PCM WAV, duplicating the mono signal across
/// `channels`. Samples are clamped to [-1, 1].
pub fn write_wav(path: &Path, clip: &AudioClip, channels: u16) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let encode_err =
        |e: hound::Error| AudioError::Encode(format!("'{}': {e}", path.display()));

    let mut writer = hound::WavWriter::create(path, spec).map_err(encode_err)?;
    for &s in &clip.samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        for _ in 0..channels {
            writer.write_sample(v).map_err(encode_err)?;
        }
    }
    writer.finalize().map_err(encode_err)?;

    Ok(())
}
