//! Microphone capture using cpal.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use super::dsp::to_mono;
use super::{AudioClip, AudioError};

/// Record `seconds` of audio from the default input device.
///
/// Captures at the device's native rate and channel layout and downmixes to
/// mono. Resampling is left to the caller.
///
/// # Errors
///
/// Returns [`AudioError::DeviceUnavailable`] when there is no usable input
/// device, and [`AudioError::Empty`] if the device delivered no samples.
pub fn record(seconds: u32) -> Result<AudioClip, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::DeviceUnavailable("no default input device".into()))?;

    let device_name = device
        .description()
        .map(|d| d.name().to_owned())
        .unwrap_or_else(|_| "<unknown>".into());

    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::DeviceUnavailable(format!("no default input config: {e}")))?;

    let native_rate = supported.sample_rate();
    let channels = supported.channels();
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    info!("recording from {device_name}: {native_rate}Hz, {channels} channel(s), {sample_format:?}");

    let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, &buffer)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, &buffer)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, &buffer)?,
        other => {
            return Err(AudioError::DeviceUnavailable(format!(
                "unsupported input sample format {other:?}"
            )));
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::DeviceUnavailable(format!("failed to start input stream: {e}")))?;

    let total = Duration::from_secs(seconds as u64);
    let progress = ProgressBar::new(total.as_millis() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:50} {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress.set_message("recording");

    let started = Instant::now();
    while started.elapsed() < total {
        thread::sleep(Duration::from_millis(100));
        progress.set_position(started.elapsed().min(total).as_millis() as u64);
    }
    progress.finish_with_message("done");
    drop(stream);

    let samples = buffer
        .lock()
        .map_err(|_| AudioError::DeviceUnavailable("record buffer poisoned".into()))?
        .clone();

    if samples.is_empty() {
        return Err(AudioError::Empty);
    }

    Ok(AudioClip::new(samples, native_rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: u16,
    buffer: &Arc<Mutex<Vec<f32>>>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let buffer = Arc::clone(buffer);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let converted: Vec<f32> = data.iter().map(|&s| f32::from_sample(s)).collect();
                let mono = to_mono(&converted, channels);
                if let Ok(mut guard) = buffer.lock() {
                    guard.extend(mono);
                }
            },
            move |err| {
                error!("audio input stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::DeviceUnavailable(format!("failed to build input stream: {e}")))
}
