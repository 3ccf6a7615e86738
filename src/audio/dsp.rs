//! Sample-level signal processing on mono `f32` buffers.

/// Convert interleaved multi-channel audio to mono by averaging channels.
pub fn to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    let ch = channels as usize;
    data.chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Linear-interpolation resampler.
///
/// Speech energy sits well below the Nyquist limit of every rate used here,
/// so no anti-alias filter is applied.
pub fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if input.is_empty() || from_rate == to_rate || from_rate == 0 || to_rate == 0 {
        return input.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = ((input.len() as f64) * ratio).round() as usize;
    let last = input.len() - 1;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let i0 = (src_pos.floor() as usize).min(last);
        let i1 = (i0 + 1).min(last);
        let t = (src_pos - i0 as f64).clamp(0.0, 1.0) as f32;
        out.push(input[i0] * (1.0 - t) + input[i1] * t);
    }

    out
}

/// Largest absolute sample value.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Scale samples so the peak sits at `target` (0.0 to 1.0).
///
/// Silent buffers are left untouched.
pub fn normalize_peak(samples: &mut [f32], target: f32) {
    let max_val = peak(samples);
    if max_val > 0.0 {
        let gain = target / max_val;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
}

/// Root mean square of the buffer.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// RMS loudness relative to full scale. Silence is `-inf`.
pub fn dbfs(samples: &[f32]) -> f32 {
    let level = rms(samples);
    if level > 0.0 {
        20.0 * level.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Apply a gain in decibels.
pub fn apply_gain_db(samples: &mut [f32], gain_db: f32) {
    let gain = 10f32.powf(gain_db / 20.0);
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// Bring the buffer's RMS loudness to `target_dbfs`.
pub fn normalize_loudness(samples: &mut [f32], target_dbfs: f32) {
    let current = dbfs(samples);
    if current.is_finite() {
        apply_gain_db(samples, target_dbfs - current);
    }
}

/// Trim leading and trailing samples quieter than `top_db` below the peak.
pub fn trim_silence(samples: &[f32], top_db: f32) -> Vec<f32> {
    let max_val = peak(samples);
    if max_val <= 0.0 {
        return samples.to_vec();
    }
    let threshold = max_val * 10f32.powf(-top_db / 20.0);

    let start = samples.iter().position(|s| s.abs() > threshold);
    let end = samples.iter().rposition(|s| s.abs() > threshold);

    match (start, end) {
        (Some(start), Some(end)) if start <= end => samples[start..=end].to_vec(),
        _ => samples.to_vec(),
    }
}

/// The `pct` percentile (0 to 100) of absolute sample values.
pub fn percentile_abs(samples: &[f32], pct: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f32> = samples.iter().map(|s| s.abs()).collect();
    sorted.sort_by(f32::total_cmp);
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    sorted[rank.round() as usize]
}

/// Soft noise gate: samples at or below the `pct` percentile of |x| are
/// multiplied by `attenuation` instead of being removed.
pub fn noise_gate(samples: &[f32], pct: f32, attenuation: f32) -> Vec<f32> {
    let threshold = percentile_abs(samples, pct);
    samples
        .iter()
        .map(|&s| if s.abs() > threshold { s } else { s * attenuation })
        .collect()
}

/// Join segments with `gap` samples of silence between each pair.
pub fn concat_with_gap(segments: &[Vec<f32>], gap: usize) -> Vec<f32> {
    let total: usize = segments.iter().map(Vec::len).sum::<usize>()
        + gap * segments.len().saturating_sub(1);
    let mut out = Vec::with_capacity(total);

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.resize(out.len() + gap, 0.0);
        }
        out.extend_from_slice(segment);
    }

    out
}

/// Cut a buffer into consecutive chunks of at most `max_secs`.
pub fn split_into_chunks(samples: &[f32], sample_rate: u32, max_secs: f32) -> Vec<Vec<f32>> {
    let chunk_len = ((max_secs * sample_rate as f32) as usize).max(1);
    samples.chunks(chunk_len).map(<[f32]>::to_vec).collect()
}

/// Rough signal-to-noise estimate from frame RMS: the loudest frame against
/// the average frame, in dB.
pub fn estimate_snr_db(samples: &[f32]) -> f32 {
    const FRAME: usize = 2048;
    const HOP: usize = 512;

    if samples.is_empty() {
        return 0.0;
    }

    let frames: Vec<f32> = if samples.len() <= FRAME {
        vec![rms(samples)]
    } else {
        (0..=(samples.len() - FRAME) / HOP)
            .map(|i| rms(&samples[i * HOP..i * HOP + FRAME]))
            .collect()
    };

    let max_rms = frames.iter().copied().fold(0.0f32, f32::max);
    let mean_rms = frames.iter().sum::<f32>() / frames.len() as f32;
    20.0 * (max_rms / (mean_rms + 1e-10) + 1e-10).log10()
}
