//! Sample-rate conversion and channel mixing utilities.
//!
//! The wire protocol carries **16 kHz mono** PCM, while capture and playback
//! devices run at whatever rate the hardware prefers (commonly 44.1 or
//! 48 kHz).  This module provides the three conversion steps:
//!
//! 1. [`stereo_to_mono`] — downmix any number of interleaved channels.
//! 2. [`downsample`] — decimating block average, used on the capture path
//!    (native rate → wire rate).
//! 3. [`resample_linear`] — linear interpolation, used on the playback path
//!    (wire rate → native rate).
//!
//! All three functions are stateless: correctness of a streamed signal only
//! requires the caller to pass contiguous blocks in order.  Accuracy is
//! bounded by the averaging / linear-interpolation error, which is fine for
//! speech-band audio.

// ---------------------------------------------------------------------------
// stereo_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`.
///
/// * If `channels == 1` the input slice is returned as an owned `Vec` with no
///   averaging (fast path — avoids the per-frame division when already mono).
/// * If `channels == 0` an empty vector is returned.
///
/// # Example
///
/// ```rust
/// use meeting_stream::audio::stereo_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = stereo_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.0).abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// downsample
// ---------------------------------------------------------------------------

/// Downsample `samples` from `in_rate` Hz to `out_rate` Hz by averaging.
///
/// Each output sample `i` is the mean of the input window
/// `[round(i * ratio), round((i + 1) * ratio))` where
/// `ratio = in_rate / out_rate`, clamped to the block bounds.  Averaging
/// acts as a crude low-pass filter, which is what we want before shipping
/// speech to a 16 kHz wire.
///
/// * If the rates are equal the input is cloned and returned unchanged.
/// * The output length is `round(samples.len() / ratio)`.
/// * An empty input yields an empty output.
///
/// # Example
///
/// ```rust
/// use meeting_stream::audio::downsample;
///
/// // 480 samples @ 48 kHz = 10 ms → 160 samples @ 16 kHz
/// let hi = vec![0.5_f32; 480];
/// let lo = downsample(&hi, 48_000, 16_000);
/// assert_eq!(lo.len(), 160);
/// ```
pub fn downsample(samples: &[f32], in_rate: u32, out_rate: u32) -> Vec<f32> {
    if in_rate == out_rate {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = in_rate as f64 / out_rate as f64;
    let out_len = (samples.len() as f64 / ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    let mut window_start = 0usize;
    for i in 0..out_len {
        let window_end = ((i + 1) as f64 * ratio).round() as usize;

        let mut accum = 0.0f32;
        let mut count = 0usize;
        let mut idx = window_start;
        while idx < window_end && idx < samples.len() {
            accum += samples[idx];
            count += 1;
            idx += 1;
        }

        // A rounded window can collapse to zero width; never divide by zero.
        out.push(accum / count.max(1) as f32);
        window_start = window_end;
    }

    out
}

// ---------------------------------------------------------------------------
// resample_linear
// ---------------------------------------------------------------------------

/// Resample `samples` from `in_rate` Hz to `out_rate` Hz using linear
/// interpolation.
///
/// Output index `i` maps to the source position `t = i / (out_rate / in_rate)`;
/// the result is `in[floor(t)] * (1 - frac) + in[ceil(t)] * frac` with the
/// upper index clamped to the last valid sample.
///
/// * If the rates are equal the input is cloned and returned unchanged.
/// * The output length is `floor(samples.len() * out_rate / in_rate)`.
/// * An empty input yields an empty output.
///
/// # Example
///
/// ```rust
/// use meeting_stream::audio::resample_linear;
///
/// // 160 samples @ 16 kHz = 10 ms → 480 samples @ 48 kHz
/// let wire = vec![0.25_f32; 160];
/// let native = resample_linear(&wire, 16_000, 48_000);
/// assert_eq!(native.len(), 480);
/// ```
pub fn resample_linear(samples: &[f32], in_rate: u32, out_rate: u32) -> Vec<f32> {
    if in_rate == out_rate {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = out_rate as f64 / in_rate as f64;
    let out_len = (samples.len() as f64 * ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let t = i as f64 / ratio;
        let i0 = t as usize;
        let i1 = (i0 + 1).min(samples.len() - 1);
        let frac = (t - i0 as f64) as f32;

        out.push(samples[i0] * (1.0 - frac) + samples[i1] * frac);
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- stereo_to_mono ----------------------------------------------------

    #[test]
    fn stereo_to_mono_already_mono() {
        let input = vec![0.1_f32, 0.2, 0.3];
        let out = stereo_to_mono(&input, 1);
        assert_eq!(out, input);
    }

    #[test]
    fn stereo_to_mono_two_channel() {
        let input = vec![1.0_f32, -1.0, 0.5, 0.5];
        let out = stereo_to_mono(&input, 2);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6); // (1.0 + -1.0) / 2
        assert!((out[1] - 0.5).abs() < 1e-6); // (0.5 + 0.5) / 2
    }

    #[test]
    fn stereo_to_mono_zero_channels() {
        let out = stereo_to_mono(&[1.0_f32, 2.0], 0);
        assert!(out.is_empty());
    }

    // ---- downsample --------------------------------------------------------

    #[test]
    fn downsample_equal_rates_is_identity() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        let out = downsample(&input, 16_000, 16_000);
        assert_eq!(out, input);
    }

    #[test]
    fn downsample_empty_input() {
        let out = downsample(&[], 48_000, 16_000);
        assert!(out.is_empty());
    }

    #[test]
    fn downsample_48k_to_16k_output_length() {
        // 480 samples @ 48 kHz = 10 ms → 160 samples @ 16 kHz
        let input = vec![0.5_f32; 480];
        let out = downsample(&input, 48_000, 16_000);
        assert_eq!(out.len(), 160);
    }

    #[test]
    fn downsample_44100_to_16k_output_length() {
        // 1 second @ 44.1 kHz → ~16 000 output samples
        let input = vec![0.0_f32; 44_100];
        let out = downsample(&input, 44_100, 16_000);
        assert!(
            out.len().abs_diff(16_000) <= 1,
            "expected ~16000, got {}",
            out.len()
        );
    }

    #[test]
    fn downsample_constant_signal_preserves_amplitude() {
        // Averaging a DC signal must not change its level.
        let input = vec![0.5_f32; 480];
        let out = downsample(&input, 48_000, 16_000);
        for &s in &out {
            assert!((s - 0.5).abs() < 1e-5, "amplitude drift: {s}");
        }
    }

    #[test]
    fn downsample_48k_to_16k_averages_triples() {
        // ratio 3: each output sample is the mean of 3 consecutive inputs.
        let input = vec![0.0_f32, 3.0, 6.0, 9.0, 9.0, 9.0];
        let out = downsample(&input, 48_000, 16_000);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 3.0).abs() < 1e-6); // (0 + 3 + 6) / 3
        assert!((out[1] - 9.0).abs() < 1e-6); // (9 + 9 + 9) / 3
    }

    // ---- resample_linear ---------------------------------------------------

    #[test]
    fn resample_linear_equal_rates_is_identity() {
        let input: Vec<f32> = (0..100).map(|i| (i as f32).sin()).collect();
        let out = resample_linear(&input, 16_000, 16_000);
        assert_eq!(out, input);
    }

    #[test]
    fn resample_linear_empty_input() {
        let out = resample_linear(&[], 16_000, 48_000);
        assert!(out.is_empty());
    }

    #[test]
    fn resample_linear_16k_to_48k_output_length() {
        let input = vec![0.25_f32; 160];
        let out = resample_linear(&input, 16_000, 48_000);
        assert_eq!(out.len(), 480);
    }

    #[test]
    fn resample_linear_constant_signal_preserves_amplitude() {
        let input = vec![0.25_f32; 160];
        let out = resample_linear(&input, 16_000, 48_000);
        for &s in &out {
            assert!((s - 0.25).abs() < 1e-6, "amplitude drift: {s}");
        }
    }

    #[test]
    fn resample_linear_interpolates_midpoints() {
        // Doubling the rate of a ramp must place midpoints between samples.
        let input = vec![0.0_f32, 1.0];
        let out = resample_linear(&input, 16_000, 32_000);
        assert_eq!(out.len(), 4);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[2] - 1.0).abs() < 1e-6); // clamped to last index
        assert!((out[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn resample_linear_values_stay_within_input_range() {
        // Linear interpolation never overshoots the input envelope.
        let input: Vec<f32> = (0..441).map(|i| (i as f32 * 0.1).sin()).collect();
        let out = resample_linear(&input, 44_100, 48_000);
        let min = input.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = input.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        for &s in &out {
            assert!(s >= min - 1e-6 && s <= max + 1e-6);
        }
    }
}
