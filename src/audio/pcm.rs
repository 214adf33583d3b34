//! Float ⇄ 16-bit PCM conversion and little-endian byte packing.
//!
//! The wire carries raw little-endian signed 16-bit mono PCM.  Encoding
//! clamps each float to `[-1, 1]` and scales negative values by 32768,
//! non-negative values by 32767 (the asymmetric range of `i16`); decoding
//! divides by 32768.0.  The round trip is lossy (one quantization step) but
//! monotonic and order-preserving.

// ---------------------------------------------------------------------------
// encode / decode
// ---------------------------------------------------------------------------

/// Quantize `f32` samples in `[-1.0, 1.0]` to `i16`.
///
/// Out-of-range inputs are clamped first, so the result is always a valid
/// `i16` (no wrapping).
///
/// # Example
///
/// ```rust
/// use meeting_stream::audio::pcm;
///
/// let encoded = pcm::encode(&[-1.0, 0.0, 1.0]);
/// assert_eq!(encoded, vec![-32768, 0, 32767]);
/// ```
pub fn encode(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = s.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        })
        .collect()
}

/// Dequantize `i16` samples back to `f32` by dividing by 32768.0.
pub fn decode(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

// ---------------------------------------------------------------------------
// Little-endian byte packing
// ---------------------------------------------------------------------------

/// Pack `i16` samples into little-endian bytes for transmission.
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Unpack little-endian bytes into `i16` samples.
///
/// A trailing odd byte (truncated message) is ignored rather than rejected —
/// playback buffers arrive with arbitrary binary length and are decoded
/// generically.
pub fn from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
