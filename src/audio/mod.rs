//! Audio pipeline — capture, rate conversion, framing, PCM codec, playback.
//!
//! # Capture path
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → stereo_to_mono
//!           → downsample (native → 16 kHz) → Framer (320-sample frames)
//!           → pcm::encode → wire bytes
//! ```
//!
//! # Playback path
//!
//! ```text
//! wire bytes → pcm::decode → resample_linear (16 kHz → native)
//!           → JitterBuffer → cpal render callback → Speaker
//! ```
//!
//! The cpal callbacks are the real-time domain; everything between the two
//! channels runs in the control domain.  See [`crate::session`] for the
//! lifecycle layer that wires these pieces together.

pub mod capture;
pub mod framer;
pub mod jitter;
pub mod pcm;
pub mod playback;
pub mod resample;

pub use capture::{AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use framer::Framer;
pub use jitter::JitterBuffer;
pub use playback::{AudioPlayback, PlaybackError};
pub use resample::{downsample, resample_linear, stereo_to_mono};
