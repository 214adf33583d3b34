//! Speaker playback via `cpal`, driven by a [`JitterBuffer`].
//!
//! [`AudioPlayback`] mirrors [`crate::audio::AudioCapture`] for the output
//! direction: it wraps the default output device and builds a stream whose
//! render callback pulls samples from a shared [`JitterBuffer`].
//!
//! The render callback is real-time code.  It renders mono audio into a
//! scratch buffer sized once at stream start, then fans the samples out
//! across the device's interleaved channels — no allocation in steady state,
//! and the jitter-buffer lock is only held for a bounded copy.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::capture::StreamHandle;
use super::jitter::JitterBuffer;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up the audio output.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no output device found on the default audio host")]
    NoDevice,

    #[error("failed to query default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioPlayback
// ---------------------------------------------------------------------------

/// Speaker output device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::{Arc, Mutex};
/// use meeting_stream::audio::{AudioPlayback, JitterBuffer};
///
/// let playback = AudioPlayback::new().unwrap();
/// let prebuffer = (playback.sample_rate() as f32 * 1.5) as usize;
/// let jitter = Arc::new(Mutex::new(JitterBuffer::new(prebuffer)));
/// let _handle = playback.start(Arc::clone(&jitter)).unwrap();
/// // feed `jitter` from the network; drop `_handle` to stop playback.
/// ```
pub struct AudioPlayback {
    device: cpal::Device,
    config: cpal::StreamConfig,
    /// Native sample rate reported by the device (Hz).
    sample_rate: u32,
    /// Number of interleaved output channels.
    channels: u16,
}

impl AudioPlayback {
    /// Create a new [`AudioPlayback`] using the system default output device.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::NoDevice`] when no output device is
    /// available, or [`PlaybackError::DefaultConfig`] when the device cannot
    /// report a default stream configuration.
    pub fn new() -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(PlaybackError::NoDevice)?;

        let supported = device.default_output_config()?;

        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start rendering audio pulled from `jitter`.
    ///
    /// The returned [`StreamHandle`] keeps the stream alive; drop it to stop.
    /// The callback renders mono from the jitter buffer and duplicates each
    /// sample across all interleaved device channels.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::BuildStream`] or [`PlaybackError::PlayStream`]
    /// if the platform rejects the stream configuration.
    pub fn start(&self, jitter: Arc<Mutex<JitterBuffer>>) -> Result<StreamHandle, PlaybackError> {
        let channels = self.channels as usize;
        // Mono scratch buffer, grown once to the largest callback size and
        // reused thereafter.
        let mut mono: Vec<f32> = Vec::new();

        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                if mono.len() < frames {
                    mono.resize(frames, 0.0);
                }

                match jitter.lock() {
                    Ok(mut jb) => jb.render(&mut mono[..frames]),
                    Err(_) => {
                        // Poisoned lock: output silence rather than panic on
                        // the audio thread.
                        mono[..frames].fill(0.0);
                    }
                }

                for (frame, &sample) in data.chunks_mut(channels.max(1)).zip(mono.iter()) {
                    frame.fill(sample);
                }
            },
            |err: cpal::StreamError| {
                log::error!("playback: cpal stream error: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle::new(stream))
    }

    /// Native sample rate of the output stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved output channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
