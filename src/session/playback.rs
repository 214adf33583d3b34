//! Playback session — wire bytes to the speaker.
//!
//! [`PlaybackSession`] owns the device output stream and the jitter buffer
//! feeding its render callback:
//!
//! ```text
//! TransportEvent::Binary ──▶ PlaybackFeed::on_binary_frame
//!   └─ pcm decode → resample_linear(wire → native) → JitterBuffer
//!                                                       │
//!                     cpal render callback ◀────────────┘
//! ```
//!
//! The session itself is not `Send` (it holds the cpal stream), so the
//! network-facing half is split out as [`PlaybackFeed`] — a cheap `Send`
//! handle the orchestrator's event task can own.

use std::sync::{Arc, Mutex};

use crate::audio::{pcm, resample_linear, AudioPlayback, JitterBuffer, StreamHandle};
use crate::config::AudioSettings;

use super::meeting::SessionError;
use super::state::StreamState;

// ---------------------------------------------------------------------------
// decode_frame
// ---------------------------------------------------------------------------

/// Decode one binary payload into device-rate samples.
///
/// Accepts arbitrary binary length (a trailing odd byte is ignored), so any
/// render-side buffering the server does is handled generically.
pub fn decode_frame(bytes: &[u8], wire_rate: u32, device_rate: u32) -> Vec<f32> {
    let samples = pcm::decode(&pcm::from_le_bytes(bytes));
    resample_linear(&samples, wire_rate, device_rate)
}

// ---------------------------------------------------------------------------
// PlaybackFeed
// ---------------------------------------------------------------------------

/// `Send` handle for pushing network audio into a running playback session.
#[derive(Clone)]
pub struct PlaybackFeed {
    jitter: Arc<Mutex<JitterBuffer>>,
    wire_rate: u32,
    device_rate: u32,
}

impl PlaybackFeed {
    /// Decode `bytes`, convert to the device rate and queue for rendering.
    pub fn on_binary_frame(&self, bytes: &[u8]) {
        let chunk = decode_frame(bytes, self.wire_rate, self.device_rate);
        self.jitter.lock().unwrap().push(chunk);
    }

    /// Samples currently queued ahead of the render callback.
    pub fn queued_samples(&self) -> usize {
        self.jitter.lock().unwrap().queued_samples()
    }

    /// Build a feed around an existing jitter buffer, bypassing the device.
    #[cfg(test)]
    pub(crate) fn for_tests(
        jitter: Arc<Mutex<JitterBuffer>>,
        wire_rate: u32,
        device_rate: u32,
    ) -> Self {
        Self {
            jitter,
            wire_rate,
            device_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackSession
// ---------------------------------------------------------------------------

/// Owns the speaker stream and its jitter buffer.
pub struct PlaybackSession {
    state: StreamState,
    /// RAII guard for the cpal output stream.
    stream: Option<StreamHandle>,
    jitter: Option<Arc<Mutex<JitterBuffer>>>,
    wire_rate: u32,
    device_rate: u32,
}

impl PlaybackSession {
    /// Create a stopped session.
    pub fn new() -> Self {
        Self {
            state: StreamState::Stopped,
            stream: None,
            jitter: None,
            wire_rate: 0,
            device_rate: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Acquire the default output device and begin rendering.
    ///
    /// The jitter buffer is sized for the device's native rate using the
    /// configured prebuffer duration, so playback starts only once enough
    /// audio is queued.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Busy`] — a start or stop is already in flight.
    /// - [`SessionError::Playback`] — the device is unavailable; no partial
    ///   state is left behind.
    pub fn start(&mut self, settings: &AudioSettings) -> Result<(), SessionError> {
        if self.state != StreamState::Stopped {
            return Err(SessionError::Busy);
        }
        self.state = StreamState::Starting;

        let playback = match AudioPlayback::new() {
            Ok(p) => p,
            Err(e) => {
                self.state = StreamState::Stopped;
                return Err(e.into());
            }
        };

        let device_rate = playback.sample_rate();
        let threshold = settings.prebuffer_samples(device_rate);
        let jitter = Arc::new(Mutex::new(JitterBuffer::new(threshold)));

        log::info!(
            "playback: device at {device_rate} Hz, prebuffer {threshold} samples ({} s)",
            settings.prebuffer_secs
        );

        let stream = match playback.start(Arc::clone(&jitter)) {
            Ok(s) => s,
            Err(e) => {
                self.state = StreamState::Stopped;
                return Err(e.into());
            }
        };

        self.stream = Some(stream);
        self.jitter = Some(jitter);
        self.wire_rate = settings.wire_sample_rate;
        self.device_rate = device_rate;
        self.state = StreamState::Running;
        log::info!("playback: running");
        Ok(())
    }

    /// A [`PlaybackFeed`] for the orchestrator, or `None` when not running.
    pub fn feed(&self) -> Option<PlaybackFeed> {
        self.jitter.as_ref().map(|jitter| PlaybackFeed {
            jitter: Arc::clone(jitter),
            wire_rate: self.wire_rate,
            device_rate: self.device_rate,
        })
    }

    /// Release the device stream and discard queued audio.
    ///
    /// Idempotent — calling `stop` when already stopped is a no-op.
    pub fn stop(&mut self) {
        if self.state == StreamState::Stopped {
            return;
        }
        self.state = StreamState::Stopping;

        self.stream = None;
        if let Some(jitter) = self.jitter.take() {
            jitter.lock().unwrap().clear();
        }

        self.state = StreamState::Stopped;
        log::info!("playback: stopped");
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- decode_frame ------------------------------------------------------

    #[test]
    fn decode_frame_at_wire_rate_is_plain_pcm() {
        let bytes = pcm::to_le_bytes(&pcm::encode(&[0.5f32, -0.5]));
        let out = decode_frame(&bytes, 16_000, 16_000);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.5).abs() < 1e-3);
        assert!((out[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn decode_frame_upsamples_to_device_rate() {
        // 320 wire samples → 960 at a 48 kHz device.
        let bytes = pcm::to_le_bytes(&vec![0i16; 320]);
        let out = decode_frame(&bytes, 16_000, 48_000);
        assert_eq!(out.len(), 960);
    }

    #[test]
    fn decode_frame_tolerates_odd_length() {
        let mut bytes = pcm::to_le_bytes(&vec![100i16; 4]);
        bytes.push(0xFF); // truncated trailing byte
        let out = decode_frame(&bytes, 16_000, 16_000);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn decode_frame_empty_payload() {
        assert!(decode_frame(&[], 16_000, 48_000).is_empty());
    }

    // ---- PlaybackFeed ------------------------------------------------------

    #[test]
    fn feed_pushes_into_jitter_buffer() {
        let jitter = Arc::new(Mutex::new(JitterBuffer::new(0)));
        let feed = PlaybackFeed {
            jitter: Arc::clone(&jitter),
            wire_rate: 16_000,
            device_rate: 16_000,
        };

        feed.on_binary_frame(&pcm::to_le_bytes(&vec![1000i16; 320]));
        assert_eq!(feed.queued_samples(), 320);

        let mut out = [0.0f32; 160];
        jitter.lock().unwrap().render(&mut out);
        assert_eq!(feed.queued_samples(), 160);
    }

    // ---- Session state -----------------------------------------------------

    #[test]
    fn new_session_is_stopped_with_no_feed() {
        let session = PlaybackSession::new();
        assert_eq!(session.state(), StreamState::Stopped);
        assert!(session.feed().is_none());
    }

    #[test]
    fn stop_when_stopped_is_a_noop() {
        let mut session = PlaybackSession::new();
        session.stop();
        session.stop();
        assert_eq!(session.state(), StreamState::Stopped);
    }
}
