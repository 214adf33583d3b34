//! Capture session — microphone to wire frames.
//!
//! [`CaptureSession`] owns the device input stream and the control task that
//! turns raw device callbacks into wire frames:
//!
//! ```text
//! cpal callback ──AudioChunk──▶ control task
//!   └─ stereo_to_mono → downsample(native → wire) → Framer → pcm encode
//!        └─▶ FrameSink::send_frame (exactly frame_samples per frame)
//! ```
//!
//! Acquisition failure surfaces as an error and leaves no partial state;
//! [`CaptureSession::stop`] is idempotent and discards the framer carry with
//! the control task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::{downsample, pcm, stereo_to_mono, AudioCapture, AudioChunk, Framer, StreamHandle};
use crate::config::AudioSettings;
use crate::transport::FrameSink;

use super::meeting::SessionError;
use super::state::StreamState;

// ---------------------------------------------------------------------------
// encode_chunk
// ---------------------------------------------------------------------------

/// Process one device chunk into zero or more wire payloads.
///
/// Pure except for the framer carry, so the capture path is testable without
/// a device: downmix, downsample to the wire rate, frame, quantize, pack.
/// Every returned payload is exactly `framer.frame_size() * 2` bytes.
pub fn encode_chunk(framer: &mut Framer, chunk: &AudioChunk, wire_rate: u32) -> Vec<Vec<u8>> {
    let mono = stereo_to_mono(&chunk.samples, chunk.channels);
    let down = downsample(&mono, chunk.sample_rate, wire_rate);
    framer
        .push(&down)
        .into_iter()
        .map(|frame| pcm::to_le_bytes(&pcm::encode(&frame)))
        .collect()
}

// ---------------------------------------------------------------------------
// CaptureSession
// ---------------------------------------------------------------------------

/// Owns the microphone stream and its control task.
///
/// Not `Send`: the cpal stream must stay on the thread that created it, so
/// the session lives with its owner while the control task runs on the
/// runtime.
pub struct CaptureSession {
    state: StreamState,
    /// RAII guard for the cpal input stream; dropping it stops callbacks.
    stream: Option<StreamHandle>,
    /// Control task; ends on its own once the stream (and with it the
    /// channel sender) is dropped.
    task: Option<JoinHandle<()>>,
}

impl CaptureSession {
    /// Create a stopped session.
    pub fn new() -> Self {
        Self {
            state: StreamState::Stopped,
            stream: None,
            task: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Acquire the default input device and begin emitting wire frames to
    /// `sink`.
    ///
    /// Must be called from within a tokio runtime (spawns the control task).
    ///
    /// # Errors
    ///
    /// - [`SessionError::Busy`] — a start or stop is already in flight, or
    ///   the session is already running.
    /// - [`SessionError::Capture`] — the device is unavailable; no partial
    ///   state is left behind.
    pub fn start(
        &mut self,
        settings: &AudioSettings,
        sink: Arc<dyn FrameSink>,
    ) -> Result<(), SessionError> {
        if self.state != StreamState::Stopped {
            return Err(SessionError::Busy);
        }
        self.state = StreamState::Starting;

        let capture = match AudioCapture::new() {
            Ok(c) => c,
            Err(e) => {
                self.state = StreamState::Stopped;
                return Err(e.into());
            }
        };

        log::info!(
            "capture: device at {} Hz, {} channel(s)",
            capture.sample_rate(),
            capture.channels()
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<AudioChunk>();

        let wire_rate = settings.wire_sample_rate;
        let frame_samples = settings.frame_samples();
        let task = tokio::spawn(async move {
            let mut framer = Framer::new(frame_samples);
            while let Some(chunk) = rx.recv().await {
                for payload in encode_chunk(&mut framer, &chunk, wire_rate) {
                    sink.send_frame(payload);
                }
            }
            // Stream dropped: remaining carry is discarded with the framer.
            log::debug!("capture: control task finished");
        });

        let stream = match capture.start(tx) {
            Ok(s) => s,
            Err(e) => {
                task.abort();
                self.state = StreamState::Stopped;
                return Err(e.into());
            }
        };

        self.stream = Some(stream);
        self.task = Some(task);
        self.state = StreamState::Running;
        log::info!("capture: running");
        Ok(())
    }

    /// Release the device stream and end the control task.
    ///
    /// Idempotent — calling `stop` when already stopped is a no-op.
    pub fn stop(&mut self) {
        if self.state == StreamState::Stopped {
            return;
        }
        self.state = StreamState::Stopping;

        // Dropping the stream stops device callbacks and closes the chunk
        // channel, which ends the control task.
        self.stream = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }

        self.state = StreamState::Stopped;
        log::info!("capture: stopped");
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
