//! Meeting orchestrator — drives transport, playback and capture as a unit.
//!
//! [`MeetingSession`] owns the three sub-sessions and responds to
//! [`TransportEvent`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Start sequence
//!
//! ```text
//! start()
//!   ├─ TransportSession::start (open-wait with timeout)
//!   ├─ PlaybackSession::start  (output device + jitter buffer)
//!   ├─ CaptureSession::start   (input device + frame pipeline)
//!   └─ spawn event loop:
//!         Binary     → PlaybackFeed::on_binary_frame
//!         Annotation → TranscriptReconciler → SharedView.transcript
//!         Closed/Err → SharedView "disconnected" + wake the owner's
//!                      run_until_disconnected, which stops capture and
//!                      playback in order
//! ```
//!
//! Any failure rolls back everything already started — a failed start never
//! leaves a partial session.  A `stop()` racing an in-flight `start()` is
//! handled by the `wanted` flag, checked after every suspension point, so
//! the pair always converges to fully released.  Teardown runs in reverse
//! acquisition order with each release step independently guarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::audio::{CaptureError, PlaybackError};
use crate::config::AppConfig;
use crate::transcript::{Outcome, TranscriptReconciler};
use crate::transport::{TransportError, TransportEvent, TransportSession};

use super::capture::CaptureSession;
use super::playback::{PlaybackFeed, PlaybackSession};
use super::state::{new_shared_view, SharedView, StreamState};

/// Transport events buffered ahead of the orchestrator loop.
const EVENT_QUEUE: usize = 64;

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors that fail a session start.
///
/// All failures are scoped to session lifecycle — none of them should
/// terminate the hosting process.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The capture device is unavailable (no device / permission denied).
    #[error("capture unavailable: {0}")]
    Capture(#[from] CaptureError),

    /// The playback device is unavailable.
    #[error("playback unavailable: {0}")]
    Playback(#[from] PlaybackError),

    /// The transport could not be established.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// A start or stop is already in flight on this session.
    #[error("session is busy — a start or stop is already in flight")]
    Busy,

    /// A concurrent stop cancelled the start; everything was released.
    #[error("start was cancelled")]
    Cancelled,

    /// Internal wiring failure (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// MeetingSession
// ---------------------------------------------------------------------------

/// Top-level session: microphone → server → speaker + transcript.
///
/// Not `Send` (the sub-sessions hold cpal streams); create it on the thread
/// that runs the demo loop and drive the async methods with the runtime's
/// `block_on` or from a current-thread context.
///
/// # Example
///
/// ```rust,no_run
/// use meeting_stream::config::AppConfig;
/// use meeting_stream::session::MeetingSession;
///
/// # async fn example() -> Result<(), meeting_stream::session::SessionError> {
/// let mut meeting = MeetingSession::new(AppConfig::default());
/// meeting.start().await?;
///
/// // view() is the read-only surface for the UI
/// let streaming = meeting.view().lock().unwrap().is_streaming;
/// assert!(streaming);
///
/// meeting.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct MeetingSession {
    config: AppConfig,
    state: StreamState,
    view: SharedView,
    transport: TransportSession,
    playback: PlaybackSession,
    capture: CaptureSession,
    /// Cleared by `stop()`; `start()` checks it after every await so a
    /// cancelled start converges to fully released.
    wanted: Arc<AtomicBool>,
    /// Signalled when the transport closes or errors mid-session.
    disconnected: Arc<Notify>,
    events: Option<JoinHandle<()>>,
}

impl MeetingSession {
    /// Create a stopped session from `config`.
    pub fn new(config: AppConfig) -> Self {
        let transport = TransportSession::new(config.transport.open_timeout_secs);
        Self {
            config,
            state: StreamState::Stopped,
            view: new_shared_view(),
            transport,
            playback: PlaybackSession::new(),
            capture: CaptureSession::new(),
            wanted: Arc::new(AtomicBool::new(false)),
            disconnected: Arc::new(Notify::new()),
            events: None,
        }
    }

    /// The read-only view model (transcript + streaming indicator).
    pub fn view(&self) -> SharedView {
        Arc::clone(&self.view)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Wait for the transport to close or error mid-session, then stop
    /// capture and playback in order.
    ///
    /// The event loop cannot release the devices itself (the sub-sessions
    /// hold cpal streams and stay on the owner's thread), so the owner
    /// drives this future; it resolves once the session is fully stopped.
    /// Capture and playback are released before the first suspension point
    /// of the teardown, so cancelling the future mid-stop cannot leak a
    /// device handle — a follow-up [`stop`](Self::stop) finishes the rest.
    pub async fn run_until_disconnected(&mut self) {
        self.disconnected.notified().await;
        log::info!("meeting: link lost, releasing sessions");
        self.stop().await;
    }

    // -----------------------------------------------------------------------
    // start
    // -----------------------------------------------------------------------

    /// Connect and begin streaming: transport, then playback, then capture.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Busy`] — the session is not stopped.
    /// - [`SessionError::Transport`] / [`SessionError::Playback`] /
    ///   [`SessionError::Capture`] — the corresponding acquisition failed;
    ///   everything started before it has been rolled back.
    /// - [`SessionError::Cancelled`] — a concurrent stop won the race.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.state != StreamState::Stopped {
            return Err(SessionError::Busy);
        }
        self.state = StreamState::Starting;
        self.wanted.store(true, Ordering::SeqCst);
        {
            let mut view = self.view.lock().unwrap();
            view.error_message = None;
        }

        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(EVENT_QUEUE);

        // ── 1. Transport (open-wait with timeout) ────────────────────────
        let url = self.config.transport.url.clone();
        if let Err(e) = self.transport.start(&url, event_tx).await {
            self.release_all().await;
            return Err(e.into());
        }
        if !self.wanted.load(Ordering::SeqCst) {
            self.release_all().await;
            return Err(SessionError::Cancelled);
        }

        // ── 2. Playback (output device + jitter buffer) ──────────────────
        if let Err(e) = self.playback.start(&self.config.audio) {
            self.release_all().await;
            return Err(e);
        }

        // ── 3. Capture (input device → wire frames) ──────────────────────
        let sink = match self.transport.sender() {
            Some(handle) => Arc::new(handle),
            None => {
                self.release_all().await;
                return Err(SessionError::Internal("transport has no sender".into()));
            }
        };
        if let Err(e) = self.capture.start(&self.config.audio, sink) {
            self.release_all().await;
            return Err(e);
        }
        if !self.wanted.load(Ordering::SeqCst) {
            self.release_all().await;
            return Err(SessionError::Cancelled);
        }

        // ── 4. Event loop ────────────────────────────────────────────────
        let feed = match self.playback.feed() {
            Some(feed) => feed,
            None => {
                self.release_all().await;
                return Err(SessionError::Internal("playback has no feed".into()));
            }
        };
        let reconciler = TranscriptReconciler::new(self.config.transcript.clone());
        self.events = Some(tokio::spawn(run_events(
            event_rx,
            feed,
            reconciler,
            Arc::clone(&self.view),
            Arc::clone(&self.disconnected),
        )));

        self.view.lock().unwrap().is_streaming = true;
        self.state = StreamState::Running;
        log::info!("meeting: session running");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // stop
    // -----------------------------------------------------------------------

    /// Stop streaming and release everything.
    ///
    /// Safe to call from any state; repeated calls are no-ops.  Also clears
    /// the `wanted` flag so an in-flight start (if its future is still being
    /// polled elsewhere) cancels at its next suspension point.
    pub async fn stop(&mut self) {
        self.wanted.store(false, Ordering::SeqCst);
        if self.state == StreamState::Stopped {
            return;
        }
        self.state = StreamState::Stopping;
        self.release_all().await;
        log::info!("meeting: session stopped");
    }

    /// Release in reverse acquisition order.  Each step is best-effort and
    /// independently guarded so one failure cannot block the rest.
    async fn release_all(&mut self) {
        self.capture.stop();
        self.playback.stop();
        self.transport.stop().await;
        if let Some(events) = self.events.take() {
            events.abort();
        }
        self.view.lock().unwrap().is_streaming = false;
        self.state = StreamState::Stopped;
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Route transport events until the channel closes or the link drops.
///
/// Runs as a spawned task; everything it touches is `Send` (the playback
/// feed, the reconciler, the shared view).
async fn run_events(
    mut event_rx: mpsc::Receiver<TransportEvent>,
    feed: PlaybackFeed,
    mut reconciler: TranscriptReconciler,
    view: SharedView,
    disconnected: Arc<Notify>,
) {
    let started = Instant::now();

    while let Some(event) = event_rx.recv().await {
        match event {
            TransportEvent::Binary(bytes) => {
                feed.on_binary_frame(&bytes);
            }
            TransportEvent::Annotation(annotation) => {
                let now_ms = started.elapsed().as_millis() as u64;
                if reconciler.on_annotation(&annotation, now_ms) != Outcome::Discarded {
                    view.lock().unwrap().transcript = reconciler.render();
                }
            }
            TransportEvent::Closed => {
                log::info!("meeting: server closed the connection");
                mark_disconnected(&view, "disconnected");
                disconnected.notify_one();
                break;
            }
            TransportEvent::Error(msg) => {
                log::warn!("meeting: transport error: {msg}");
                mark_disconnected(&view, "disconnected");
                disconnected.notify_one();
                break;
            }
        }
    }

    log::debug!("meeting: event loop finished");
}

fn mark_disconnected(view: &SharedView, message: &str) {
    let mut view = view.lock().unwrap();
    view.is_streaming = false;
    view.error_message = Some(message.to_string());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{pcm, JitterBuffer};
    use crate::config::TranscriptSettings;
    use crate::transcript::Annotation;
    use std::sync::Mutex;

    fn test_feed(jitter: &Arc<Mutex<JitterBuffer>>) -> PlaybackFeed {
        PlaybackFeed::for_tests(Arc::clone(jitter), 16_000, 16_000)
    }

    // ---- run_events --------------------------------------------------------

    #[tokio::test]
    async fn binary_events_reach_the_jitter_buffer() {
        let (tx, rx) = mpsc::channel(8);
        let jitter = Arc::new(Mutex::new(JitterBuffer::new(0)));
        let view = new_shared_view();
        let disconnected = Arc::new(Notify::new());

        let task = tokio::spawn(run_events(
            rx,
            test_feed(&jitter),
            TranscriptReconciler::new(TranscriptSettings::default()),
            Arc::clone(&view),
            disconnected,
        ));

        let payload = pcm::to_le_bytes(&vec![500i16; 320]);
        tx.send(TransportEvent::Binary(payload)).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(jitter.lock().unwrap().queued_samples(), 320);
    }

    #[tokio::test]
    async fn annotations_update_the_view_transcript() {
        let (tx, rx) = mpsc::channel(8);
        let jitter = Arc::new(Mutex::new(JitterBuffer::new(0)));
        let view = new_shared_view();
        let disconnected = Arc::new(Notify::new());

        let task = tokio::spawn(run_events(
            rx,
            test_feed(&jitter),
            TranscriptReconciler::new(TranscriptSettings::default()),
            Arc::clone(&view),
            disconnected,
        ));

        tx.send(TransportEvent::Annotation(Annotation::Text("hello world".into())))
            .await
            .unwrap();
        tx.send(TransportEvent::Annotation(Annotation::Empty))
            .await
            .unwrap();
        drop(tx);
        task.await.unwrap();

        let view = view.lock().unwrap();
        assert_eq!(view.transcript.len(), 1);
        assert_eq!(view.transcript[0].plain_text(), "hello world");
    }

    #[tokio::test]
    async fn closed_event_marks_view_disconnected_and_notifies() {
        let (tx, rx) = mpsc::channel(8);
        let jitter = Arc::new(Mutex::new(JitterBuffer::new(0)));
        let view = new_shared_view();
        view.lock().unwrap().is_streaming = true;
        let disconnected = Arc::new(Notify::new());

        let task = tokio::spawn(run_events(
            rx,
            test_feed(&jitter),
            TranscriptReconciler::new(TranscriptSettings::default()),
            Arc::clone(&view),
            Arc::clone(&disconnected),
        ));

        tx.send(TransportEvent::Closed).await.unwrap();

        // The notify permit is stored, so awaiting after the event is fine.
        task.await.unwrap();
        disconnected.notified().await;

        let view = view.lock().unwrap();
        assert!(!view.is_streaming);
        assert_eq!(view.error_message.as_deref(), Some("disconnected"));
    }

    #[tokio::test]
    async fn error_event_behaves_like_close() {
        let (tx, rx) = mpsc::channel(8);
        let jitter = Arc::new(Mutex::new(JitterBuffer::new(0)));
        let view = new_shared_view();
        let disconnected = Arc::new(Notify::new());

        let task = tokio::spawn(run_events(
            rx,
            test_feed(&jitter),
            TranscriptReconciler::new(TranscriptSettings::default()),
            Arc::clone(&view),
            Arc::clone(&disconnected),
        ));

        tx.send(TransportEvent::Error("reset by peer".into()))
            .await
            .unwrap();
        task.await.unwrap();
        disconnected.notified().await;

        assert_eq!(
            view.lock().unwrap().error_message.as_deref(),
            Some("disconnected")
        );
    }

    // ---- MeetingSession lifecycle ------------------------------------------

    #[tokio::test]
    async fn failed_transport_start_leaves_session_stopped() {
        let mut config = AppConfig::default();
        config.transport.url = "ws://127.0.0.1:9/ws".into(); // refused
        config.transport.open_timeout_secs = 1;

        let mut meeting = MeetingSession::new(config);
        let result = meeting.start().await;

        assert!(matches!(result, Err(SessionError::Transport(_))));
        assert_eq!(meeting.state(), StreamState::Stopped);
        assert!(!meeting.view().lock().unwrap().is_streaming);
    }

    #[tokio::test]
    async fn transport_error_releases_the_whole_session() {
        // Wire the event loop by hand so no devices are involved: a running
        // session whose link dies must converge to Stopped on its own driven
        // path, not rely on the owner calling stop() separately.
        let mut meeting = MeetingSession::new(AppConfig::default());
        let (tx, rx) = mpsc::channel(8);
        let jitter = Arc::new(Mutex::new(JitterBuffer::new(0)));

        meeting.state = StreamState::Running;
        meeting.view.lock().unwrap().is_streaming = true;
        meeting.events = Some(tokio::spawn(run_events(
            rx,
            test_feed(&jitter),
            TranscriptReconciler::new(TranscriptSettings::default()),
            Arc::clone(&meeting.view),
            Arc::clone(&meeting.disconnected),
        )));

        tx.send(TransportEvent::Error("reset by peer".into()))
            .await
            .unwrap();
        meeting.run_until_disconnected().await;

        assert_eq!(meeting.state(), StreamState::Stopped);
        assert_eq!(meeting.capture.state(), StreamState::Stopped);
        assert_eq!(meeting.playback.state(), StreamState::Stopped);
        assert!(meeting.events.is_none());
        assert!(!meeting.view().lock().unwrap().is_streaming);
    }

    #[tokio::test]
    async fn stop_when_stopped_is_a_noop() {
        let mut meeting = MeetingSession::new(AppConfig::default());
        meeting.stop().await;
        meeting.stop().await;
        assert_eq!(meeting.state(), StreamState::Stopped);
    }
}
