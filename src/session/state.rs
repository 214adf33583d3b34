//! Session state machine and the shared view model.
//!
//! [`StreamState`] drives the capture/playback/meeting lifecycle.  The view
//! layer reads [`ViewState`] via [`SharedView`] to render the transcript and
//! the streaming indicator.
//!
//! [`SharedView`] is a type alias for `Arc<Mutex<ViewState>>` — cheap to
//! clone and safe to share across threads.

use std::sync::{Arc, Mutex};

use crate::transcript::TranscriptLine;

// ---------------------------------------------------------------------------
// StreamState
// ---------------------------------------------------------------------------

/// States of a capture, playback or meeting session.
///
/// Transitions are serialized per session — only one Start or Stop is in
/// flight at a time:
///
/// ```text
/// Stopped ──start──▶ Starting ──devices acquired──▶ Running
///    ▲                  │                              │
///    └── Stopping ◀─────┴──failure / cancel────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// No resources held; safe to start.
    #[default]
    Stopped,
    /// Acquisition in flight.
    Starting,
    /// Devices live, audio flowing.
    Running,
    /// Teardown in flight.
    Stopping,
}

impl StreamState {
    /// Returns `true` while the session holds (or is acquiring) resources.
    ///
    /// ```
    /// use meeting_stream::session::StreamState;
    ///
    /// assert!(!StreamState::Stopped.is_active());
    /// assert!(StreamState::Starting.is_active());
    /// assert!(StreamState::Running.is_active());
    /// assert!(StreamState::Stopping.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        !matches!(self, StreamState::Stopped)
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            StreamState::Stopped => "Stopped",
            StreamState::Starting => "Starting",
            StreamState::Running => "Running",
            StreamState::Stopping => "Stopping",
        }
    }
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// Read-only surface exposed to the view layer.
///
/// The orchestrator mutates it; the view reads it each frame.  Nothing in
/// here feeds back into the pipeline.
#[derive(Debug, Default)]
pub struct ViewState {
    /// Rendered transcript, oldest line first.
    pub transcript: Vec<TranscriptLine>,
    /// `true` while microphone audio is streaming to the server.
    pub is_streaming: bool,
    /// Message to display when the session ended abnormally
    /// (e.g. "disconnected").  `None` while healthy.
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// SharedView
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`ViewState`].
///
/// Cheap to clone (`Arc` clone).  Lock for a short critical section; do
/// **not** hold the lock across `.await` points.
pub type SharedView = Arc<Mutex<ViewState>>;

/// Construct a new [`SharedView`] wrapping a default [`ViewState`].
pub fn new_shared_view() -> SharedView {
    Arc::new(Mutex::new(ViewState::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- StreamState ---

    #[test]
    fn stopped_is_not_active() {
        assert!(!StreamState::Stopped.is_active());
    }

    #[test]
    fn running_is_active() {
        assert!(StreamState::Running.is_active());
    }

    #[test]
    fn default_state_is_stopped() {
        assert_eq!(StreamState::default(), StreamState::Stopped);
    }

    #[test]
    fn labels() {
        assert_eq!(StreamState::Stopped.label(), "Stopped");
        assert_eq!(StreamState::Starting.label(), "Starting");
        assert_eq!(StreamState::Running.label(), "Running");
        assert_eq!(StreamState::Stopping.label(), "Stopping");
    }

    // ---- ViewState / SharedView ---

    #[test]
    fn default_view_is_empty_and_not_streaming() {
        let view = ViewState::default();
        assert!(view.transcript.is_empty());
        assert!(!view.is_streaming);
        assert!(view.error_message.is_none());
    }

    #[test]
    fn shared_view_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedView>();
    }

    #[test]
    fn shared_view_can_be_cloned_and_mutated() {
        let view = new_shared_view();
        let view2 = Arc::clone(&view);

        view.lock().unwrap().is_streaming = true;
        assert!(view2.lock().unwrap().is_streaming);
    }
}
