//! Websocket transport — the control boundary between the audio pipeline
//! and the network.
//!
//! ```text
//! CaptureSession ──FrameSink::send_frame──▶ writer task ──▶ socket
//! socket ──▶ reader task ──TransportEvent──▶ orchestrator
//!                 ├─ Binary     → PlaybackSession
//!                 ├─ Annotation → TranscriptReconciler
//!                 └─ Closed / Error → ordered session stop
//! ```

pub mod session;

pub use session::{
    FrameSink, LinkState, TransportError, TransportEvent, TransportHandle, TransportSession,
};
