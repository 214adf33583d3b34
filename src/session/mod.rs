//! Session layer — lifecycle management for capture, playback and the
//! meeting as a whole.
//!
//! ```text
//! MeetingSession
//!   ├─ TransportSession   (websocket link, owns writer/reader tasks)
//!   ├─ CaptureSession     (mic stream → wire frames → FrameSink)
//!   ├─ PlaybackSession    (wire frames → jitter buffer → speaker)
//!   └─ event loop task    (TransportEvent → playback / transcript / view)
//! ```
//!
//! The sessions hold cpal streams and are therefore not `Send`; each exposes
//! a `Send` half ([`PlaybackFeed`], the transport's `FrameSink`) for the
//! spawned tasks.  [`SharedView`] is the read-only surface the demo loop or
//! a UI renders from.

pub mod capture;
pub mod meeting;
pub mod playback;
pub mod state;

pub use capture::{encode_chunk, CaptureSession};
pub use meeting::{MeetingSession, SessionError};
pub use playback::{decode_frame, PlaybackFeed, PlaybackSession};
pub use state::{new_shared_view, SharedView, StreamState, ViewState};
