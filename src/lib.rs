//! Live meeting audio streaming — microphone to server, server to speaker,
//! with a reconciled rolling transcript.
//!
//! # Pipeline
//!
//! ```text
//!                    ┌───────────────────────────────────────────┐
//! mic ─cpal─▶ mono ─▶│ downsample → 20 ms framer → PCM16 LE      │─▶ websocket
//!                    └───────────────────────────────────────────┘
//!
//!              ┌──────────────────────────────────────────────┐
//! websocket ─▶ │ Binary: PCM16 LE → resample → jitter buffer  │─cpal─▶ speaker
//!              │ Text:   JSON annotation → reconciler → view  │
//!              └──────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`audio`] — device I/O (cpal), sample-format conversion, framing and
//!   the playback jitter buffer.
//! - [`transport`] — the websocket link: outgoing frame queue, incoming
//!   event stream, lifecycle state machine.
//! - [`transcript`] — annotation parsing and the bounded, deduplicating
//!   transcript reconciler with emphasis rendering.
//! - [`session`] — lifecycle orchestration tying the above together.
//! - [`config`] — on-disk TOML settings and platform paths.

pub mod audio;
pub mod config;
pub mod session;
pub mod transcript;
pub mod transport;
