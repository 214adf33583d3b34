//! Transcript reconciliation — annotations in, rendered lines out.
//!
//! # Pipeline
//!
//! ```text
//! websocket text message → Annotation::parse → TranscriptReconciler
//!                       → render() → Vec<TranscriptLine> (view model)
//! ```
//!
//! The reconciler absorbs the noisy annotation stream (partials, repeats,
//! refinements) into a bounded rolling log; [`render_line`] turns each line
//! into plain / emphasized spans for display.

pub mod annotation;
pub mod reconciler;
pub mod render;

pub use annotation::{Annotation, AnnotationError};
pub use reconciler::{normalize, Outcome, TranscriptReconciler, Utterance};
pub use render::{render_line, Span, TranscriptLine};
