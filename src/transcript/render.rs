//! Pure text-to-spans transform for the view layer.
//!
//! Redacted words arrive embedded in `safe_text` as a sentinel marker
//! followed by the masked word (e.g. `"삐-word"`).  The view renders those
//! spans emphasized (bold) and everything else plain.  This module performs
//! that split with no side effects, so it is safe to run on every render.

use super::reconciler::TranscriptReconciler;

// ---------------------------------------------------------------------------
// Span / TranscriptLine
// ---------------------------------------------------------------------------

/// A run of text with a single emphasis attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    /// `true` for redacted (bleeped) runs.
    pub emphasized: bool,
}

/// One rendered transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub spans: Vec<Span>,
}

impl TranscriptLine {
    /// The line with emphasis stripped.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// render_line
// ---------------------------------------------------------------------------

/// Split `text` into plain and emphasized spans.
///
/// An emphasized span is `marker` plus every following non-whitespace
/// character.  Adjacent plain text is kept as-is, including its whitespace.
///
/// # Example
///
/// ```rust
/// use meeting_stream::transcript::render_line;
///
/// let line = render_line("say 삐-word now", "삐-");
/// let emphasized: Vec<_> = line.spans.iter().filter(|s| s.emphasized).collect();
/// assert_eq!(emphasized.len(), 1);
/// assert_eq!(emphasized[0].text, "삐-word");
/// assert_eq!(line.plain_text(), "say 삐-word now");
/// ```
pub fn render_line(text: &str, marker: &str) -> TranscriptLine {
    let mut spans = Vec::new();

    if marker.is_empty() {
        if !text.is_empty() {
            spans.push(Span {
                text: text.to_string(),
                emphasized: false,
            });
        }
        return TranscriptLine { spans };
    }

    let mut rest = text;
    while let Some(pos) = rest.find(marker) {
        if pos > 0 {
            spans.push(Span {
                text: rest[..pos].to_string(),
                emphasized: false,
            });
        }

        let after_marker = &rest[pos + marker.len()..];
        let word_end = after_marker
            .find(char::is_whitespace)
            .unwrap_or(after_marker.len());

        spans.push(Span {
            text: rest[pos..pos + marker.len() + word_end].to_string(),
            emphasized: true,
        });
        rest = &after_marker[word_end..];
    }

    if !rest.is_empty() {
        spans.push(Span {
            text: rest.to_string(),
            emphasized: false,
        });
    }

    TranscriptLine { spans }
}

// ---------------------------------------------------------------------------
// Reconciler rendering
// ---------------------------------------------------------------------------

impl TranscriptReconciler {
    /// Render the full history into the view model, oldest first.
    ///
    /// Pure read: calling this on every frame is fine.
    pub fn render(&self) -> Vec<TranscriptLine> {
        let marker = &self.settings().bleep_marker;
        self.history()
            .iter()
            .map(|u| render_line(&u.text, marker))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
