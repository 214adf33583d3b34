//! Incoming text-message payloads, normalized into a tagged [`Annotation`].
//!
//! The server interleaves JSON text messages with the binary audio stream:
//!
//! ```json
//! { "safe_text": "hello 삐-word world", "raw_text": "hello bad world", ... }
//! ```
//!
//! `safe_text` (the redacted transcript) is preferred; `raw_text` is the
//! fallback.  Any other fields are ignored.  A payload with neither field,
//! or with only whitespace, means "nothing to display" and parses to
//! [`Annotation::Empty`] — that is a valid message, not an error.  Only
//! malformed JSON is an error, which the transport drops with a log line.

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// AnnotationError
// ---------------------------------------------------------------------------

/// Parse failure on an incoming text message.
///
/// Recovered locally by dropping the message; never surfaced to the user.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("malformed annotation payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// RawAnnotation (wire shape)
// ---------------------------------------------------------------------------

/// The subset of the server's JSON payload we care about.
///
/// Unknown fields are ignored by serde's default behaviour.
#[derive(Debug, Deserialize)]
struct RawAnnotation {
    #[serde(default)]
    safe_text: Option<String>,
    #[serde(default)]
    raw_text: Option<String>,
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// A normalized annotation: either displayable text or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// No displayable text (both fields absent or blank).
    Empty,
    /// Displayable text, redacted form preferred over raw.
    Text(String),
}

impl Annotation {
    /// Parse a JSON text message into an [`Annotation`].
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::Malformed`] when `payload` is not valid
    /// JSON for the expected object shape.
    ///
    /// # Example
    ///
    /// ```rust
    /// use meeting_stream::transcript::Annotation;
    ///
    /// let a = Annotation::parse(r#"{"safe_text": "hello"}"#).unwrap();
    /// assert_eq!(a, Annotation::Text("hello".into()));
    ///
    /// let empty = Annotation::parse(r#"{"speaker": 2}"#).unwrap();
    /// assert_eq!(empty, Annotation::Empty);
    /// ```
    pub fn parse(payload: &str) -> Result<Self, AnnotationError> {
        let raw: RawAnnotation = serde_json::from_str(payload)?;

        let text = raw
            .safe_text
            .filter(|s| !s.trim().is_empty())
            .or(raw.raw_text.filter(|s| !s.trim().is_empty()));

        Ok(match text {
            Some(t) => Annotation::Text(t),
            None => Annotation::Empty,
        })
    }

    /// The displayable text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Annotation::Empty => None,
            Annotation::Text(t) => Some(t),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Field preference --------------------------------------------------

    #[test]
    fn safe_text_preferred_over_raw() {
        let a = Annotation::parse(r#"{"safe_text": "redacted", "raw_text": "raw"}"#).unwrap();
        assert_eq!(a, Annotation::Text("redacted".into()));
    }

    #[test]
    fn falls_back_to_raw_text() {
        let a = Annotation::parse(r#"{"raw_text": "raw only"}"#).unwrap();
        assert_eq!(a, Annotation::Text("raw only".into()));
    }

    #[test]
    fn blank_safe_text_falls_back_to_raw() {
        let a = Annotation::parse(r#"{"safe_text": "   ", "raw_text": "raw"}"#).unwrap();
        assert_eq!(a, Annotation::Text("raw".into()));
    }

    // ---- Empty -------------------------------------------------------------

    #[test]
    fn both_absent_is_empty() {
        assert_eq!(Annotation::parse("{}").unwrap(), Annotation::Empty);
    }

    #[test]
    fn whitespace_only_is_empty() {
        let a = Annotation::parse(r#"{"safe_text": " \t ", "raw_text": "\n"}"#).unwrap();
        assert_eq!(a, Annotation::Empty);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let a = Annotation::parse(r#"{"speaker": 3, "confidence": 0.9}"#).unwrap();
        assert_eq!(a, Annotation::Empty);
    }

    // ---- Malformed ---------------------------------------------------------

    #[test]
    fn invalid_json_is_malformed() {
        assert!(Annotation::parse("not json").is_err());
    }

    #[test]
    fn json_array_is_malformed() {
        assert!(Annotation::parse(r#"["a", "b"]"#).is_err());
    }

    // ---- Accessor ----------------------------------------------------------

    #[test]
    fn text_accessor() {
        assert_eq!(Annotation::Text("x".into()).text(), Some("x"));
        assert_eq!(Annotation::Empty.text(), None);
    }
}
