//! Jitter buffer feeding the playback render callback.
//!
//! Decoded sample chunks arrive from the control thread at network pace;
//! the hardware output callback drains them at a steady rate.  The buffer
//! absorbs arrival-time irregularity by withholding playback until
//! `start_threshold` samples are queued (the prebuffer, default 1.5 s worth),
//! then draining front-to-back.
//!
//! Real-time constraints on [`render`](JitterBuffer::render):
//!
//! * never blocks — the only shared state is this struct behind a mutex whose
//!   critical sections are short and bounded (append on one side, copy on the
//!   other);
//! * never allocates — chunks are consumed in place via a front offset
//!   instead of re-slicing;
//! * never reorders or duplicates samples — an empty queue mid-output
//!   (underrun) is filled with silence, not with repeated audio.
//!
//! # Example
//!
//! ```rust
//! use meeting_stream::audio::JitterBuffer;
//!
//! let mut jb = JitterBuffer::new(4);
//! jb.push(vec![0.1, 0.2, 0.3, 0.4]);
//!
//! let mut out = [0.0f32; 2];
//! jb.render(&mut out); // threshold reached → real audio
//! assert_eq!(out, [0.1, 0.2]);
//! ```

use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// JitterBuffer
// ---------------------------------------------------------------------------

/// FIFO of owned sample chunks with prebuffer and silence-fill semantics.
pub struct JitterBuffer {
    /// Queued chunks, consumed front-to-back.
    queue: VecDeque<Vec<f32>>,
    /// Read offset into the front chunk (partial consumption without
    /// re-allocating the chunk).
    front_offset: usize,
    /// Total samples currently queued.  Always equals the sum of remaining
    /// chunk lengths.
    queued: usize,
    /// Minimum queued samples required before playback begins.
    start_threshold: usize,
    /// Set once the threshold has been reached; stays set until
    /// [`clear`](Self::clear).
    started: bool,
}

impl JitterBuffer {
    /// Create a buffer that starts producing audio once `start_threshold`
    /// samples are queued.
    ///
    /// A threshold of `0` starts immediately.
    pub fn new(start_threshold: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            front_offset: 0,
            queued: 0,
            start_threshold,
            started: false,
        }
    }

    /// Append a decoded chunk.  Empty chunks are ignored.
    pub fn push(&mut self, chunk: Vec<f32>) {
        if chunk.is_empty() {
            return;
        }
        self.queued += chunk.len();
        self.queue.push_back(chunk);
    }

    /// Fill `out` with the next samples, or silence.
    ///
    /// Before the start threshold is reached the whole buffer is zeroed.
    /// Once started, front chunks are copied in order; when the queue runs
    /// dry mid-output the remainder is zeroed (underrun).
    pub fn render(&mut self, out: &mut [f32]) {
        if !self.started {
            if self.queued >= self.start_threshold {
                // The call that reaches the threshold already emits audio;
                // there is no extra silent quantum after the flip.
                self.started = true;
            } else {
                out.fill(0.0);
                return;
            }
        }

        let mut i = 0;
        while i < out.len() {
            let Some(head) = self.queue.front() else {
                // Underrun: silence instead of blocking or repeating.
                out[i..].fill(0.0);
                return;
            };

            let remaining = head.len() - self.front_offset;
            let copy_len = remaining.min(out.len() - i);
            out[i..i + copy_len]
                .copy_from_slice(&head[self.front_offset..self.front_offset + copy_len]);

            i += copy_len;
            self.queued -= copy_len;
            if copy_len == remaining {
                self.queue.pop_front();
                self.front_offset = 0;
            } else {
                self.front_offset += copy_len;
            }
        }
    }

    /// Total samples currently queued.
    pub fn queued_samples(&self) -> usize {
        self.queued
    }

    /// `true` once the prebuffer threshold has been reached.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Start threshold in samples.
    pub fn start_threshold(&self) -> usize {
        self.start_threshold
    }

    /// Discard all queued audio and re-arm the prebuffer.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.front_offset = 0;
        self.queued = 0;
        self.started = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
