//! Fixed-size framing of variable-length sample blocks.
//!
//! Capture devices deliver buffers of whatever length the hardware prefers,
//! but the wire protocol transmits frames of exactly [`Framer::frame_size`]
//! samples (320 at 16 kHz / 20 ms).  [`Framer`] accumulates incoming blocks,
//! emits every complete frame, and carries the remainder into the next call.
//!
//! Invariant: no sample is ever dropped or duplicated — concatenating all
//! emitted frames plus the final carry reproduces the input stream exactly,
//! in order.
//!
//! # Example
//!
//! ```rust
//! use meeting_stream::audio::Framer;
//!
//! let mut framer = Framer::new(4);
//! let frames = framer.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
//! assert_eq!(frames, vec![vec![1.0, 2.0, 3.0, 4.0]]);
//! assert_eq!(framer.carry(), &[5.0]);
//! ```

// ---------------------------------------------------------------------------
// Framer
// ---------------------------------------------------------------------------

/// Accumulates sample blocks and slices them into fixed-size frames.
///
/// Partial remainders are carried across calls, never emitted short.
pub struct Framer {
    frame_size: usize,
    carry: Vec<f32>,
}

impl Framer {
    /// Create a framer that emits frames of exactly `frame_size` samples.
    ///
    /// # Panics
    ///
    /// Panics if `frame_size == 0`.
    pub fn new(frame_size: usize) -> Self {
        assert!(frame_size > 0, "Framer frame_size must be > 0");
        Self {
            frame_size,
            carry: Vec::with_capacity(frame_size),
        }
    }

    /// Append `samples` and return every complete frame now available.
    ///
    /// Each returned frame has exactly [`frame_size`](Self::frame_size)
    /// samples; the tail shorter than one frame becomes the new carry.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.carry.extend_from_slice(samples);

        let n = self.frame_size;
        let complete = self.carry.len() / n;
        if complete == 0 {
            return Vec::new();
        }

        let mut frames = Vec::with_capacity(complete);
        for i in 0..complete {
            frames.push(self.carry[i * n..(i + 1) * n].to_vec());
        }

        // Keep only the tail that did not fill a frame.
        self.carry.drain(..complete * n);
        frames
    }

    /// Samples accumulated but not yet emitted (always `< frame_size`).
    pub fn carry(&self) -> &[f32] {
        &self.carry
    }

    /// Discard the carry.  Used on session stop so a restart never begins
    /// with stale audio.
    pub fn reset(&mut self) {
        self.carry.clear();
    }

    /// Frame length in samples.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Basic framing -----------------------------------------------------

    #[test]
    fn short_block_emits_nothing() {
        let mut framer = Framer::new(4);
        let frames = framer.push(&[1.0, 2.0, 3.0]);
        assert!(frames.is_empty());
        assert_eq!(framer.carry(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn exact_block_emits_one_frame() {
        let mut framer = Framer::new(4);
        let frames = framer.push(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(frames, vec![vec![1.0, 2.0, 3.0, 4.0]]);
        assert!(framer.carry().is_empty());
    }

    #[test]
    fn long_block_emits_multiple_frames_and_carries_tail() {
        let mut framer = Framer::new(2);
        let frames = framer.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(frames, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(framer.carry(), &[5.0]);
    }

    #[test]
    fn carry_completes_on_next_push() {
        let mut framer = Framer::new(4);
        assert!(framer.push(&[1.0, 2.0, 3.0]).is_empty());
        let frames = framer.push(&[4.0, 5.0]);
        assert_eq!(frames, vec![vec![1.0, 2.0, 3.0, 4.0]]);
        assert_eq!(framer.carry(), &[5.0]);
    }

    #[test]
    fn empty_push_is_a_noop() {
        let mut framer = Framer::new(4);
        framer.push(&[1.0]);
        assert!(framer.push(&[]).is_empty());
        assert_eq!(framer.carry(), &[1.0]);
    }

    // ---- Conservation ------------------------------------------------------

    /// Concatenating emitted frames plus the final carry must equal the
    /// concatenation of all inputs, for arbitrary split points.
    #[test]
    fn conservation_across_arbitrary_splits() {
        let input: Vec<f32> = (0..103).map(|i| i as f32).collect();
        // Uneven split sizes, including empty and larger-than-frame blocks.
        let splits = [0usize, 1, 7, 3, 40, 2, 50];

        let mut framer = Framer::new(8);
        let mut emitted: Vec<f32> = Vec::new();
        let mut offset = 0;
        for &len in &splits {
            let end = (offset + len).min(input.len());
            for frame in framer.push(&input[offset..end]) {
                assert_eq!(frame.len(), 8, "frame must be exactly frame_size");
                emitted.extend_from_slice(&frame);
            }
            offset = end;
        }

        emitted.extend_from_slice(framer.carry());
        assert_eq!(emitted, input[..offset].to_vec());
    }

    #[test]
    fn all_emitted_frames_are_exact_size() {
        let mut framer = Framer::new(320);
        let block = vec![0.0_f32; 1000];
        for frame in framer.push(&block) {
            assert_eq!(frame.len(), 320);
        }
        assert_eq!(framer.carry().len(), 1000 % 320);
    }

    // ---- reset -------------------------------------------------------------

    #[test]
    fn reset_discards_carry() {
        let mut framer = Framer::new(4);
        framer.push(&[1.0, 2.0]);
        framer.reset();
        assert!(framer.carry().is_empty());

        // Usable again after reset.
        let frames = framer.push(&[9.0, 8.0, 7.0, 6.0]);
        assert_eq!(frames, vec![vec![9.0, 8.0, 7.0, 6.0]]);
    }

    // ---- Panic guard -------------------------------------------------------

    #[test]
    #[should_panic(expected = "Framer frame_size must be > 0")]
    fn zero_frame_size_panics() {
        let _ = Framer::new(0);
    }
}
