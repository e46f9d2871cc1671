//! Captured frames.
//!
//! A `Frame` is one greyscale image pulled from a capture source. Pixel bytes
//! stay inside the crate: detectors read them through `luma()`, nothing else
//! can clone or serialize them, and the buffer is handed back to the
//! allocator as soon as the cycle that pulled it ends.

use std::time::Instant;

/// One captured greyscale frame (8 bits per pixel, row-major).
pub struct Frame {
    /// Private pixel data. Detectors access it via `luma()`.
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Per-session frame counter, starting at 1.
    pub sequence: u64,

    /// Monotonic capture instant.
    captured_at: Instant,
}

// Explicitly NOT implementing Clone or any byte-exposing trait.

impl Frame {
    /// Create a frame. Called only by capture sources.
    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Greyscale pixels for detectors.
    pub(crate) fn luma(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Returns true when the buffer matches the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.byte_len() == self.width as usize * self.height as usize
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print pixel content.
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .finish()
    }
}
