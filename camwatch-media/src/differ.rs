//! Frame differencing
//!
//! The motion score is the mean absolute per-pixel color delta between two
//! rasters: `Σ(|ΔR| + |ΔG| + |ΔB|) / pixel_count`. Alpha never contributes.

use crate::error::MediaResult;
use crate::raster::RasterBuffer;
use crate::tracks::VideoFrame;
use tracing::trace;

/// Motion score between two equally sized rasters
pub fn motion_score(current: &RasterBuffer, previous: &RasterBuffer) -> f64 {
    debug_assert_eq!(current.resolution(), previous.resolution());
    rgba_motion_score(current.pixels(), previous.pixels())
}

/// Motion score over raw RGBA byte slices
///
/// Only whole pixels present in both slices are compared.
pub fn rgba_motion_score(current: &[u8], previous: &[u8]) -> f64 {
    let pixels = current.len().min(previous.len()) / 4;
    if pixels == 0 {
        return 0.0;
    }

    let total: u64 = current
        .chunks_exact(4)
        .zip(previous.chunks_exact(4))
        .map(|(a, b)| {
            a[0].abs_diff(b[0]) as u64 + a[1].abs_diff(b[1]) as u64 + a[2].abs_diff(b[2]) as u64
        })
        .sum();

    total as f64 / pixels as f64
}

/// Two owned rasters compared tick after tick
///
/// Each observed frame is sampled into the `current` raster, scored against
/// `previous`, then the two are swapped so no pixel data is copied.
#[derive(Debug, Clone)]
pub struct FrameDiffer {
    current: RasterBuffer,
    previous: RasterBuffer,
    primed: bool,
}

impl FrameDiffer {
    /// Create a differ sampling at `width` x `height`
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            current: RasterBuffer::new(width, height),
            previous: RasterBuffer::new(width, height),
            primed: false,
        }
    }

    /// Sample `frame` and score it against the previous observation.
    ///
    /// Returns `None` for the first frame after creation or [`reset`](Self::reset),
    /// since there is nothing to compare against yet. A frame that cannot be
    /// sampled leaves both rasters untouched.
    pub fn observe(&mut self, frame: &VideoFrame) -> MediaResult<Option<f64>> {
        self.current.sample_from(frame)?;

        let score = if self.primed {
            let score = motion_score(&self.current, &self.previous);
            trace!(score, "Frame scored");
            Some(score)
        } else {
            self.primed = true;
            None
        };

        std::mem::swap(&mut self.current, &mut self.previous);
        Ok(score)
    }

    /// Forget the previous frame
    pub fn reset(&mut self) {
        self.primed = false;
    }

    /// Whether a previous frame is held
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// The most recently observed frame, as sampled
    pub fn last_sample(&self) -> Option<&RasterBuffer> {
        self.primed.then_some(&self.previous)
    }
}

impl Default for FrameDiffer {
    fn default() -> Self {
        Self::new(
            crate::raster::DEFAULT_RASTER_WIDTH,
            crate::raster::DEFAULT_RASTER_HEIGHT,
        )
    }
}
