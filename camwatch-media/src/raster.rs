//! Fixed-size RGBA raster used for motion sampling
//!
//! Every frame is sampled down (or up) to the same small raster before
//! comparison, so the cost of a detection tick does not depend on the camera
//! resolution.

use crate::error::{MediaError, MediaResult};
use crate::tracks::{VideoFrame, VideoResolution};

/// Default sampling width
pub const DEFAULT_RASTER_WIDTH: u32 = 320;
/// Default sampling height
pub const DEFAULT_RASTER_HEIGHT: u32 = 240;

/// An owned RGBA pixel buffer of fixed dimensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterBuffer {
    /// Create an opaque black raster
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 255])
    }

    /// Create a raster with every pixel set to `rgba`
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Wrap existing RGBA bytes
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> MediaResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(MediaError::InvalidFrameData {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Raster with the default 320x240 sampling size
    pub fn default_size() -> Self {
        Self::new(DEFAULT_RASTER_WIDTH, DEFAULT_RASTER_HEIGHT)
    }

    /// Raster width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Raster height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raster dimensions
    pub fn resolution(&self) -> VideoResolution {
        VideoResolution::new(self.width, self.height)
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.pixels.len() / 4
    }

    /// RGBA bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable RGBA bytes
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Overwrite this raster with `frame`, scaled by nearest-neighbour sampling
    ///
    /// Writes in place; the raster's size never changes.
    pub fn sample_from(&mut self, frame: &VideoFrame) -> MediaResult<()> {
        frame.validate()?;
        if self.pixels.is_empty() {
            return Ok(());
        }

        let src_w = frame.width as u64;
        let src_h = frame.height as u64;
        let dst_w = self.width as u64;
        let dst_h = self.height as u64;
        let bpp = frame.format.bytes_per_pixel();

        for (y, row) in self
            .pixels
            .chunks_exact_mut(self.width as usize * 4)
            .enumerate()
        {
            let sy = (y as u64 * src_h / dst_h) as usize;
            let src_row = sy * frame.width as usize;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let sx = (x as u64 * src_w / dst_w) as usize;
                let [r, g, b] = frame.format.rgb_at(&frame.data, (src_row + sx) * bpp);
                px[0] = r;
                px[1] = g;
                px[2] = b;
                px[3] = 255;
            }
        }

        Ok(())
    }
}

impl Default for RasterBuffer {
    fn default() -> Self {
        Self::default_size()
    }
}
