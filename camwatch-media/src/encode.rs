//! Still image encoding for detected frames

use crate::error::{MediaError, MediaResult};
use crate::tracks::{VideoFrame, VideoPixelFormat};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use serde::{Deserialize, Serialize};

/// Default JPEG quality for snapshots
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// A compressed still image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// Encoded bytes
    pub data: Bytes,
    /// MIME type of `data`
    pub mime_type: String,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl EncodedImage {
    /// Wrap already encoded JPEG bytes
    pub fn jpeg(data: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            mime_type: "image/jpeg".to_string(),
            width,
            height,
        }
    }

    /// Encoded bytes as standard base64
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// `data:` URL suitable for embedding in a page
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Encoded size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no bytes were produced
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// JPEG encoder for triggering frames
#[derive(Debug, Clone, Copy)]
pub struct StillEncoder {
    quality: u8,
}

impl StillEncoder {
    /// Create an encoder; `quality` must be in 1..=100
    pub fn new(quality: u8) -> MediaResult<Self> {
        if !(1..=100).contains(&quality) {
            return Err(MediaError::InvalidConfiguration {
                message: format!("JPEG quality {} outside 1..=100", quality),
            });
        }
        Ok(Self { quality })
    }

    /// Configured quality
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode a frame at its native resolution
    pub fn encode(&self, frame: &VideoFrame) -> MediaResult<EncodedImage> {
        frame.validate()?;

        let rgb = to_rgb(frame);
        let mut out = Vec::with_capacity(rgb.len() / 8);
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode(&rgb, frame.width, frame.height, ColorType::Rgb8)
            .map_err(|e| MediaError::EncodingFailed {
                codec: "jpeg".to_string(),
                reason: e.to_string(),
            })?;

        Ok(EncodedImage::jpeg(out, frame.width, frame.height))
    }
}

impl Default for StillEncoder {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

fn to_rgb(frame: &VideoFrame) -> Vec<u8> {
    let len = frame.expected_len();
    match frame.format {
        VideoPixelFormat::Rgb24 => frame.data[..len].to_vec(),
        format => frame.data[..len]
            .chunks_exact(format.bytes_per_pixel())
            .flat_map(|px| format.rgb_at(px, 0))
            .collect(),
    }
}
