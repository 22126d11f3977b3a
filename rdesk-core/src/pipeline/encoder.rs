//! JPEG frame encoder.
//!
//! Turns a [`ResizedFrame`] into the compressed bytes handed to the
//! controller. Encoding is pure CPU work; the pipeline runs it on the
//! blocking pool.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;

use crate::error::RemoteError;
use crate::pipeline::types::{EncodedFrame, ResizedFrame};

/// Default JPEG quality (1..=100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Stateless JPEG encoder with a fixed quality.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
}

impl FrameEncoder {
    /// Create an encoder; `quality` is clamped to `1..=100`.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Current quality setting.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Compress `frame`, tagging the result with `frame_number`.
    pub fn encode(
        &self,
        frame: &ResizedFrame,
        frame_number: u64,
    ) -> Result<EncodedFrame, RemoteError> {
        let mut buf = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buf, self.quality);
        frame.image.write_with_encoder(encoder)?;

        Ok(EncodedFrame {
            frame_number,
            timestamp: frame.timestamp,
            width: frame.width(),
            height: frame.height(),
            data: buf.into_inner(),
        })
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

// ── Tests ────────────────────────────────────────────────────────
