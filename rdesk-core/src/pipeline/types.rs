//! Frame types passed between pipeline stages.
//!
//! ```text
//! RawScreenFrame ──resize──► ResizedFrame ──encode──► EncodedFrame
//!  (native size,              (target height,          (JPEG bytes)
//!   OS pixel layout)           packed RGB)
//! ```

use std::time::Instant;

use image::RgbImage;

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout for raw captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Blue, Green, Red, Alpha (DXGI / most OS grabbers).
    Bgra8,
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8,
    /// 3 bytes per pixel: Red, Green, Blue.
    Rgb8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }

    /// Extract `[r, g, b]` from one pixel of this format.
    #[inline]
    pub fn to_rgb(self, px: &[u8]) -> [u8; 3] {
        match self {
            PixelFormat::Bgra8 => [px[2], px[1], px[0]],
            PixelFormat::Rgba8 | PixelFormat::Rgb8 => [px[0], px[1], px[2]],
        }
    }
}

// ── RawScreenFrame ───────────────────────────────────────────────

/// A full-screen capture as handed over by the OS primitive.
///
/// The `data` buffer holds `height` rows of `stride` bytes each.
/// `stride` may be larger than `width * bytes_per_pixel` because GPU
/// staging textures pad their rows.
#[derive(Debug, Clone)]
pub struct RawScreenFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Row pitch in **bytes** (may exceed `width * bpp`).
    pub stride: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Raw pixel data, `stride * height` bytes.
    pub data: Vec<u8>,
    /// Monotonic capture timestamp.
    pub timestamp: Instant,
}

impl RawScreenFrame {
    /// Build a tightly packed frame (`stride == width * bpp`).
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel() as u32,
            format,
            data,
            timestamp: Instant::now(),
        }
    }

    /// Total byte size the raw bitmap occupies.
    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    /// Whether the buffer is large enough for the declared geometry.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.stride as usize >= self.width as usize * self.format.bytes_per_pixel()
            && self.data.len() >= self.byte_len()
    }

    /// Returns a row slice (including possible padding bytes).
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride as usize;
        let end = start + self.stride as usize;
        &self.data[start..end]
    }
}

// ── ResizedFrame ─────────────────────────────────────────────────

/// A capture scaled to the pipeline's target height, packed as RGB.
#[derive(Debug, Clone)]
pub struct ResizedFrame {
    /// Scaled pixels.
    pub image: RgbImage,
    /// Width of the source capture.
    pub source_width: u32,
    /// Height of the source capture.
    pub source_height: u32,
    /// Capture timestamp of the source frame.
    pub timestamp: Instant,
}

impl ResizedFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

// ── EncodedFrame ─────────────────────────────────────────────────

/// A compressed frame ready to be handed to a caller.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Sequential number assigned by the encode stage.
    pub frame_number: u64,
    /// Capture timestamp of the source frame.
    pub timestamp: Instant,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// JPEG bytes.
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgra_pixels_swap_to_rgb() {
        assert_eq!(PixelFormat::Bgra8.to_rgb(&[1, 2, 3, 255]), [3, 2, 1]);
        assert_eq!(PixelFormat::Rgba8.to_rgb(&[1, 2, 3, 255]), [1, 2, 3]);
        assert_eq!(PixelFormat::Rgb8.to_rgb(&[1, 2, 3]), [1, 2, 3]);
    }

    #[test]
    fn well_formed_checks_geometry() {
        let frame = RawScreenFrame::packed(4, 2, PixelFormat::Bgra8, vec![0; 32]);
        assert!(frame.is_well_formed());
        assert_eq!(frame.row(1).len(), 16);

        let short = RawScreenFrame::packed(4, 2, PixelFormat::Bgra8, vec![0; 31]);
        assert!(!short.is_well_formed());

        let empty = RawScreenFrame::packed(0, 2, PixelFormat::Rgb8, Vec::new());
        assert!(!empty.is_well_formed());
    }
}
