//! Scale captures to a fixed height.
//!
//! Only the height is configured; the width follows the source aspect
//! ratio, `round(target_height * width / height)`. Scaling uses a
//! Catmull-Rom kernel, which keeps on-screen text legible at a modest
//! cost over bilinear.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::RemoteError;
use crate::pipeline::types::{RawScreenFrame, ResizedFrame};

/// Default output height in pixels.
pub const DEFAULT_TARGET_HEIGHT: u32 = 720;

const FILTER: FilterType = FilterType::CatmullRom;

/// Output width for a `src_width × src_height` source scaled to
/// `target_height`. Never below one pixel.
pub fn scaled_width(src_width: u32, src_height: u32, target_height: u32) -> u32 {
    let width = (f64::from(target_height) * f64::from(src_width) / f64::from(src_height)).round();
    (width as u32).max(1)
}

/// Convert a raw capture to packed RGB, dropping row padding and alpha.
pub fn to_rgb(frame: &RawScreenFrame) -> Result<RgbImage, RemoteError> {
    if !frame.is_well_formed() {
        return Err(RemoteError::Encoding(format!(
            "malformed frame: {}x{} stride {} with {} bytes",
            frame.width,
            frame.height,
            frame.stride,
            frame.data.len()
        )));
    }

    let bpp = frame.format.bytes_per_pixel();
    let row_len = frame.width as usize * bpp;
    let mut rgb = Vec::with_capacity(frame.width as usize * frame.height as usize * 3);

    for y in 0..frame.height {
        for px in frame.row(y)[..row_len].chunks_exact(bpp) {
            rgb.extend_from_slice(&frame.format.to_rgb(px));
        }
    }

    RgbImage::from_raw(frame.width, frame.height, rgb)
        .ok_or_else(|| RemoteError::Encoding("rgb buffer size mismatch".into()))
}

/// Scale `frame` to `target_height`, preserving its aspect ratio.
pub fn scale_to_height(
    frame: &RawScreenFrame,
    target_height: u32,
) -> Result<ResizedFrame, RemoteError> {
    let target_height = target_height.max(1);
    let source = to_rgb(frame)?;
    let width = scaled_width(frame.width, frame.height, target_height);

    let image = if (width, target_height) == source.dimensions() {
        source
    } else {
        imageops::resize(&source, width, target_height, FILTER)
    };

    Ok(ResizedFrame {
        image,
        source_width: frame.width,
        source_height: frame.height,
        timestamp: frame.timestamp,
    })
}
