//! Screen streaming: capture, scale to a fixed height, compress.
//!
//! - [`capture`]: the injected OS capture seam.
//! - [`slot`]: latest-wins single-value hand-off between stages.
//! - [`resize`] / [`encoder`]: the CPU stages.
//! - [`service`]: [`CapturePipeline`], which owns the stage tasks.

pub mod capture;
pub mod encoder;
pub mod resize;
pub mod service;
pub mod slot;
pub mod types;

pub use capture::{CaptureBackend, NoCapture, ScreenCapturer};
pub use encoder::{DEFAULT_JPEG_QUALITY, FrameEncoder};
pub use resize::{DEFAULT_TARGET_HEIGHT, scale_to_height, scaled_width};
pub use service::{CapturePipeline, DEFAULT_IDLE_FRAME_LIMIT, PipelineConfig};
pub use slot::LatestSlot;
pub use types::{EncodedFrame, PixelFormat, RawScreenFrame, ResizedFrame};
