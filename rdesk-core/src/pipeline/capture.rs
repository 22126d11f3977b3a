//! Screen capture seam.
//!
//! The pipeline never talks to the OS directly. The host injects a
//! [`CaptureBackend`], which the capture stage opens on its own thread:
//! several platform grabbers hold thread-affine handles, so the opened
//! [`ScreenCapturer`] is not required to be `Send`.

use crate::error::RemoteError;
use crate::pipeline::types::RawScreenFrame;

/// Factory for a platform screen grabber.
pub trait CaptureBackend: Send + Sync + 'static {
    /// Open the primary display for capture.
    ///
    /// Called once per pipeline start, on the capture thread. An error
    /// keeps the pipeline stopped.
    fn open(&self) -> Result<Box<dyn ScreenCapturer>, RemoteError>;
}

/// An opened screen grabber.
pub trait ScreenCapturer {
    /// Grab the next full-screen frame.
    ///
    /// `Ok(None)` means no new frame was available within the
    /// grabber's own wait; the capture stage simply asks again.
    fn capture(&mut self) -> Result<Option<RawScreenFrame>, RemoteError>;
}

/// Backend for hosts without a capture primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl CaptureBackend for NoCapture {
    fn open(&self) -> Result<Box<dyn ScreenCapturer>, RemoteError> {
        Err(RemoteError::Capture(
            "screen capture is not available on this host".into(),
        ))
    }
}
