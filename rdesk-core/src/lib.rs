//! # rdesk-core
//!
//! Session and screen-streaming engine of the rdesk remote-control
//! server.
//!
//! This crate contains:
//! - **Session**: `SessionManager`, one controller at a time, guarded by
//!   a random token and a heartbeat watchdog
//! - **Pipeline**: `CapturePipeline`, capture → resize → JPEG with
//!   latest-wins hand-off and idle shutdown
//! - **Files**: `ChunkedFileStore`, chunked uploads flushed to disk
//! - **Service**: `RemoteControlService`, token check and routing
//! - **Protocol**: `Request` / `Response`, the serde form of each call
//! - **Actuators**: input, volume and power seams for the host
//! - **Error**: `RemoteError`, a `thiserror`-based error enum

pub mod actuator;
pub mod error;
pub mod files;
pub mod pipeline;
pub mod protocol;
pub mod service;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use actuator::{
    InputActuator, PowerAction, PowerActuator, SystemPower, Unsupported, VolumeActuator,
    apply_volume_delta,
};
pub use error::RemoteError;
pub use files::ChunkedFileStore;
pub use pipeline::{
    CaptureBackend, CapturePipeline, EncodedFrame, NoCapture, PipelineConfig, PixelFormat,
    RawScreenFrame, ScreenCapturer,
};
pub use protocol::{Request, Response};
pub use service::{Actuators, RemoteControlService, ServiceConfig};
pub use session::{SessionConfig, SessionHooks, SessionManager, StaticPassword, Token};
