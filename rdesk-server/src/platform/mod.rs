//! Host backends for the engine's capture and actuator seams.
//!
//! Windows gets DXGI desktop duplication, `SendInput` and the audio
//! endpoint volume. Elsewhere capture, input and volume report errors;
//! power commands work everywhere through the `shutdown` binary.

pub mod keymap;

#[cfg(target_os = "windows")]
mod capture;
#[cfg(target_os = "windows")]
mod input;
#[cfg(target_os = "windows")]
mod volume;

use std::sync::Arc;

use rdesk_core::{Actuators, CaptureBackend, SystemPower};

/// The screen grabber for this host.
#[cfg(target_os = "windows")]
pub fn capture_backend(monitor_index: u32) -> Arc<dyn CaptureBackend> {
    Arc::new(capture::DxgiBackend::new(monitor_index))
}

/// The screen grabber for this host.
#[cfg(not(target_os = "windows"))]
pub fn capture_backend(_monitor_index: u32) -> Arc<dyn CaptureBackend> {
    Arc::new(rdesk_core::NoCapture)
}

/// Input, volume and power actuators for this host.
#[cfg(target_os = "windows")]
pub fn actuators() -> Actuators {
    Actuators {
        input: Arc::new(input::SendInputActuator),
        volume: Arc::new(volume::EndpointVolume),
        power: Arc::new(SystemPower),
    }
}

/// Input, volume and power actuators for this host.
#[cfg(not(target_os = "windows"))]
pub fn actuators() -> Actuators {
    Actuators {
        power: Arc::new(SystemPower),
        ..Actuators::default()
    }
}
