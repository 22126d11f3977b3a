//! Master volume through the default render endpoint.

use windows::Win32::Foundation::BOOL;
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::Media::Audio::{IMMDeviceEnumerator, MMDeviceEnumerator, eConsole, eRender};
use windows::Win32::System::Com::{
    CLSCTX_INPROC_SERVER, COINIT_MULTITHREADED, CoCreateInstance, CoInitializeEx, CoUninitialize,
};

use rdesk_core::{RemoteError, VolumeActuator, apply_volume_delta};

fn volume_error(what: &str, e: windows::core::Error) -> RemoteError {
    RemoteError::Actuator(format!("{what} failed: {e}"))
}

/// Adjusts the speaker volume of the default console endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointVolume;

impl EndpointVolume {
    unsafe fn apply(delta: f32) -> Result<(), RemoteError> {
        let enumerator: IMMDeviceEnumerator =
            unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_INPROC_SERVER) }
                .map_err(|e| volume_error("CoCreateInstance(MMDeviceEnumerator)", e))?;
        let device = unsafe { enumerator.GetDefaultAudioEndpoint(eRender, eConsole) }
            .map_err(|e| volume_error("GetDefaultAudioEndpoint", e))?;
        let endpoint: IAudioEndpointVolume =
            unsafe { device.Activate(CLSCTX_INPROC_SERVER, None) }
                .map_err(|e| volume_error("Activate(IAudioEndpointVolume)", e))?;

        let current = unsafe { endpoint.GetMasterVolumeLevelScalar() }
            .map_err(|e| volume_error("GetMasterVolumeLevelScalar", e))?;
        let level = apply_volume_delta(current, delta);

        unsafe { endpoint.SetMute(BOOL::from(false), std::ptr::null()) }
            .map_err(|e| volume_error("SetMute", e))?;
        unsafe { endpoint.SetMasterVolumeLevelScalar(level, std::ptr::null()) }
            .map_err(|e| volume_error("SetMasterVolumeLevelScalar", e))?;

        tracing::debug!(current, level, "volume changed");
        Ok(())
    }
}

impl VolumeActuator for EndpointVolume {
    fn change_volume(&self, delta: f32) -> Result<(), RemoteError> {
        // COM is initialised per call; request threads come and go.
        let init = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        let result = unsafe { Self::apply(delta) };
        if init.is_ok() {
            unsafe { CoUninitialize() };
        }
        result
    }
}
