//! DXGI Desktop Duplication screen capture.
//!
//! Uses the Direct3D 11 Desktop Duplication API to obtain GPU-backed
//! screen frames, copied through a CPU-readable staging texture.

use std::time::Instant;

use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::core::Interface;

use rdesk_core::{CaptureBackend, PixelFormat, RawScreenFrame, RemoteError, ScreenCapturer};

/// How long one acquire waits for the compositor.
const ACQUIRE_TIMEOUT_MS: u32 = 100;

fn capture_error(what: &str, e: windows::core::Error) -> RemoteError {
    RemoteError::Capture(format!("{what} failed: {e}"))
}

// ── DxgiBackend ──────────────────────────────────────────────────

/// Opens a [`DxgiCapturer`] on the capture thread.
pub struct DxgiBackend {
    monitor_index: u32,
}

impl DxgiBackend {
    pub fn new(monitor_index: u32) -> Self {
        Self { monitor_index }
    }
}

impl CaptureBackend for DxgiBackend {
    fn open(&self) -> Result<Box<dyn ScreenCapturer>, RemoteError> {
        Ok(Box::new(DxgiCapturer::new(self.monitor_index)?))
    }
}

// ── DxgiCapturer ─────────────────────────────────────────────────

/// Wraps the `IDXGIOutputDuplication` pipeline:
///
/// 1. Create a D3D11 device.
/// 2. Duplicate the target monitor.
/// 3. Create a CPU-readable staging texture.
/// 4. Per capture: acquire, copy to staging, map, copy out, unmap.
///
/// The duplication is recreated after the desktop switches (UAC
/// prompt, lock screen, mode change).
pub struct DxgiCapturer {
    monitor_index: u32,
    width: u32,
    height: u32,
    context: ID3D11DeviceContext,
    duplication: IDXGIOutputDuplication,
    staging: ID3D11Texture2D,
    lost: bool,
}

impl DxgiCapturer {
    /// Initialise the capturer for monitor `monitor_index` (0 = primary).
    pub fn new(monitor_index: u32) -> Result<Self, RemoteError> {
        unsafe { Self::init(monitor_index) }
    }

    unsafe fn init(monitor_index: u32) -> Result<Self, RemoteError> {
        let mut device = None;
        let mut context = None;
        unsafe {
            D3D11CreateDevice(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                None,
                D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                None,
                D3D11_SDK_VERSION,
                Some(&mut device),
                None,
                Some(&mut context),
            )
            .map_err(|e| capture_error("D3D11CreateDevice", e))?;
        }
        let device: ID3D11Device =
            device.ok_or_else(|| RemoteError::Capture("no D3D11 device".into()))?;
        let context =
            context.ok_or_else(|| RemoteError::Capture("no D3D11 context".into()))?;

        let dxgi_device: IDXGIDevice = device
            .cast()
            .map_err(|e| capture_error("IDXGIDevice cast", e))?;
        let adapter = unsafe { dxgi_device.GetAdapter() }
            .map_err(|e| capture_error("GetAdapter", e))?;
        let output = unsafe { adapter.EnumOutputs(monitor_index) }
            .map_err(|e| capture_error(&format!("EnumOutputs({monitor_index})"), e))?;
        let output1: IDXGIOutput1 = output
            .cast()
            .map_err(|e| capture_error("IDXGIOutput1 cast", e))?;
        let duplication = unsafe { output1.DuplicateOutput(&device) }
            .map_err(|e| capture_error("DuplicateOutput", e))?;

        let desc = unsafe { duplication.GetDesc() };
        let (width, height) = (desc.ModeDesc.Width, desc.ModeDesc.Height);

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: width,
            Height: height,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_B8G8R8A8_UNORM,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Usage: D3D11_USAGE_STAGING,
            BindFlags: 0,
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: 0,
        };
        let mut staging = None;
        unsafe { device.CreateTexture2D(&staging_desc, None, Some(&mut staging)) }
            .map_err(|e| capture_error("CreateTexture2D", e))?;
        let staging =
            staging.ok_or_else(|| RemoteError::Capture("no staging texture".into()))?;

        tracing::info!(monitor_index, width, height, "DXGI duplication ready");
        Ok(Self {
            monitor_index,
            width,
            height,
            context,
            duplication,
            staging,
            lost: false,
        })
    }

    unsafe fn acquire(&mut self) -> Result<Option<RawScreenFrame>, RemoteError> {
        let mut info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource = None;

        match unsafe {
            self.duplication
                .AcquireNextFrame(ACQUIRE_TIMEOUT_MS, &mut info, &mut resource)
        } {
            Ok(()) => {}
            Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => return Ok(None),
            Err(e) if e.code() == DXGI_ERROR_ACCESS_LOST => {
                self.lost = true;
                return Err(capture_error("AcquireNextFrame", e));
            }
            Err(e) => return Err(capture_error("AcquireNextFrame", e)),
        }

        // Pointer-only updates carry no new desktop image.
        if info.LastPresentTime == 0 {
            let _ = unsafe { self.duplication.ReleaseFrame() };
            return Ok(None);
        }

        let texture: Result<ID3D11Texture2D, RemoteError> = resource
            .ok_or_else(|| RemoteError::Capture("acquired frame has no resource".into()))
            .and_then(|r| r.cast().map_err(|e| capture_error("ID3D11Texture2D cast", e)));
        let texture = match texture {
            Ok(texture) => texture,
            Err(e) => {
                let _ = unsafe { self.duplication.ReleaseFrame() };
                return Err(e);
            }
        };

        unsafe { self.context.CopyResource(&self.staging, &texture) };
        let _ = unsafe { self.duplication.ReleaseFrame() };

        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        unsafe {
            self.context
                .Map(&self.staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
        }
        .map_err(|e| capture_error("Map", e))?;

        let stride = mapped.RowPitch;
        let len = stride as usize * self.height as usize;
        let data = unsafe { std::slice::from_raw_parts(mapped.pData as *const u8, len) }.to_vec();
        unsafe { self.context.Unmap(&self.staging, 0) };

        Ok(Some(RawScreenFrame {
            width: self.width,
            height: self.height,
            stride,
            format: PixelFormat::Bgra8,
            data,
            timestamp: Instant::now(),
        }))
    }
}

impl ScreenCapturer for DxgiCapturer {
    fn capture(&mut self) -> Result<Option<RawScreenFrame>, RemoteError> {
        if self.lost {
            *self = Self::new(self.monitor_index)?;
        }
        unsafe { self.acquire() }
    }
}
