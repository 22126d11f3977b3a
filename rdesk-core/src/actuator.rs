//! Host-side actuators: input injection, volume and power.
//!
//! The service forwards these calls verbatim; all OS specifics live in
//! the host binary. Key codes and mouse button ids are whatever the
//! controller sends (AWT virtual-key codes and `BUTTONn_DOWN_MASK`
//! values for the stock Android client).

use async_trait::async_trait;
use tracing::info;

use crate::error::RemoteError;

// ── Traits ───────────────────────────────────────────────────────

/// Replays keyboard and mouse events into the local input stream.
pub trait InputActuator: Send + Sync {
    fn key_press(&self, key_code: i32) -> Result<(), RemoteError>;

    fn key_release(&self, key_code: i32) -> Result<(), RemoteError>;

    fn mouse_press(&self, button: i32) -> Result<(), RemoteError>;

    fn mouse_release(&self, button: i32) -> Result<(), RemoteError>;

    /// Move the cursor.
    ///
    /// With `absolute` set, `x` and `y` are fractions of the screen size
    /// (`0.0..=1.0`). Otherwise they are pixel offsets from the current
    /// cursor position.
    fn mouse_move(&self, x: f32, y: f32, absolute: bool) -> Result<(), RemoteError>;

    /// Scroll the wheel; negative is up, positive is down.
    fn mouse_scroll(&self, direction: i16) -> Result<(), RemoteError>;
}

/// Adjusts the master output volume.
pub trait VolumeActuator: Send + Sync {
    /// Add `delta` to the scalar master volume, clamped to `[0, 1]`,
    /// and un-mute the speaker.
    fn change_volume(&self, delta: f32) -> Result<(), RemoteError>;
}

/// Shuts down or restarts the machine.
#[async_trait]
pub trait PowerActuator: Send + Sync {
    async fn shutdown(&self) -> Result<(), RemoteError>;

    async fn restart(&self) -> Result<(), RemoteError>;
}

/// New scalar volume after applying `delta` to `current`.
pub fn apply_volume_delta(current: f32, delta: f32) -> f32 {
    (current + delta).clamp(0.0, 1.0)
}

// ── Power commands ───────────────────────────────────────────────

/// What a [`PowerActuator`] is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown,
    Restart,
}

impl PowerAction {
    /// The OS command line that performs this action immediately.
    pub fn command_line(self) -> (&'static str, &'static [&'static str]) {
        let args: &'static [&'static str] = match (self, cfg!(target_os = "windows")) {
            (PowerAction::Shutdown, true) => &["-s", "-t", "0"],
            (PowerAction::Restart, true) => &["-r", "-t", "0"],
            (PowerAction::Shutdown, false) => &["-h", "now"],
            (PowerAction::Restart, false) => &["-r", "now"],
        };
        ("shutdown", args)
    }
}

/// Runs the platform `shutdown` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPower;

impl SystemPower {
    async fn run(action: PowerAction) -> Result<(), RemoteError> {
        let (program, args) = action.command_line();
        info!(?action, "running {program} {}", args.join(" "));

        let status = tokio::process::Command::new(program)
            .args(args)
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(RemoteError::Actuator(format!("{program} exited with {status}")))
        }
    }
}

#[async_trait]
impl PowerActuator for SystemPower {
    async fn shutdown(&self) -> Result<(), RemoteError> {
        Self::run(PowerAction::Shutdown).await
    }

    async fn restart(&self) -> Result<(), RemoteError> {
        Self::run(PowerAction::Restart).await
    }
}

// ── Unsupported host ─────────────────────────────────────────────

/// Actuator for hosts that cannot inject input or change volume.
///
/// Every call fails with [`RemoteError::Actuator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl Unsupported {
    fn fail(what: &str) -> Result<(), RemoteError> {
        Err(RemoteError::Actuator(format!(
            "{what} is not supported on this host"
        )))
    }
}

impl InputActuator for Unsupported {
    fn key_press(&self, _key_code: i32) -> Result<(), RemoteError> {
        Self::fail("keyboard input")
    }

    fn key_release(&self, _key_code: i32) -> Result<(), RemoteError> {
        Self::fail("keyboard input")
    }

    fn mouse_press(&self, _button: i32) -> Result<(), RemoteError> {
        Self::fail("mouse input")
    }

    fn mouse_release(&self, _button: i32) -> Result<(), RemoteError> {
        Self::fail("mouse input")
    }

    fn mouse_move(&self, _x: f32, _y: f32, _absolute: bool) -> Result<(), RemoteError> {
        Self::fail("mouse input")
    }

    fn mouse_scroll(&self, _direction: i16) -> Result<(), RemoteError> {
        Self::fail("mouse input")
    }
}

impl VolumeActuator for Unsupported {
    fn change_volume(&self, _delta: f32) -> Result<(), RemoteError> {
        Self::fail("volume control")
    }
}

#[async_trait]
impl PowerActuator for Unsupported {
    async fn shutdown(&self) -> Result<(), RemoteError> {
        Self::fail("shutdown")
    }

    async fn restart(&self) -> Result<(), RemoteError> {
        Self::fail("restart")
    }
}
