//! Win32 `SendInput` mouse and keyboard injection.
//!
//! Requires the process to run in the interactive desktop session.

use windows::Win32::Foundation::POINT;
use windows::Win32::UI::Input::KeyboardAndMouse::*;
use windows::Win32::UI::WindowsAndMessaging::{GetCursorPos, SetCursorPos};

use rdesk_core::{InputActuator, RemoteError};

use super::keymap::{self, MouseButton};

/// Injects controller input into the local input stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendInputActuator;

impl SendInputActuator {
    fn send(input: INPUT, what: &str) -> Result<(), RemoteError> {
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            return Err(RemoteError::Actuator(format!("SendInput ({what}) returned 0")));
        }
        Ok(())
    }

    fn mouse(dx: i32, dy: i32, data: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: data as u32,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn key(key_code: i32, release: bool) -> Result<(), RemoteError> {
        let vk = keymap::virtual_key(key_code)
            .ok_or_else(|| RemoteError::Actuator(format!("unknown key code {key_code}")))?;

        let mut flags = KEYBD_EVENT_FLAGS(0);
        if release {
            flags |= KEYEVENTF_KEYUP;
        }
        // Navigation keys live on the extended block.
        if matches!(vk, 0x21..=0x28 | 0x2D | 0x2E | 0x5B | 0x5D) {
            flags |= KEYEVENTF_EXTENDEDKEY;
        }

        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(vk),
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        Self::send(input, "keyboard")
    }

    fn button(button: i32, release: bool) -> Result<(), RemoteError> {
        let button = MouseButton::from_id(button)
            .ok_or_else(|| RemoteError::Actuator(format!("unknown mouse button {button}")))?;

        let flags = match (button, release) {
            (MouseButton::Left, false) => MOUSEEVENTF_LEFTDOWN,
            (MouseButton::Left, true) => MOUSEEVENTF_LEFTUP,
            (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEDOWN,
            (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEUP,
            (MouseButton::Right, false) => MOUSEEVENTF_RIGHTDOWN,
            (MouseButton::Right, true) => MOUSEEVENTF_RIGHTUP,
        };
        Self::send(Self::mouse(0, 0, 0, flags), "mouse button")
    }
}

impl InputActuator for SendInputActuator {
    fn key_press(&self, key_code: i32) -> Result<(), RemoteError> {
        Self::key(key_code, false)
    }

    fn key_release(&self, key_code: i32) -> Result<(), RemoteError> {
        Self::key(key_code, true)
    }

    fn mouse_press(&self, button: i32) -> Result<(), RemoteError> {
        Self::button(button, false)
    }

    fn mouse_release(&self, button: i32) -> Result<(), RemoteError> {
        Self::button(button, true)
    }

    fn mouse_move(&self, x: f32, y: f32, absolute: bool) -> Result<(), RemoteError> {
        if absolute {
            let input = Self::mouse(
                keymap::normalized_coordinate(x),
                keymap::normalized_coordinate(y),
                0,
                MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE,
            );
            return Self::send(input, "mouse move");
        }

        // Relative moves bypass pointer acceleration.
        let mut pos = POINT::default();
        unsafe { GetCursorPos(&mut pos) }
            .map_err(|e| RemoteError::Actuator(format!("GetCursorPos failed: {e}")))?;
        unsafe { SetCursorPos(pos.x + x as i32, pos.y + y as i32) }
            .map_err(|e| RemoteError::Actuator(format!("SetCursorPos failed: {e}")))
    }

    fn mouse_scroll(&self, direction: i16) -> Result<(), RemoteError> {
        let input = Self::mouse(0, 0, keymap::wheel_delta(direction), MOUSEEVENTF_WHEEL);
        Self::send(input, "mouse wheel")
    }
}
