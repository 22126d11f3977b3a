//! Controller key codes and button ids to Win32 values.
//!
//! The controller sends AWT `KeyEvent.VK_*` codes and
//! `InputEvent.BUTTONn_DOWN_MASK` button ids. Letters, digits, function
//! keys, arrows and modifiers already share their Win32 value; the rest
//! is translated here.

/// A physical mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// Decode a controller button id.
    ///
    /// Accepts the `BUTTONn_DOWN_MASK` values, the legacy `BUTTONn_MASK`
    /// values, and plain button numbers 1-3.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1024 | 16 | 1 => Some(MouseButton::Left),
            2048 | 8 | 2 => Some(MouseButton::Middle),
            4096 | 4 | 3 => Some(MouseButton::Right),
            _ => None,
        }
    }
}

/// Win32 virtual-key code for an AWT key code.
pub fn virtual_key(awt_code: i32) -> Option<u16> {
    let vk = match awt_code {
        10 => 0x0D,  // Enter
        127 => 0x2E, // Delete
        155 => 0x2D, // Insert
        44 => 0xBC,  // ,
        45 => 0xBD,  // -
        46 => 0xBE,  // .
        47 => 0xBF,  // /
        59 => 0xBA,  // ;
        61 => 0xBB,  // =
        91 => 0xDB,  // [
        92 => 0xDC,  // \
        93 => 0xDD,  // ]
        192 => 0xC0, // `
        222 => 0xDE, // '
        524 => 0x5B, // Windows
        525 => 0x5D, // Context menu
        code @ 0..=0xFE => return Some(code as u16),
        _ => return None,
    };
    Some(vk)
}

/// Wheel delta for a controller scroll direction.
///
/// The controller uses positive for down; Win32 wheel deltas are
/// positive away from the user.
pub fn wheel_delta(direction: i16) -> i32 {
    -i32::from(direction) * 120
}

/// Absolute SendInput coordinate (`0..=65535`) for a screen fraction.
pub fn normalized_coordinate(fraction: f32) -> i32 {
    (fraction.clamp(0.0, 1.0) * 65535.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_codes_pass_through() {
        assert_eq!(virtual_key(65), Some(0x41)); // A
        assert_eq!(virtual_key(48), Some(0x30)); // 0
        assert_eq!(virtual_key(112), Some(0x70)); // F1
        assert_eq!(virtual_key(16), Some(0x10)); // Shift
        assert_eq!(virtual_key(37), Some(0x25)); // Left
    }

    #[test]
    fn diverging_codes_are_translated() {
        assert_eq!(virtual_key(10), Some(0x0D));
        assert_eq!(virtual_key(127), Some(0x2E));
        assert_eq!(virtual_key(155), Some(0x2D));
        assert_eq!(virtual_key(222), Some(0xDE));
    }

    #[test]
    fn out_of_range_codes_are_rejected() {
        assert_eq!(virtual_key(-1), None);
        assert_eq!(virtual_key(70_000), None);
    }

    #[test]
    fn button_ids() {
        assert_eq!(MouseButton::from_id(1024), Some(MouseButton::Left));
        assert_eq!(MouseButton::from_id(2048), Some(MouseButton::Middle));
        assert_eq!(MouseButton::from_id(4096), Some(MouseButton::Right));
        assert_eq!(MouseButton::from_id(3), Some(MouseButton::Right));
        assert_eq!(MouseButton::from_id(7), None);
    }

    #[test]
    fn scroll_and_coordinates() {
        assert_eq!(wheel_delta(1), -120);
        assert_eq!(wheel_delta(-1), 120);
        assert_eq!(normalized_coordinate(0.0), 0);
        assert_eq!(normalized_coordinate(1.0), 65535);
        assert_eq!(normalized_coordinate(2.0), 65535);
        assert_eq!(normalized_coordinate(0.5), 32768);
    }
}
