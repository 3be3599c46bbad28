use std::time::SystemTime;

/// Key code to character resolution
pub mod keymap;
/// Keyboard/mouse stream classification
pub mod router;
/// Global input hook
pub mod source;

/// Kind of a raw input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Key pressed
    KeyDown,
    /// Key released
    KeyUp,
    /// Mouse button pressed
    MouseDown,
    /// Mouse button released
    MouseUp,
    /// Pointer moved
    MouseMove,
    /// Scroll wheel
    Wheel,
}

/// One event from the global input hook, consumed once
#[derive(Debug, Clone, PartialEq)]
pub struct RawInputEvent {
    /// Event kind
    pub kind: EventKind,
    /// Key code (X11 keysym numbering), 0 for mouse events
    pub keycode: u32,
    /// Character(s) the OS resolved for a key press, if any
    pub text: Option<String>,
    /// Pointer position for mouse events
    pub position: (f64, f64),
    /// When the hook observed the event
    pub timestamp: SystemTime,
}

impl RawInputEvent {
    /// Key press without OS-resolved text
    #[must_use]
    pub fn key_down(keycode: u32) -> Self {
        Self::key(EventKind::KeyDown, keycode, None)
    }

    /// Key press carrying the character the OS resolved for it
    #[must_use]
    pub fn key_down_with_text(keycode: u32, text: &str) -> Self {
        Self::key(EventKind::KeyDown, keycode, Some(text.to_owned()))
    }

    /// Key release
    #[must_use]
    pub fn key_up(keycode: u32) -> Self {
        Self::key(EventKind::KeyUp, keycode, None)
    }

    /// Mouse button press at a screen position
    #[must_use]
    pub fn mouse_down(x: f64, y: f64) -> Self {
        Self::mouse(EventKind::MouseDown, x, y)
    }

    /// Mouse event of any kind at a screen position
    #[must_use]
    pub fn mouse(kind: EventKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            keycode: 0,
            text: None,
            position: (x, y),
            timestamp: SystemTime::now(),
        }
    }

    fn key(kind: EventKind, keycode: u32, text: Option<String>) -> Self {
        Self {
            kind,
            keycode,
            text,
            position: (0.0, 0.0),
            timestamp: SystemTime::now(),
        }
    }
}
