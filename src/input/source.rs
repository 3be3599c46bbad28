use rdev::{Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use thiserror::Error;
use tracing::{debug, error, info};

use super::keymap;
use super::{EventKind, RawInputEvent};

/// Event source errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// `start` was called on a running source
    #[error("event source already started")]
    AlreadyStarted,

    /// The hook thread could not be spawned
    #[error("failed to spawn input hook thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Stream of raw input events from the OS
pub trait EventSource {
    /// Start the hook and return the event stream, in arrival order
    ///
    /// The stream is a rendezvous channel: the hook blocks until each event
    /// is taken, so nothing is dropped.
    ///
    /// # Errors
    /// Returns error if the source is already running or cannot be started
    fn start(&mut self) -> Result<flume::Receiver<RawInputEvent>, SourceError>;

    /// Stop delivering events; the stream closes
    fn stop(&self);
}

/// Global keyboard/mouse hook backed by `rdev::listen`
#[derive(Default)]
pub struct RdevSource {
    sender: Arc<Mutex<Option<flume::Sender<RawInputEvent>>>>,
    started: AtomicBool,
}

impl RdevSource {
    /// Create an idle source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSource for RdevSource {
    fn start(&mut self) -> Result<flume::Receiver<RawInputEvent>, SourceError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SourceError::AlreadyStarted);
        }

        let (tx, rx) = flume::bounded(0);
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);

        let sender = Arc::clone(&self.sender);
        thread::Builder::new()
            .name("input-hook".to_owned())
            .spawn(move || {
                let mut translator = Translator::default();
                let hook_sender = Arc::clone(&sender);

                let callback = move |event: Event| {
                    let Some(raw) = translator.translate(event) else {
                        return;
                    };
                    let tx = hook_sender
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone();
                    if let Some(tx) = tx {
                        // Closed stream means the pipeline is gone; keep the hook quiet.
                        let _ = tx.send(raw);
                    }
                };

                info!("input hook listening");
                if let Err(e) = rdev::listen(callback) {
                    error!(error = ?e, "input hook stopped");
                }
                sender.lock().unwrap_or_else(PoisonError::into_inner).take();
            })?;

        Ok(rx)
    }

    fn stop(&self) {
        if self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            info!("input hook stopped");
        }
    }
}

/// Converts rdev events, remembering the pointer position for clicks
#[derive(Default)]
struct Translator {
    position: (f64, f64),
}

impl Translator {
    fn translate(&mut self, event: Event) -> Option<RawInputEvent> {
        let (kind, keycode) = match event.event_type {
            EventType::KeyPress(key) => (EventKind::KeyDown, keysym(key)),
            EventType::KeyRelease(key) => (EventKind::KeyUp, keysym(key)),
            EventType::ButtonPress(_) => (EventKind::MouseDown, 0),
            EventType::ButtonRelease(_) => (EventKind::MouseUp, 0),
            EventType::MouseMove { x, y } => {
                self.position = (x, y);
                (EventKind::MouseMove, 0)
            }
            EventType::Wheel { .. } => (EventKind::Wheel, 0),
        };

        if keycode == 0 && matches!(kind, EventKind::KeyDown | EventKind::KeyUp) {
            debug!(event = ?event.event_type, "key without keysym");
        }

        Some(RawInputEvent {
            kind,
            keycode,
            text: if kind == EventKind::KeyDown { event.name } else { None },
            position: self.position,
            timestamp: event.time,
        })
    }
}

/// X11 keysym for an rdev key, using the unshifted character for printable keys
#[allow(clippy::too_many_lines)]
const fn keysym(key: Key) -> u32 {
    match key {
        Key::Backspace => keymap::BACKSPACE,
        Key::Tab => keymap::TAB,
        Key::Return => keymap::RETURN,
        Key::Escape => keymap::ESCAPE,
        Key::Delete => keymap::DELETE,
        Key::Insert => keymap::INSERT,
        Key::Home => keymap::HOME,
        Key::End => keymap::END,
        Key::PageUp => keymap::PAGE_UP,
        Key::PageDown => keymap::PAGE_DOWN,
        Key::LeftArrow => keymap::LEFT,
        Key::UpArrow => keymap::UP,
        Key::RightArrow => keymap::RIGHT,
        Key::DownArrow => keymap::DOWN,
        Key::PrintScreen => keymap::PRINT,
        Key::ScrollLock => keymap::SCROLL_LOCK,
        Key::Pause => keymap::PAUSE,
        Key::NumLock => keymap::NUM_LOCK,
        Key::CapsLock => keymap::CAPS_LOCK,
        Key::ShiftLeft => keymap::SHIFT_L,
        Key::ShiftRight => keymap::SHIFT_R,
        Key::ControlLeft => keymap::CONTROL_L,
        Key::ControlRight => keymap::CONTROL_R,
        Key::Alt => keymap::ALT_L,
        Key::AltGr => keymap::ALT_GR,
        Key::MetaLeft => keymap::SUPER_L,
        Key::MetaRight => keymap::SUPER_R,
        Key::F1 => keymap::F1,
        Key::F2 => keymap::F1 + 1,
        Key::F3 => keymap::F1 + 2,
        Key::F4 => keymap::F1 + 3,
        Key::F5 => keymap::F1 + 4,
        Key::F6 => keymap::F1 + 5,
        Key::F7 => keymap::F1 + 6,
        Key::F8 => keymap::F1 + 7,
        Key::F9 => keymap::F1 + 8,
        Key::F10 => keymap::F1 + 9,
        Key::F11 => keymap::F1 + 10,
        Key::F12 => keymap::F1 + 11,
        Key::KpReturn => keymap::KP_ENTER,
        Key::KpMinus => keymap::KP_SUBTRACT,
        Key::KpPlus => keymap::KP_ADD,
        Key::KpMultiply => keymap::KP_MULTIPLY,
        Key::KpDivide => keymap::KP_DIVIDE,
        Key::KpDelete => keymap::KP_DECIMAL,
        Key::Kp0 => keymap::KP_0,
        Key::Kp1 => keymap::KP_0 + 1,
        Key::Kp2 => keymap::KP_0 + 2,
        Key::Kp3 => keymap::KP_0 + 3,
        Key::Kp4 => keymap::KP_0 + 4,
        Key::Kp5 => keymap::KP_0 + 5,
        Key::Kp6 => keymap::KP_0 + 6,
        Key::Kp7 => keymap::KP_0 + 7,
        Key::Kp8 => keymap::KP_0 + 8,
        Key::Kp9 => keymap::KP_0 + 9,
        Key::Space => ' ' as u32,
        Key::BackQuote => '`' as u32,
        Key::Minus => '-' as u32,
        Key::Equal => '=' as u32,
        Key::LeftBracket => '[' as u32,
        Key::RightBracket => ']' as u32,
        Key::SemiColon => ';' as u32,
        Key::Quote => '\'' as u32,
        Key::BackSlash | Key::IntlBackslash => '\\' as u32,
        Key::Comma => ',' as u32,
        Key::Dot => '.' as u32,
        Key::Slash => '/' as u32,
        Key::Num0 => '0' as u32,
        Key::Num1 => '1' as u32,
        Key::Num2 => '2' as u32,
        Key::Num3 => '3' as u32,
        Key::Num4 => '4' as u32,
        Key::Num5 => '5' as u32,
        Key::Num6 => '6' as u32,
        Key::Num7 => '7' as u32,
        Key::Num8 => '8' as u32,
        Key::Num9 => '9' as u32,
        Key::KeyA => 'a' as u32,
        Key::KeyB => 'b' as u32,
        Key::KeyC => 'c' as u32,
        Key::KeyD => 'd' as u32,
        Key::KeyE => 'e' as u32,
        Key::KeyF => 'f' as u32,
        Key::KeyG => 'g' as u32,
        Key::KeyH => 'h' as u32,
        Key::KeyI => 'i' as u32,
        Key::KeyJ => 'j' as u32,
        Key::KeyK => 'k' as u32,
        Key::KeyL => 'l' as u32,
        Key::KeyM => 'm' as u32,
        Key::KeyN => 'n' as u32,
        Key::KeyO => 'o' as u32,
        Key::KeyP => 'p' as u32,
        Key::KeyQ => 'q' as u32,
        Key::KeyR => 'r' as u32,
        Key::KeyS => 's' as u32,
        Key::KeyT => 't' as u32,
        Key::KeyU => 'u' as u32,
        Key::KeyV => 'v' as u32,
        Key::KeyW => 'w' as u32,
        Key::KeyX => 'x' as u32,
        Key::KeyY => 'y' as u32,
        Key::KeyZ => 'z' as u32,
        // Platform code without a keysym; passed through as-is.
        Key::Unknown(code) => code,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn rdev_event(event_type: EventType, name: Option<&str>) -> Event {
        Event {
            time: SystemTime::now(),
            name: name.map(str::to_owned),
            event_type,
        }
    }

    #[test]
    fn test_observed_keysyms() {
        assert_eq!(keysym(Key::Backspace), 65288);
        assert_eq!(keysym(Key::ControlLeft), 65507);
        assert_eq!(keysym(Key::ControlRight), 65508);
        assert_eq!(keysym(Key::KeyA), 0x61);
        assert_eq!(keysym(Key::F12), 0xffc9);
        assert_eq!(keysym(Key::Kp9), 0xffb9);
        assert_eq!(keysym(Key::Unknown(9001)), 9001);
    }

    #[test]
    fn test_translate_key_press_keeps_os_text() {
        let mut translator = Translator::default();
        let raw = translator
            .translate(rdev_event(EventType::KeyPress(Key::KeyA), Some("A")))
            .unwrap();

        assert_eq!(raw.kind, EventKind::KeyDown);
        assert_eq!(raw.keycode, 0x61);
        assert_eq!(raw.text.as_deref(), Some("A"));
    }

    #[test]
    fn test_translate_key_release_drops_text() {
        let mut translator = Translator::default();
        let raw = translator
            .translate(rdev_event(EventType::KeyRelease(Key::ControlLeft), Some("")))
            .unwrap();

        assert_eq!(raw.kind, EventKind::KeyUp);
        assert_eq!(raw.keycode, keymap::CONTROL_L);
        assert!(raw.text.is_none());
    }

    #[test]
    fn test_click_uses_last_pointer_position() {
        let mut translator = Translator::default();
        let moved = translator
            .translate(rdev_event(EventType::MouseMove { x: 120.0, y: 48.5 }, None))
            .unwrap();
        assert_eq!(moved.kind, EventKind::MouseMove);

        let click = translator
            .translate(rdev_event(EventType::ButtonPress(rdev::Button::Left), None))
            .unwrap();
        assert_eq!(click.kind, EventKind::MouseDown);
        assert_eq!(click.position, (120.0, 48.5));
    }

    #[test]
    fn test_stop_before_start_is_noop() {
        let source = RdevSource::new();
        source.stop();
    }

    #[test]
    #[ignore = "requires a display server and input monitoring permission"]
    fn test_start_twice_fails() {
        let mut source = RdevSource::new();
        assert!(source.start().is_ok());
        assert!(matches!(source.start(), Err(SourceError::AlreadyStarted)));
        source.stop();
    }
}
