use core_graphics::event::{CGEvent, CGEventTapLocation};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{text_preview, TypingError};

/// Types text at the current cursor position, one character per key event
///
/// # Errors
/// Returns error if the text is empty or a `CGEvent` cannot be created.
///
/// # Known Limitations
/// - `event.post()` does not return errors; apps with secure input enabled
///   silently drop the events
/// - Requires Accessibility and Input Monitoring permission (checked at startup)
pub fn type_text(text: &str, inter_key_delay: Duration) -> Result<(), TypingError> {
    if text.is_empty() {
        error!("attempted to type empty text");
        return Err(TypingError::EmptyText);
    }

    info!(
        text_len = text.chars().count(),
        text_preview = %text_preview(text),
        delay_ms = inter_key_delay.as_millis(),
        "starting synthetic typing"
    );

    let mut utf16 = [0_u16; 2];
    for (index, c) in text.chars().enumerate() {
        if index > 0 && !inter_key_delay.is_zero() {
            thread::sleep(inter_key_delay);
        }
        post_char(c.encode_utf16(&mut utf16))?;
    }

    debug!("✓ CGEvents posted to HID");
    Ok(())
}

fn post_char(utf16: &[u16]) -> Result<(), TypingError> {
    for key_down in [true, false] {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|()| {
            error!("FAILED: CGEventSource creation - Input Monitoring permission may have been revoked");
            TypingError::EventSourceCreation
        })?;

        // Keycode 0 is a placeholder; the unicode string overrides it.
        let event = CGEvent::new_keyboard_event(source, 0, key_down).map_err(|()| {
            TypingError::EventCreation("CGEvent keyboard event creation failed".to_owned())
        })?;

        // encode_utf16 on a char always yields valid UTF-16.
        event.set_string_from_utf16_unchecked(utf16);
        event.post(CGEventTapLocation::HID);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_text_empty() {
        assert!(matches!(
            type_text("", Duration::ZERO),
            Err(TypingError::EmptyText)
        ));
    }

    #[test]
    #[ignore = "requires Accessibility permissions and active cursor"]
    fn test_type_text_unicode() {
        assert!(type_text("Cześć 👋", Duration::from_millis(5)).is_ok());
    }
}
