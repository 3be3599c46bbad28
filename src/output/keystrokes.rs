use enigo::{Enigo, Keyboard, Settings};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{text_preview, TypingError};

/// Types text into the focused window, one character per key event
///
/// # Errors
/// Returns error if the text is empty, the input connection cannot be opened
/// or a key event is rejected.
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

    let mut enigo = Enigo::new(&Settings::default()).map_err(|e| {
        error!(error = %e, "failed to open input connection");
        TypingError::EventSourceCreation
    })?;

    let mut utf8 = [0_u8; 4];
    for (index, c) in text.chars().enumerate() {
        if index > 0 && !inter_key_delay.is_zero() {
            thread::sleep(inter_key_delay);
        }
        enigo
            .text(c.encode_utf8(&mut utf8))
            .map_err(|e| TypingError::EventCreation(e.to_string()))?;
    }

    debug!("keystrokes emitted");
    Ok(())
}
