use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Synthetic keystrokes through CoreGraphics
#[cfg(target_os = "macos")]
pub mod cgevent;
/// Synthetic keystrokes through enigo
#[cfg(not(target_os = "macos"))]
pub mod keystrokes;

#[cfg(target_os = "macos")]
use cgevent as platform;
#[cfg(not(target_os = "macos"))]
use keystrokes as platform;

/// Generate preview of text for logging (pure, testable)
///
/// Truncates text longer than 50 chars to 47 chars plus "...".
#[must_use]
pub fn text_preview(text: &str) -> String {
    match text.char_indices().nth(47) {
        Some((end, _)) if text.chars().count() > 50 => format!("{}...", &text[..end]),
        _ => text.to_owned(),
    }
}

/// Synthetic typing errors
#[derive(Debug, Error)]
pub enum TypingError {
    /// Text is empty
    #[error("text is empty")]
    EmptyText,

    /// Failed to create the platform event source
    #[error("failed to create keyboard event source")]
    EventSourceCreation,

    /// Failed to create or post a keyboard event
    #[error("failed to emit keyboard event: {0}")]
    EventCreation(String),
}

/// Where pipeline results go
///
/// Notifications are fire-and-forget. `type_text` blocks until every
/// keystroke has been emitted.
#[cfg_attr(test, mockall::automock)]
pub trait OutputSink: Send + Sync {
    /// The text buffer changed
    fn notify_buffer_changed(&self, text: &str);

    /// A new prediction was accepted
    fn notify_prediction(&self, text: &str);

    /// A new correction was accepted
    fn notify_correction(&self, text: &str);

    /// A mouse button was pressed at screen coordinates
    fn notify_mouse_click(&self, x: f64, y: f64);

    /// Emit `text` as keystrokes, pausing `inter_key_delay` between characters
    ///
    /// # Errors
    /// Returns error if the text is empty or the platform refuses the events
    fn type_text(&self, text: &str, inter_key_delay: Duration) -> Result<(), TypingError>;
}

/// Sink for a headless desktop session: notifications are logged, text is typed
/// into the focused application
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopSink;

impl OutputSink for DesktopSink {
    fn notify_buffer_changed(&self, text: &str) {
        debug!(len = text.chars().count(), preview = %text_preview(text), "buffer changed");
    }

    fn notify_prediction(&self, text: &str) {
        info!(prediction = %text_preview(text), "prediction ready");
    }

    fn notify_correction(&self, text: &str) {
        info!(correction = %text_preview(text), "correction ready");
    }

    fn notify_mouse_click(&self, x: f64, y: f64) {
        debug!(x, y, "mouse click");
    }

    fn type_text(&self, text: &str, inter_key_delay: Duration) -> Result<(), TypingError> {
        platform::type_text(text, inter_key_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_preview_short() {
        assert_eq!(text_preview("hello"), "hello");
        assert_eq!(text_preview(""), "");
    }

    #[test]
    fn test_text_preview_exactly_50_chars() {
        let text_50 = "a".repeat(50);
        assert_eq!(text_preview(&text_50), text_50);
    }

    #[test]
    fn test_text_preview_long() {
        let text_51 = "a".repeat(51);
        let preview = text_preview(&text_51);
        assert_eq!(preview.chars().count(), 50);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_text_preview_unicode() {
        let long_unicode = "👋".repeat(60);
        let preview = text_preview(&long_unicode);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 50);
        assert!(preview.starts_with("👋"));
    }

    #[test]
    fn test_desktop_sink_rejects_empty_text() {
        let result = DesktopSink.type_text("", Duration::ZERO);
        assert!(matches!(result, Err(TypingError::EmptyText)));
    }

    #[test]
    #[ignore = "requires accessibility permissions and an active cursor"]
    fn test_desktop_sink_types_text() {
        assert!(DesktopSink.type_text("ox", Duration::from_millis(5)).is_ok());
    }
}
