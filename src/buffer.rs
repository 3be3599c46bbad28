use tracing::debug;

use crate::input::keymap::KeyAction;

/// How a key press changed the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// Text was appended
    Appended,
    /// The last character was removed
    Deleted,
    /// The buffer grew past its limit and was cleared
    Overflowed,
}

/// Rolling text typed since the last overflow
///
/// Length is counted in characters. Growing past `max_len` clears the whole
/// buffer rather than truncating it.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    text: String,
    chars: usize,
    max_len: usize,
}

impl TextBuffer {
    /// Create an empty buffer
    #[must_use]
    pub const fn new(max_len: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            max_len,
        }
    }

    /// Apply a key action; `None` if the buffer did not change
    pub fn apply(&mut self, action: &KeyAction) -> Option<Edit> {
        let edit = match action {
            KeyAction::Backspace => {
                self.text.pop()?;
                self.chars -= 1;
                Edit::Deleted
            }
            KeyAction::Insert(text) if !text.is_empty() => {
                self.text.push_str(text);
                self.chars += text.chars().count();
                Edit::Appended
            }
            KeyAction::Insert(_) | KeyAction::Ignore => return None,
        };

        if self.chars > self.max_len {
            debug!(len = self.chars, max_len = self.max_len, "buffer overflow, clearing");
            self.clear();
            return Some(Edit::Overflowed);
        }

        Some(edit)
    }

    fn clear(&mut self) {
        self.text.clear();
        self.chars = 0;
    }

    /// Current content
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters
    #[must_use]
    pub const fn len(&self) -> usize {
        self.chars
    }

    /// True when nothing is buffered
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.chars == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(text: &str) -> KeyAction {
        KeyAction::Insert(text.to_owned())
    }

    #[test]
    fn test_appends_in_order() {
        let mut buffer = TextBuffer::new(100);
        for c in "hello world".chars() {
            assert_eq!(buffer.apply(&insert(&c.to_string())), Some(Edit::Appended));
        }
        assert_eq!(buffer.as_str(), "hello world");
        assert_eq!(buffer.len(), 11);
    }

    #[test]
    fn test_backspace_removes_last_char() {
        let mut buffer = TextBuffer::new(100);
        buffer.apply(&insert("ab"));

        assert_eq!(buffer.apply(&KeyAction::Backspace), Some(Edit::Deleted));
        assert_eq!(buffer.as_str(), "a");
    }

    #[test]
    fn test_backspace_on_empty_is_noop() {
        let mut buffer = TextBuffer::new(100);
        assert_eq!(buffer.apply(&KeyAction::Backspace), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_backspace_multibyte() {
        let mut buffer = TextBuffer::new(100);
        buffer.apply(&insert("zażółć"));
        buffer.apply(&KeyAction::Backspace);

        assert_eq!(buffer.as_str(), "zażół");
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_ignore_does_not_change() {
        let mut buffer = TextBuffer::new(100);
        buffer.apply(&insert("x"));

        assert_eq!(buffer.apply(&KeyAction::Ignore), None);
        assert_eq!(buffer.apply(&insert("")), None);
        assert_eq!(buffer.as_str(), "x");
    }

    #[test]
    fn test_fills_to_limit_without_reset() {
        let mut buffer = TextBuffer::new(5);
        for _ in 0..5 {
            buffer.apply(&insert("a"));
        }
        assert_eq!(buffer.as_str(), "aaaaa");
    }

    #[test]
    fn test_overflow_clears_whole_buffer() {
        let mut buffer = TextBuffer::new(5);
        for _ in 0..5 {
            buffer.apply(&insert("a"));
        }

        assert_eq!(buffer.apply(&insert("b")), Some(Edit::Overflowed));
        assert!(buffer.is_empty());
        assert_eq!(buffer.as_str(), "");

        assert_eq!(buffer.apply(&insert("c")), Some(Edit::Appended));
        assert_eq!(buffer.as_str(), "c");
    }

    #[test]
    fn test_multichar_insert_can_overflow() {
        let mut buffer = TextBuffer::new(3);
        buffer.apply(&insert("ab"));
        assert_eq!(buffer.apply(&insert("cd")), Some(Edit::Overflowed));
        assert!(buffer.is_empty());
    }
}
