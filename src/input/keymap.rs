//! Key code classification for the text buffer.
//!
//! Key codes use X11 keysym numbering on every platform; the event source
//! translates its native codes into it. Latin-1 keysyms equal their code
//! point and keysyms `0x0100_0000 + cp` encode any other Unicode character.

use super::RawInputEvent;

/// `BackSpace`
pub const BACKSPACE: u32 = 0xff08;
/// `Tab`
pub const TAB: u32 = 0xff09;
/// `Return`
pub const RETURN: u32 = 0xff0d;
/// `Pause`
pub const PAUSE: u32 = 0xff13;
/// `Scroll_Lock`
pub const SCROLL_LOCK: u32 = 0xff14;
/// `Escape`
pub const ESCAPE: u32 = 0xff1b;
/// `Home`
pub const HOME: u32 = 0xff50;
/// `Left`
pub const LEFT: u32 = 0xff51;
/// `Up`
pub const UP: u32 = 0xff52;
/// `Right`
pub const RIGHT: u32 = 0xff53;
/// `Down`
pub const DOWN: u32 = 0xff54;
/// `Page_Up`
pub const PAGE_UP: u32 = 0xff55;
/// `Page_Down`
pub const PAGE_DOWN: u32 = 0xff56;
/// `End`
pub const END: u32 = 0xff57;
/// `Print`
pub const PRINT: u32 = 0xff61;
/// `Insert`
pub const INSERT: u32 = 0xff63;
/// `Num_Lock`
pub const NUM_LOCK: u32 = 0xff7f;
/// `KP_Enter`
pub const KP_ENTER: u32 = 0xff8d;
/// `KP_Multiply`
pub const KP_MULTIPLY: u32 = 0xffaa;
/// `KP_Add`
pub const KP_ADD: u32 = 0xffab;
/// `KP_Subtract`
pub const KP_SUBTRACT: u32 = 0xffad;
/// `KP_Decimal`
pub const KP_DECIMAL: u32 = 0xffae;
/// `KP_Divide`
pub const KP_DIVIDE: u32 = 0xffaf;
/// `KP_0`; `KP_1` to `KP_9` follow consecutively
pub const KP_0: u32 = 0xffb0;
/// `F1`; `F2` to `F12` follow consecutively
pub const F1: u32 = 0xffbe;
/// `Shift_L`
pub const SHIFT_L: u32 = 0xffe1;
/// `Shift_R`
pub const SHIFT_R: u32 = 0xffe2;
/// `Control_L`
pub const CONTROL_L: u32 = 0xffe3;
/// `Control_R`
pub const CONTROL_R: u32 = 0xffe4;
/// `Caps_Lock`
pub const CAPS_LOCK: u32 = 0xffe5;
/// `Meta_L`
pub const META_L: u32 = 0xffe7;
/// `Alt_L`
pub const ALT_L: u32 = 0xffe9;
/// `ISO_Level3_Shift` (`AltGr`)
pub const ALT_GR: u32 = 0xfe03;
/// `Super_L`
pub const SUPER_L: u32 = 0xffeb;
/// `Super_R`
pub const SUPER_R: u32 = 0xffec;
/// `Delete`
pub const DELETE: u32 = 0xffff;

const UNICODE_KEYSYM_OFFSET: u32 = 0x0100_0000;

/// What a key press does to the text buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Remove the last character
    Backspace,
    /// Append printable text
    Insert(String),
    /// Modifier, navigation or other non-printable key
    Ignore,
}

/// Classify a key press
///
/// OS-resolved text wins over the keysym table so shifted and layout-specific
/// characters come through as typed.
#[must_use]
pub fn resolve(event: &RawInputEvent, backspace: u32) -> KeyAction {
    if event.keycode == backspace {
        return KeyAction::Backspace;
    }

    let text = match event.text.as_deref() {
        Some(text) if !text.is_empty() => text.to_owned(),
        _ => keysym_to_char(event.keycode).map(String::from).unwrap_or_default(),
    };

    match text.chars().next() {
        Some(first) if is_printable(first) => KeyAction::Insert(text),
        _ => KeyAction::Ignore,
    }
}

/// Character for a keysym in the Latin-1 or Unicode ranges
#[must_use]
pub fn keysym_to_char(keysym: u32) -> Option<char> {
    match keysym {
        0x20..=0x7e | 0xa0..=0xff => char::from_u32(keysym),
        k if k >= UNICODE_KEYSYM_OFFSET => char::from_u32(k - UNICODE_KEYSYM_OFFSET),
        _ => None,
    }
}

/// Space, letters, marks, numbers, punctuation and symbols
#[must_use]
pub fn is_printable(c: char) -> bool {
    c == ' ' || !(c.is_control() || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backspace_resolves_before_text() {
        let event = RawInputEvent::key_down_with_text(BACKSPACE, "\u{8}");
        assert_eq!(resolve(&event, BACKSPACE), KeyAction::Backspace);
    }

    #[test]
    fn test_configured_backspace_code() {
        let event = RawInputEvent::key_down(22);
        assert_eq!(resolve(&event, 22), KeyAction::Backspace);
        assert_eq!(resolve(&RawInputEvent::key_down(BACKSPACE), 22), KeyAction::Ignore);
    }

    #[test]
    fn test_os_text_is_preferred() {
        let event = RawInputEvent::key_down_with_text(u32::from('a'), "A");
        assert_eq!(resolve(&event, BACKSPACE), KeyAction::Insert("A".to_owned()));
    }

    #[test]
    fn test_keysym_fallback_without_text() {
        let event = RawInputEvent::key_down(u32::from('q'));
        assert_eq!(resolve(&event, BACKSPACE), KeyAction::Insert("q".to_owned()));

        let space = RawInputEvent::key_down(u32::from(' '));
        assert_eq!(resolve(&space, BACKSPACE), KeyAction::Insert(" ".to_owned()));
    }

    #[test]
    fn test_modifiers_and_navigation_are_ignored() {
        for code in [CONTROL_L, SHIFT_L, ALT_L, LEFT, ESCAPE, F1, CAPS_LOCK] {
            assert_eq!(
                resolve(&RawInputEvent::key_down(code), BACKSPACE),
                KeyAction::Ignore,
                "keysym {code:#x}"
            );
        }
    }

    #[test]
    fn test_control_text_is_ignored() {
        let enter = RawInputEvent::key_down_with_text(RETURN, "\r");
        assert_eq!(resolve(&enter, BACKSPACE), KeyAction::Ignore);

        let tab = RawInputEvent::key_down_with_text(TAB, "\t");
        assert_eq!(resolve(&tab, BACKSPACE), KeyAction::Ignore);
    }

    #[test]
    fn test_empty_text_falls_back_to_keysym() {
        let event = RawInputEvent::key_down_with_text(CONTROL_L, "");
        assert_eq!(resolve(&event, BACKSPACE), KeyAction::Ignore);
    }

    #[test]
    fn test_keysym_ranges() {
        assert_eq!(keysym_to_char(0x41), Some('A'));
        assert_eq!(keysym_to_char(0xe9), Some('é'));
        assert_eq!(keysym_to_char(0x0100_20ac), Some('€'));
        assert_eq!(keysym_to_char(0x1f), None);
        assert_eq!(keysym_to_char(CONTROL_L), None);
    }

    #[test]
    fn test_is_printable() {
        assert!(is_printable('a'));
        assert!(is_printable(' '));
        assert!(is_printable('!'));
        assert!(is_printable('ż'));
        assert!(!is_printable('\n'));
        assert!(!is_printable('\u{7f}'));
        assert!(!is_printable('\u{a0}'));
    }
}
