//! Translation of a key press into the byte sequence tmux expects under
//! `send-keys -l`.
//!
//! Expressed against `winit`'s `Key`/`ModifiersState` — the windowing
//! crate already present in this stack for this exact purpose — so a
//! `winit`-based front end can pass its event straight through. A front
//! end on a different toolkit only needs to construct the equivalent
//! `Key`/`ModifiersState` pair.

use winit::keyboard::{Key, ModifiersState, NamedKey};

fn esc(seq: &str) -> String {
    format!("\u{1b}{seq}")
}

/// Translate a single key press to the literal bytes to send via
/// `send-keys -l`, or `None` if the event doesn't map to anything (the
/// caller should fall back to whatever default handling it has, or drop
/// the event).
///
/// Ctrl held on an arrow key rewrites the escape sequence to
/// `ESC [1;5<letter>`. Alt (Mod1) held alone prefixes the whole result
/// with another `ESC`; Alt held together with Ctrl or Shift swallows the
/// event (matches a GTK quirk in the control-mode source this is ported
/// from). A literal `;` is escaped to `\;` so tmux's command parser
/// doesn't split on it.
pub fn translate_keypress(key: &Key, modifiers: ModifiersState) -> Option<String> {
    let is_arrow = matches!(
        key,
        Key::Named(NamedKey::ArrowUp | NamedKey::ArrowDown | NamedKey::ArrowLeft | NamedKey::ArrowRight)
    );

    let mut out = match key {
        Key::Named(NamedKey::Backspace) => "\u{8}".to_string(),
        Key::Named(NamedKey::Tab) => "\t".to_string(),
        Key::Named(NamedKey::Insert) => esc("[2~"),
        Key::Named(NamedKey::Delete) => esc("[3~"),
        Key::Named(NamedKey::PageUp) => esc("[5~"),
        Key::Named(NamedKey::PageDown) => esc("[6~"),
        Key::Named(NamedKey::Home) => esc("OH"),
        Key::Named(NamedKey::End) => esc("OF"),
        Key::Named(NamedKey::ArrowUp) => esc("[A"),
        Key::Named(NamedKey::ArrowDown) => esc("[B"),
        Key::Named(NamedKey::ArrowRight) => esc("[C"),
        Key::Named(NamedKey::ArrowLeft) => esc("[D"),
        Key::Character(s) => s.to_string(),
        _ => return None,
    };

    if is_arrow && modifiers.control_key() {
        let letter = out.chars().last()?;
        out = esc(&format!("[1;5{letter}"));
    }

    if modifiers.alt_key() {
        if modifiers.control_key() || modifiers.shift_key() {
            return None;
        }
        out = esc(&out);
    }

    if out == ";" {
        out = "\\;".to_string();
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_character_passes_through() {
        let key = Key::Character("a".into());
        assert_eq!(translate_keypress(&key, ModifiersState::empty()), Some("a".to_string()));
    }

    #[test]
    fn backspace_maps_to_bel() {
        let key = Key::Named(NamedKey::Backspace);
        assert_eq!(translate_keypress(&key, ModifiersState::empty()), Some("\u{8}".to_string()));
    }

    #[test]
    fn ctrl_left_arrow() {
        let key = Key::Named(NamedKey::ArrowLeft);
        let mods = ModifiersState::CONTROL;
        assert_eq!(translate_keypress(&key, mods), Some("\u{1b}[1;5D".to_string()));
    }

    #[test]
    fn alt_left_arrow_wraps_in_escape() {
        let key = Key::Named(NamedKey::ArrowLeft);
        let mods = ModifiersState::ALT;
        assert_eq!(translate_keypress(&key, mods), Some("\u{1b}\u{1b}[D".to_string()));
    }

    #[test]
    fn alt_ctrl_is_swallowed() {
        let key = Key::Character("x".into());
        let mods = ModifiersState::ALT | ModifiersState::CONTROL;
        assert_eq!(translate_keypress(&key, mods), None);
    }

    #[test]
    fn alt_shift_is_swallowed() {
        let key = Key::Named(NamedKey::ArrowUp);
        let mods = ModifiersState::ALT | ModifiersState::SHIFT;
        assert_eq!(translate_keypress(&key, mods), None);
    }

    #[test]
    fn semicolon_is_escaped() {
        let key = Key::Character(";".into());
        assert_eq!(translate_keypress(&key, ModifiersState::empty()), Some("\\;".to_string()));
    }

    #[test]
    fn plain_arrow_without_modifiers() {
        let key = Key::Named(NamedKey::ArrowUp);
        assert_eq!(translate_keypress(&key, ModifiersState::empty()), Some("\u{1b}[A".to_string()));
    }
}
