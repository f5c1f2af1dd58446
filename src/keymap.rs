use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::action::PopupAction;
use crate::shortcut::Shortcut;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KeymapProfile {
    #[default]
    Default,
    Vim,
    Arrows,
}

/// Key bindings used while a popup menu is open.
#[derive(Clone, Copy, Debug)]
pub struct PopupKeyBindings {
    profile: KeymapProfile,
}

impl Default for PopupKeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupKeyBindings {
    pub const fn new() -> Self {
        Self {
            profile: KeymapProfile::Default,
        }
    }

    pub const fn with_profile(profile: KeymapProfile) -> Self {
        Self { profile }
    }

    pub const fn profile(&self) -> KeymapProfile {
        self.profile
    }

    pub const fn set_profile(&mut self, profile: KeymapProfile) {
        self.profile = profile;
    }

    /// Resolves a navigation key.
    ///
    /// Keys held with Ctrl, Alt or Super never resolve, so they stay available
    /// for entry shortcuts.
    pub fn resolve(&self, key: KeyEvent) -> Option<PopupAction> {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
        {
            return None;
        }

        let nav_action = match self.profile {
            KeymapProfile::Default => self.resolve_default_nav(key),
            KeymapProfile::Vim => self.resolve_vim_nav(key),
            KeymapProfile::Arrows => self.resolve_arrow_nav(key),
        };
        if nav_action.is_some() {
            return nav_action;
        }

        self.resolve_common(key)
    }

    const fn resolve_default_nav(&self, key: KeyEvent) -> Option<PopupAction> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(PopupAction::SelectPrev),
            KeyCode::Down | KeyCode::Char('j') => Some(PopupAction::SelectNext),
            KeyCode::Left | KeyCode::Char('h') => Some(PopupAction::CloseSubmenu),
            KeyCode::Right | KeyCode::Char('l') => Some(PopupAction::OpenSubmenu),
            _ => None,
        }
    }

    const fn resolve_vim_nav(&self, key: KeyEvent) -> Option<PopupAction> {
        match key.code {
            KeyCode::Char('k') => Some(PopupAction::SelectPrev),
            KeyCode::Char('j') => Some(PopupAction::SelectNext),
            KeyCode::Char('h') => Some(PopupAction::CloseSubmenu),
            KeyCode::Char('l') => Some(PopupAction::OpenSubmenu),
            KeyCode::Char('g') => Some(PopupAction::SelectFirst),
            KeyCode::Char('G') => Some(PopupAction::SelectLast),
            KeyCode::Char('q') => Some(PopupAction::Dismiss),
            _ => None,
        }
    }

    const fn resolve_arrow_nav(&self, key: KeyEvent) -> Option<PopupAction> {
        match key.code {
            KeyCode::Up => Some(PopupAction::SelectPrev),
            KeyCode::Down => Some(PopupAction::SelectNext),
            KeyCode::Left => Some(PopupAction::CloseSubmenu),
            KeyCode::Right => Some(PopupAction::OpenSubmenu),
            _ => None,
        }
    }

    const fn resolve_common(&self, key: KeyEvent) -> Option<PopupAction> {
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => Some(PopupAction::Activate),
            KeyCode::Esc => Some(PopupAction::Dismiss),
            KeyCode::Backspace => Some(PopupAction::CloseSubmenu),
            KeyCode::Home => Some(PopupAction::SelectFirst),
            KeyCode::End => Some(PopupAction::SelectLast),
            _ => None,
        }
    }
}

const RELEVANT_MODIFIERS: KeyModifiers = KeyModifiers::CONTROL
    .union(KeyModifiers::ALT)
    .union(KeyModifiers::SHIFT)
    .union(KeyModifiers::SUPER);

impl Shortcut {
    /// Resolves the accelerator text into a crossterm key.
    ///
    /// Modifier names are case-insensitive (`Ctrl`/`Control`, `Alt`/`Option`,
    /// `Shift`, `Meta`/`Cmd`/`Super`). Returns `None` for text that names no key.
    pub fn key_binding(&self) -> Option<(KeyCode, KeyModifiers)> {
        let text = self.as_str();
        let (modifier_text, key_text) = if let Some(rest) = text.strip_suffix("++") {
            (rest, "+")
        } else if text == "+" {
            ("", "+")
        } else {
            text.rsplit_once('+').unwrap_or(("", text))
        };

        let mut modifiers = KeyModifiers::NONE;
        for name in modifier_text.split('+').map(str::trim) {
            if name.is_empty() {
                continue;
            }
            modifiers |= match name.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "alt" | "option" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                "meta" | "cmd" | "super" => KeyModifiers::SUPER,
                _ => return None,
            };
        }

        let code = parse_key(key_text.trim())?;
        let code = match code {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };
        Some(without_symbol_shift(code, modifiers))
    }

    /// Returns `true` if `key` presses this shortcut.
    ///
    /// Letters match case-insensitively; an uppercase letter in the event counts
    /// as Shift.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        self.key_binding() == Some(event_binding(key))
    }
}

fn parse_key(text: &str) -> Option<KeyCode> {
    let mut chars = text.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }

    let lower = text.to_ascii_lowercase();
    let code = match lower.as_str() {
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "del" | "delete" => KeyCode::Delete,
        "ins" | "insert" => KeyCode::Insert,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pgup" | "pageup" => KeyCode::PageUp,
        "pgdown" | "pagedown" => KeyCode::PageDown,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "space" => KeyCode::Char(' '),
        _ => {
            let number = lower.strip_prefix('f')?.parse::<u8>().ok()?;
            if !(1..=24).contains(&number) {
                return None;
            }
            KeyCode::F(number)
        }
    };
    Some(code)
}

fn event_binding(key: &KeyEvent) -> (KeyCode, KeyModifiers) {
    let mut modifiers = key.modifiers & RELEVANT_MODIFIERS;
    let code = match key.code {
        KeyCode::Char(c) if c.is_ascii_uppercase() => {
            modifiers |= KeyModifiers::SHIFT;
            KeyCode::Char(c.to_ascii_lowercase())
        }
        other => other,
    };
    without_symbol_shift(code, modifiers)
}

// Terminals disagree on whether symbols like `?` carry Shift.
fn without_symbol_shift(code: KeyCode, mut modifiers: KeyModifiers) -> (KeyCode, KeyModifiers) {
    if let KeyCode::Char(c) = code
        && !c.is_ascii_alphabetic()
    {
        modifiers.remove(KeyModifiers::SHIFT);
    }
    (code, modifiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn parses_modifiers_and_keys() {
        assert_eq!(
            Shortcut::from("Ctrl+S").key_binding(),
            Some((KeyCode::Char('s'), KeyModifiers::CONTROL))
        );
        assert_eq!(
            Shortcut::from("control+shift+F5").key_binding(),
            Some((KeyCode::F(5), KeyModifiers::CONTROL | KeyModifiers::SHIFT))
        );
        assert_eq!(
            Shortcut::from("Ctrl++").key_binding(),
            Some((KeyCode::Char('+'), KeyModifiers::CONTROL))
        );
        assert_eq!(
            Shortcut::from("Alt+Space").key_binding(),
            Some((KeyCode::Char(' '), KeyModifiers::ALT))
        );
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        assert_eq!(Shortcut::from("Hyper+S").key_binding(), None);
        assert_eq!(Shortcut::from("Ctrl+Banana").key_binding(), None);
        assert_eq!(Shortcut::from("F30").key_binding(), None);
        assert_eq!(Shortcut::from("").key_binding(), None);
    }

    #[test]
    fn matches_key_events() {
        let save = Shortcut::from("Ctrl+S");
        assert!(save.matches(&key(KeyCode::Char('s'), KeyModifiers::CONTROL)));
        assert!(!save.matches(&key(KeyCode::Char('s'), KeyModifiers::NONE)));
        assert!(!save.matches(&key(
            KeyCode::Char('S'),
            KeyModifiers::CONTROL | KeyModifiers::SHIFT
        )));

        let save_as = Shortcut::from("Ctrl+Shift+S");
        assert!(save_as.matches(&key(KeyCode::Char('S'), KeyModifiers::CONTROL)));

        let help = Shortcut::from("?");
        assert!(help.matches(&key(KeyCode::Char('?'), KeyModifiers::SHIFT)));
    }

    #[test]
    fn navigation_ignores_modified_keys() {
        let bindings = PopupKeyBindings::new();
        assert_eq!(
            bindings.resolve(key(KeyCode::Char('j'), KeyModifiers::NONE)),
            Some(PopupAction::SelectNext)
        );
        assert_eq!(
            bindings.resolve(key(KeyCode::Char('j'), KeyModifiers::CONTROL)),
            None
        );
        assert_eq!(
            bindings.resolve(key(KeyCode::Esc, KeyModifiers::NONE)),
            Some(PopupAction::Dismiss)
        );
    }

    #[test]
    fn arrow_profile_leaves_letters_free() {
        let bindings = PopupKeyBindings::with_profile(KeymapProfile::Arrows);
        assert_eq!(
            bindings.resolve(key(KeyCode::Char('j'), KeyModifiers::NONE)),
            None
        );
        assert_eq!(
            bindings.resolve(key(KeyCode::Right, KeyModifiers::NONE)),
            Some(PopupAction::OpenSubmenu)
        );
    }
}
