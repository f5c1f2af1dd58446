use std::fmt;

/// Keyboard accelerator text such as `"Ctrl+S"`.
///
/// Shortcuts compare by their exact (trimmed) text; no platform normalization
/// is applied. With the `keymap` feature the text can also be resolved into a
/// crossterm key (see `Shortcut::key_binding`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shortcut(String);

impl Shortcut {
    /// Creates a shortcut from accelerator text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into().trim().to_owned())
    }

    /// Returns the accelerator text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no accelerator text was given.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Shortcut {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Shortcut {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Region of the UI in which a bound shortcut is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShortcutScope {
    /// Only while the widget itself has focus.
    Widget,
    /// While the widget or any of its descendants has focus.
    #[default]
    WidgetWithChildren,
    /// While the widget's window is active.
    Window,
    /// Anywhere in the application.
    Application,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_accelerator_text() {
        assert_eq!(Shortcut::from("  Ctrl+S "), Shortcut::from("Ctrl+S"));
        assert!(Shortcut::from("   ").is_empty());
    }

    #[test]
    fn compares_exact_text() {
        assert_ne!(Shortcut::from("Ctrl+S"), Shortcut::from("ctrl+s"));
    }
}
