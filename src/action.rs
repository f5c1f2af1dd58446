use crate::retained::RetainedAction;

/// Navigation and activation commands understood by an open popup menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupAction {
    /// Move selection to the previous entry, skipping separators.
    SelectPrev,
    /// Move selection to the next entry, skipping separators.
    SelectNext,
    /// Select the first entry of the active panel.
    SelectFirst,
    /// Select the last entry of the active panel.
    SelectLast,
    /// Open the selected submenu as a new panel.
    OpenSubmenu,
    /// Close the active submenu panel and return to its parent.
    CloseSubmenu,
    /// Trigger the selected action, or open the selected submenu.
    Activate,
    /// Close the whole popup without a choice.
    Dismiss,
}

/// Result of handling an action or key event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuEvent {
    /// The popup state changed (selection moved, a panel opened or closed).
    Handled,
    /// Nothing to do (e.g. no panel is open or the key is unbound).
    Unhandled,
    /// An action was chosen; the popup has been closed.
    Activated(RetainedAction),
    /// The popup was dismissed without a choice.
    Dismissed,
}
