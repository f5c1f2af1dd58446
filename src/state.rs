use ratatui::layout::{Position, Rect};
use ratatui::widgets::TableState;
use smallvec::SmallVec;

use crate::action::{MenuEvent, PopupAction};
use crate::retained::{MenuEntry, RetainedMenu};
use crate::toolkit::Menu;

#[cfg(feature = "keymap")]
use crate::keymap::PopupKeyBindings;
#[cfg(feature = "keymap")]
use crate::toolkit::MenuAction;
#[cfg(feature = "keymap")]
use crossterm::event::KeyEvent;

/// One open menu level: a snapshot of its entries plus selection.
pub(crate) struct MenuPanel {
    pub(crate) title: String,
    pub(crate) entries: Vec<MenuEntry>,
    pub(crate) table: TableState,
    // Screen areas from the last render, used for hit-testing.
    pub(crate) area: Rect,
    pub(crate) rows_area: Rect,
}

impl MenuPanel {
    fn new(menu: &RetainedMenu) -> Self {
        let mut panel = Self {
            title: menu.title(),
            entries: menu.entries(),
            table: TableState::default(),
            area: Rect::default(),
            rows_area: Rect::default(),
        };
        panel.table.select(panel.first_selectable());
        panel
    }

    fn is_selectable(&self, idx: usize) -> bool {
        self.entries
            .get(idx)
            .is_some_and(|entry| !matches!(entry, MenuEntry::Separator))
    }

    fn first_selectable(&self) -> Option<usize> {
        (0..self.entries.len()).find(|&idx| self.is_selectable(idx))
    }

    fn last_selectable(&self) -> Option<usize> {
        (0..self.entries.len()).rev().find(|&idx| self.is_selectable(idx))
    }

    fn selected_entry(&self) -> Option<&MenuEntry> {
        self.table.selected().and_then(|idx| self.entries.get(idx))
    }

    fn select_prev(&mut self) {
        let Some(selected) = self.table.selected() else {
            self.table.select(self.last_selectable());
            return;
        };
        if let Some(idx) = (0..selected).rev().find(|&idx| self.is_selectable(idx)) {
            self.table.select(Some(idx));
        }
    }

    fn select_next(&mut self) {
        let Some(selected) = self.table.selected() else {
            self.table.select(self.first_selectable());
            return;
        };
        if let Some(idx) = (selected + 1..self.entries.len()).find(|&idx| self.is_selectable(idx)) {
            self.table.select(Some(idx));
        }
    }

    /// Maps a screen row to an entry index using the last rendered layout.
    fn entry_at(&self, position: Position) -> Option<usize> {
        if !self.rows_area.contains(position) {
            return None;
        }
        let idx = usize::from(position.y - self.rows_area.y) + self.table.offset();
        self.is_selectable(idx).then_some(idx)
    }
}

/// Popup state: the anchor and the stack of open panels, outermost first.
pub struct PopupMenuState {
    anchor: Position,
    panels: SmallVec<[MenuPanel; 4]>,
    #[cfg(feature = "keymap")]
    keymap: PopupKeyBindings,
}

impl Default for PopupMenuState {
    fn default() -> Self {
        Self::new()
    }
}

impl PopupMenuState {
    /// Creates a closed popup.
    pub fn new() -> Self {
        Self {
            anchor: Position::default(),
            panels: SmallVec::new(),
            #[cfg(feature = "keymap")]
            keymap: PopupKeyBindings::new(),
        }
    }

    #[cfg(feature = "keymap")]
    /// Returns a mutable reference to the key binding set.
    pub const fn keymap_mut(&mut self) -> &mut PopupKeyBindings {
        &mut self.keymap
    }

    /// Opens `menu` with its top-left corner at `anchor`, replacing any open panels.
    pub fn open(&mut self, menu: &RetainedMenu, anchor: Position) {
        self.anchor = anchor;
        self.panels.clear();
        self.panels.push(MenuPanel::new(menu));
    }

    pub fn close(&mut self) {
        self.panels.clear();
    }

    pub fn is_open(&self) -> bool {
        !self.panels.is_empty()
    }

    pub const fn anchor(&self) -> Position {
        self.anchor
    }

    /// Returns the number of open panels (0 when closed).
    pub fn depth(&self) -> usize {
        self.panels.len()
    }

    pub(crate) fn panels_mut(&mut self) -> &mut [MenuPanel] {
        &mut self.panels
    }

    /// Returns the selected entry of the innermost panel.
    pub fn selected_entry(&self) -> Option<&MenuEntry> {
        self.panels.last().and_then(MenuPanel::selected_entry)
    }

    /// Returns the title of the innermost panel; the root menu has an empty title.
    pub fn active_title(&self) -> Option<&str> {
        self.panels.last().map(|panel| panel.title.as_str())
    }

    pub fn select_prev(&mut self) {
        if let Some(panel) = self.panels.last_mut() {
            panel.select_prev();
        }
    }

    pub fn select_next(&mut self) {
        if let Some(panel) = self.panels.last_mut() {
            panel.select_next();
        }
    }

    pub fn select_first(&mut self) {
        if let Some(panel) = self.panels.last_mut() {
            panel.table.select(panel.first_selectable());
        }
    }

    pub fn select_last(&mut self) {
        if let Some(panel) = self.panels.last_mut() {
            panel.table.select(panel.last_selectable());
        }
    }

    /// Opens the selected submenu as a new panel.
    pub fn open_submenu(&mut self) -> bool {
        let Some(MenuEntry::Menu(submenu)) = self.selected_entry() else {
            return false;
        };
        let panel = MenuPanel::new(submenu);
        self.panels.push(panel);
        true
    }

    /// Closes the innermost submenu panel; the root panel stays open.
    pub fn close_submenu(&mut self) -> bool {
        if self.panels.len() > 1 {
            self.panels.pop();
            true
        } else {
            false
        }
    }

    pub fn handle_action(&mut self, action: PopupAction) -> MenuEvent {
        if !self.is_open() {
            return MenuEvent::Unhandled;
        }

        match action {
            PopupAction::SelectPrev => {
                self.select_prev();
                MenuEvent::Handled
            }
            PopupAction::SelectNext => {
                self.select_next();
                MenuEvent::Handled
            }
            PopupAction::SelectFirst => {
                self.select_first();
                MenuEvent::Handled
            }
            PopupAction::SelectLast => {
                self.select_last();
                MenuEvent::Handled
            }
            PopupAction::OpenSubmenu => {
                if self.open_submenu() {
                    MenuEvent::Handled
                } else {
                    MenuEvent::Unhandled
                }
            }
            PopupAction::CloseSubmenu => {
                if self.close_submenu() {
                    MenuEvent::Handled
                } else {
                    MenuEvent::Unhandled
                }
            }
            PopupAction::Activate => match self.selected_entry().cloned() {
                Some(MenuEntry::Action(action)) => {
                    self.close();
                    MenuEvent::Activated(action)
                }
                Some(MenuEntry::Menu(_)) => {
                    self.open_submenu();
                    MenuEvent::Handled
                }
                Some(MenuEntry::Separator) | None => MenuEvent::Unhandled,
            },
            PopupAction::Dismiss => {
                self.close();
                MenuEvent::Dismissed
            }
        }
    }

    #[cfg(feature = "keymap")]
    /// Resolves a key event and handles it.
    ///
    /// Navigation bindings win; otherwise a key matching the shortcut of an
    /// entry in the innermost panel activates that entry.
    pub fn handle_key(&mut self, key: KeyEvent) -> MenuEvent {
        if !self.is_open() {
            return MenuEvent::Unhandled;
        }
        if let Some(action) = self.keymap.resolve(key) {
            return self.handle_action(action);
        }

        let chosen = self.panels.last().and_then(|panel| {
            panel.entries.iter().find_map(|entry| match entry {
                MenuEntry::Action(action)
                    if action.shortcut().is_some_and(|shortcut| shortcut.matches(&key)) =>
                {
                    Some(action.clone())
                }
                _ => None,
            })
        });
        match chosen {
            Some(action) => {
                self.close();
                MenuEvent::Activated(action)
            }
            None => MenuEvent::Unhandled,
        }
    }

    /// Handles a mouse click at `position` using the last rendered layout.
    ///
    /// Clicking an entry selects and activates it, clicking inside a panel
    /// elsewhere only closes deeper panels, and clicking outside every panel
    /// dismisses the popup.
    pub fn handle_click(&mut self, position: Position) -> MenuEvent {
        if !self.is_open() {
            return MenuEvent::Unhandled;
        }
        let Some(depth) = self
            .panels
            .iter()
            .rposition(|panel| panel.area.contains(position))
        else {
            self.close();
            return MenuEvent::Dismissed;
        };

        self.panels.truncate(depth + 1);
        let panel = &mut self.panels[depth];
        match panel.entry_at(position) {
            Some(idx) => {
                panel.table.select(Some(idx));
                self.handle_action(PopupAction::Activate)
            }
            None => MenuEvent::Handled,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::retained::Retained;
    use crate::shortcut::{Shortcut, ShortcutScope};
    use crate::toolkit::{MenuAction, Toolkit};

    fn sample_menu() -> RetainedMenu {
        let root = Retained::new().root_menu();
        let vcs = root.add_menu("Version Control");
        vcs.add_action("Download");
        vcs.add_action("Check Out");
        let submit = root.add_action("Submit");
        root.insert_separator(&submit);
        root.add_action("Refresh")
            .set_shortcut(Shortcut::from("F5"), ShortcutScope::Widget);
        root
    }

    fn selected_label(state: &PopupMenuState) -> Option<String> {
        match state.selected_entry()? {
            MenuEntry::Action(action) => Some(action.label()),
            MenuEntry::Menu(menu) => Some(menu.title()),
            MenuEntry::Separator => None,
        }
    }

    #[test]
    fn selection_skips_separators() {
        let mut state = PopupMenuState::new();
        state.open(&sample_menu(), Position::new(2, 3));
        assert_eq!(selected_label(&state).as_deref(), Some("Version Control"));

        state.select_next();
        assert_eq!(selected_label(&state).as_deref(), Some("Submit"));

        state.select_prev();
        assert_eq!(selected_label(&state).as_deref(), Some("Version Control"));

        state.select_prev();
        assert_eq!(selected_label(&state).as_deref(), Some("Version Control"));

        state.select_last();
        assert_eq!(selected_label(&state).as_deref(), Some("Refresh"));
    }

    #[test]
    fn submenus_stack_and_unwind() {
        let mut state = PopupMenuState::new();
        state.open(&sample_menu(), Position::default());

        assert_eq!(state.handle_action(PopupAction::Activate), MenuEvent::Handled);
        assert_eq!(state.depth(), 2);
        assert_eq!(state.active_title(), Some("Version Control"));
        assert_eq!(selected_label(&state).as_deref(), Some("Download"));

        assert_eq!(
            state.handle_action(PopupAction::CloseSubmenu),
            MenuEvent::Handled
        );
        assert_eq!(
            state.handle_action(PopupAction::CloseSubmenu),
            MenuEvent::Unhandled
        );
        assert_eq!(state.depth(), 1);
    }

    #[test]
    fn activation_closes_and_reports_action() {
        let menu = sample_menu();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        menu.find_action("Version Control/Check Out")
            .unwrap()
            .connect_triggered(Rc::new(move || flag.set(true)));

        let mut state = PopupMenuState::new();
        state.open(&menu, Position::default());
        state.handle_action(PopupAction::OpenSubmenu);
        state.handle_action(PopupAction::SelectNext);

        let MenuEvent::Activated(action) = state.handle_action(PopupAction::Activate) else {
            panic!("expected an activated action");
        };
        assert!(!state.is_open());
        assert_eq!(action.label(), "Check Out");

        action.trigger();
        assert!(fired.get());
    }

    #[test]
    fn dismiss_closes_popup() {
        let mut state = PopupMenuState::new();
        assert_eq!(
            state.handle_action(PopupAction::Dismiss),
            MenuEvent::Unhandled
        );

        state.open(&sample_menu(), Position::default());
        assert_eq!(
            state.handle_action(PopupAction::Dismiss),
            MenuEvent::Dismissed
        );
        assert!(!state.is_open());
    }

    #[test]
    fn click_outside_dismisses() {
        let mut state = PopupMenuState::new();
        state.open(&sample_menu(), Position::default());
        state.panels_mut()[0].area = Rect::new(0, 0, 20, 6);
        state.panels_mut()[0].rows_area = Rect::new(1, 1, 18, 4);

        assert_eq!(state.handle_click(Position::new(5, 2)), MenuEvent::Handled);
        assert!(state.is_open());

        let MenuEvent::Activated(action) = state.handle_click(Position::new(5, 3)) else {
            panic!("expected an activated action");
        };
        assert_eq!(action.label(), "Submit");

        state.open(&sample_menu(), Position::default());
        assert_eq!(
            state.handle_click(Position::new(40, 20)),
            MenuEvent::Dismissed
        );
    }

    #[cfg(feature = "keymap")]
    #[test]
    fn entry_shortcut_activates_from_keyboard() {
        use crossterm::event::{KeyCode, KeyModifiers};

        let mut state = PopupMenuState::new();
        state.open(&sample_menu(), Position::default());

        let event = state.handle_key(KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE));
        assert!(matches!(event, MenuEvent::Activated(ref action) if action.label() == "Refresh"));

        state.open(&sample_menu(), Position::default());
        assert_eq!(
            state.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE)),
            MenuEvent::Handled
        );
        assert_eq!(selected_label(&state).as_deref(), Some("Submit"));
    }
}
