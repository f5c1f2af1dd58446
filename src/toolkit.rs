use std::hash::Hash;
use std::rc::Rc;

use ratatui::layout::Position;

use crate::shortcut::{Shortcut, ShortcutScope};

/// Screen coordinate in toolkit units (cells for the terminal renderer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offsets the point by `origin`.
    #[must_use]
    pub const fn offset(self, origin: Self) -> Self {
        Self {
            x: self.x.saturating_add(origin.x),
            y: self.y.saturating_add(origin.y),
        }
    }
}

/// Saturates negative or oversized coordinates into terminal cells.
impl From<Point> for Position {
    fn from(point: Point) -> Self {
        let clamp = |value: i32| u16::try_from(value.max(0)).unwrap_or(u16::MAX);
        Self::new(clamp(point.x), clamp(point.y))
    }
}

impl From<Position> for Point {
    fn from(position: Position) -> Self {
        Self::new(i32::from(position.x), i32::from(position.y))
    }
}

/// How a widget reacts to a context-menu request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContextMenuPolicy {
    /// Toolkit default behaviour.
    #[default]
    Default,
    /// Context-menu requests are ignored.
    None,
    /// Requests are emitted to connected handlers.
    Custom,
}

/// Handler for context-menu requests, called with the widget-local point.
pub type ContextMenuHandler = Rc<dyn Fn(Point)>;

/// Handler for action activation.
pub type TriggerHandler = Rc<dyn Fn()>;

/// A labelled, triggerable command.
pub trait MenuAction: Clone + PartialEq {
    fn label(&self) -> String;

    fn shortcut(&self) -> Option<Shortcut>;

    fn set_shortcut(&self, shortcut: Shortcut, scope: ShortcutScope);

    fn connect_triggered(&self, handler: TriggerHandler);
}

/// A popup menu that holds actions, submenus and separators.
pub trait Menu: Clone {
    type Action: MenuAction;

    fn title(&self) -> String;

    /// Removes every entry.
    fn clear(&self);

    /// Appends a submenu titled `title` and returns it.
    fn add_menu(&self, title: &str) -> Self;

    /// Appends an action labelled `label` and returns it.
    fn add_action(&self, label: &str) -> Self::Action;

    /// Inserts a separator before `before`.
    fn insert_separator(&self, before: &Self::Action);

    /// Shows the menu at global position `at` and blocks until it closes.
    fn popup(&self, at: Point);
}

/// A window menu bar.
pub trait MenuBar {
    type Id: Copy + Eq + Hash + 'static;
    type Menu: Menu;

    fn id(&self) -> Self::Id;

    fn add_menu(&self, menu: &Self::Menu);

    fn remove_menu(&self, menu: &Self::Menu);
}

/// A widget able to host a context menu and shortcut actions.
pub trait Widget: Clone {
    type Id: Copy + Eq + Hash + 'static;
    type Action: MenuAction;
    type Connection;

    fn id(&self) -> Self::Id;

    /// Returns `false` once the widget can no longer host menus.
    fn is_alive(&self) -> bool {
        true
    }

    /// Maps a widget-local point to global coordinates.
    fn map_to_global(&self, point: Point) -> Point;

    fn set_context_menu_policy(&self, policy: ContextMenuPolicy);

    /// Returns the actions currently bound on the widget.
    fn actions(&self) -> Vec<Self::Action>;

    fn add_action(&self, action: &Self::Action);

    fn remove_action(&self, action: &Self::Action);

    fn connect_context_menu_requested(&self, handler: ContextMenuHandler) -> Self::Connection;

    fn disconnect_context_menu_requested(&self, connection: Self::Connection);
}

/// Bundle of the concrete types a menu tree drives.
pub trait Toolkit: 'static {
    type Action: MenuAction + 'static;
    type Menu: Menu<Action = Self::Action> + 'static;
    type MenuBar: MenuBar<Menu = Self::Menu>;
    type Widget: Widget<Action = Self::Action> + 'static;

    /// Creates an empty top-level menu.
    fn root_menu(&self) -> Self::Menu;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_and_cell_conversion() {
        let global = Point::new(3, 4).offset(Point::new(100, 50));
        assert_eq!(global, Point::new(103, 54));

        assert_eq!(Position::from(Point::new(-5, 70_000)), Position::new(0, u16::MAX));
        assert_eq!(Point::from(Position::new(7, 9)), Point::new(7, 9));
    }
}
