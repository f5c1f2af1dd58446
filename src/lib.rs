//! Declarative context-menu trees: hierarchical, shortcut-bound, conditionally
//! visible actions attached to any number of widgets, with a ratatui popup renderer.
//!
//! Feature flags:
//! - `keymap`: crossterm-based popup key bindings, `Shortcut::matches` and
//!   `RetainedWidget::dispatch_key`.

mod action;
mod declaration;
mod error;
mod glyphs;
#[cfg(feature = "keymap")]
mod keymap;
mod path;
pub mod prelude;
mod registry;
mod retained;
mod shortcut;
mod state;
mod style;
mod toolkit;
mod tree;
mod widget;

pub use action::{MenuEvent, PopupAction};
pub use declaration::{ActionCallback, ActionDecl, ActionSpec, BoxError, Priority, Validator};
pub use error::MenuError;
pub use glyphs::MenuGlyphs;
#[cfg(feature = "keymap")]
pub use keymap::{KeymapProfile, PopupKeyBindings};
pub use path::ActionPath;
pub use registry::MenuRegistry;
pub use retained::{
    Dismiss, MenuEntry, Presenter, Retained, RetainedAction, RetainedMenu, RetainedMenuBar,
    RetainedWidget,
};
pub use shortcut::{Shortcut, ShortcutScope};
pub use state::PopupMenuState;
pub use style::PopupMenuStyle;
pub use toolkit::{
    ContextMenuHandler, ContextMenuPolicy, Menu, MenuAction, MenuBar, Point, Toolkit,
    TriggerHandler, Widget,
};
pub use tree::{ActionBuilder, MenuTree, MenuTreeConfig};
pub use widget::PopupMenu;
