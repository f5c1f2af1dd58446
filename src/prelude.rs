pub use crate::{
    ActionDecl, ContextMenuPolicy, Dismiss, Menu, MenuAction, MenuBar, MenuEntry, MenuError,
    MenuEvent, MenuGlyphs, MenuTree, MenuTreeConfig, Point, PopupAction, PopupMenu,
    PopupMenuState, PopupMenuStyle, Presenter, Priority, Retained, RetainedAction, RetainedMenu,
    RetainedMenuBar, RetainedWidget, Shortcut, ShortcutScope, Toolkit, Widget,
};

#[cfg(feature = "keymap")]
pub use crate::{KeymapProfile, PopupKeyBindings};
