//! In-memory toolkit: menus, actions, widgets and menu bars as shared handles.
//!
//! Nothing is drawn here. Showing a menu is delegated to a [`Presenter`], which
//! picks the action to trigger (a terminal loop around [`PopupMenu`](crate::PopupMenu),
//! or a scripted closure in tests).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::shortcut::{Shortcut, ShortcutScope};
use crate::toolkit::{
    ContextMenuHandler, ContextMenuPolicy, Menu, MenuAction, MenuBar, Point, Toolkit,
    TriggerHandler, Widget,
};

#[cfg(feature = "keymap")]
use crossterm::event::KeyEvent;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Shows a menu and returns the action the user picked.
pub trait Presenter {
    fn present(&mut self, menu: &RetainedMenu, at: Point) -> Option<RetainedAction>;
}

impl<F> Presenter for F
where
    F: FnMut(&RetainedMenu, Point) -> Option<RetainedAction>,
{
    #[inline]
    fn present(&mut self, menu: &RetainedMenu, at: Point) -> Option<RetainedAction> {
        self(menu, at)
    }
}

/// Presenter that closes every menu without a choice.
#[derive(Clone, Copy, Debug, Default)]
pub struct Dismiss;

impl Presenter for Dismiss {
    #[inline]
    fn present(&mut self, _menu: &RetainedMenu, _at: Point) -> Option<RetainedAction> {
        None
    }
}

type SharedPresenter = Rc<RefCell<dyn Presenter>>;

/// Toolkit whose menus all share one presenter.
#[derive(Clone)]
pub struct Retained {
    presenter: SharedPresenter,
}

impl Retained {
    pub fn new() -> Self {
        Self::with_presenter(Dismiss)
    }

    pub fn with_presenter<P: Presenter + 'static>(presenter: P) -> Self {
        Self {
            presenter: Rc::new(RefCell::new(presenter)),
        }
    }
}

impl Default for Retained {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Retained {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retained").finish_non_exhaustive()
    }
}

impl Toolkit for Retained {
    type Action = RetainedAction;
    type Menu = RetainedMenu;
    type MenuBar = RetainedMenuBar;
    type Widget = RetainedWidget;

    fn root_menu(&self) -> RetainedMenu {
        RetainedMenu::new(String::new(), Rc::clone(&self.presenter))
    }
}

/// One row of a [`RetainedMenu`].
#[derive(Clone, Debug)]
pub enum MenuEntry {
    Action(RetainedAction),
    Menu(RetainedMenu),
    Separator,
}

struct MenuNode {
    title: String,
    entries: RefCell<Vec<MenuEntry>>,
    presenter: SharedPresenter,
}

/// Shared handle to a menu; clones refer to the same menu.
#[derive(Clone)]
pub struct RetainedMenu(Rc<MenuNode>);

impl RetainedMenu {
    fn new(title: String, presenter: SharedPresenter) -> Self {
        Self(Rc::new(MenuNode {
            title,
            entries: RefCell::new(Vec::new()),
            presenter,
        }))
    }

    /// Returns a snapshot of the entries in display order.
    pub fn entries(&self) -> Vec<MenuEntry> {
        self.0.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.entries.borrow().is_empty()
    }

    /// Returns the direct submenu titled `title`.
    pub fn submenu(&self, title: &str) -> Option<Self> {
        self.0.entries.borrow().iter().find_map(|entry| match entry {
            MenuEntry::Menu(menu) if menu.0.title == title => Some(menu.clone()),
            _ => None,
        })
    }

    /// Looks up an action by its slash-delimited path below this menu.
    pub fn find_action(&self, path: &str) -> Option<RetainedAction> {
        let (parents, leaf) = match path.rsplit_once('/') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };
        let mut menu = self.clone();
        for title in parents.into_iter().flat_map(|parents| parents.split('/')) {
            menu = menu.submenu(title)?;
        }
        let entries = menu.0.entries.borrow();
        entries.iter().find_map(|entry| match entry {
            MenuEntry::Action(action) if action.0.label == leaf => Some(action.clone()),
            _ => None,
        })
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for entry in self.0.entries.borrow().iter() {
            write!(f, "{:indent$}", "", indent = depth * 2)?;
            match entry {
                MenuEntry::Action(action) => match action.shortcut() {
                    Some(shortcut) => writeln!(f, "{} [{shortcut}]", action.0.label)?,
                    None => writeln!(f, "{}", action.0.label)?,
                },
                MenuEntry::Menu(menu) => {
                    writeln!(f, "{}/", menu.0.title)?;
                    menu.write_outline(f, depth + 1)?;
                }
                MenuEntry::Separator => writeln!(f, "---")?,
            }
        }
        Ok(())
    }
}

/// Indented outline, one entry per line: `Title/` for submenus, `---` for
/// separators and `Label [Shortcut]` for actions.
impl fmt::Display for RetainedMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0)
    }
}

impl fmt::Debug for RetainedMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetainedMenu")
            .field("title", &self.0.title)
            .field("entries", &self.0.entries.borrow().len())
            .finish()
    }
}

impl PartialEq for RetainedMenu {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for RetainedMenu {}

impl Menu for RetainedMenu {
    type Action = RetainedAction;

    fn title(&self) -> String {
        self.0.title.clone()
    }

    fn clear(&self) {
        self.0.entries.borrow_mut().clear();
    }

    fn add_menu(&self, title: &str) -> Self {
        let menu = Self::new(title.to_owned(), Rc::clone(&self.0.presenter));
        self.0
            .entries
            .borrow_mut()
            .push(MenuEntry::Menu(menu.clone()));
        menu
    }

    fn add_action(&self, label: &str) -> RetainedAction {
        let action = RetainedAction::new(label);
        self.0
            .entries
            .borrow_mut()
            .push(MenuEntry::Action(action.clone()));
        action
    }

    fn insert_separator(&self, before: &RetainedAction) {
        let mut entries = self.0.entries.borrow_mut();
        let position = entries
            .iter()
            .position(|entry| matches!(entry, MenuEntry::Action(action) if action == before));
        match position {
            Some(idx) => entries.insert(idx, MenuEntry::Separator),
            None => entries.push(MenuEntry::Separator),
        }
    }

    fn popup(&self, at: Point) {
        let chosen = match self.0.presenter.try_borrow_mut() {
            Ok(mut presenter) => presenter.present(self, at),
            Err(_) => {
                tracing::warn!(
                    menu = %self.0.title,
                    x = at.x,
                    y = at.y,
                    "a menu is already being presented; ignoring nested popup"
                );
                return;
            }
        };
        if let Some(action) = chosen {
            action.trigger();
        }
    }
}

struct ActionNode {
    label: String,
    binding: RefCell<Option<(Shortcut, ShortcutScope)>>,
    handlers: RefCell<Vec<TriggerHandler>>,
}

/// Shared handle to an action; equality is identity.
#[derive(Clone)]
pub struct RetainedAction(Rc<ActionNode>);

impl RetainedAction {
    pub fn new(label: impl Into<String>) -> Self {
        Self(Rc::new(ActionNode {
            label: label.into(),
            binding: RefCell::new(None),
            handlers: RefCell::new(Vec::new()),
        }))
    }

    /// Creates an action already bound to `shortcut`, like a toolkit built-in command.
    pub fn with_shortcut(label: impl Into<String>, shortcut: impl Into<Shortcut>) -> Self {
        let action = Self::new(label);
        action.set_shortcut(shortcut.into(), ShortcutScope::default());
        action
    }

    pub fn scope(&self) -> Option<ShortcutScope> {
        self.0.binding.borrow().as_ref().map(|(_, scope)| *scope)
    }

    /// Runs every connected handler.
    pub fn trigger(&self) {
        let handlers = self.0.handlers.borrow().clone();
        for handler in handlers {
            handler();
        }
    }
}

impl fmt::Debug for RetainedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetainedAction")
            .field("label", &self.0.label)
            .field("binding", &self.0.binding.borrow())
            .finish_non_exhaustive()
    }
}

impl PartialEq for RetainedAction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for RetainedAction {}

impl MenuAction for RetainedAction {
    fn label(&self) -> String {
        self.0.label.clone()
    }

    fn shortcut(&self) -> Option<Shortcut> {
        self.0
            .binding
            .borrow()
            .as_ref()
            .map(|(shortcut, _)| shortcut.clone())
    }

    fn set_shortcut(&self, shortcut: Shortcut, scope: ShortcutScope) {
        *self.0.binding.borrow_mut() = Some((shortcut, scope));
    }

    fn connect_triggered(&self, handler: TriggerHandler) {
        self.0.handlers.borrow_mut().push(handler);
    }
}

/// Token returned when a context-menu handler is connected to a [`RetainedWidget`].
#[derive(Debug, PartialEq, Eq)]
pub struct Connection(u64);

struct WidgetNode {
    id: u64,
    origin: Cell<Point>,
    alive: Cell<bool>,
    policy: Cell<ContextMenuPolicy>,
    actions: RefCell<Vec<RetainedAction>>,
    listeners: RefCell<Vec<(u64, ContextMenuHandler)>>,
}

/// Shared handle to a widget placed at a global origin.
#[derive(Clone)]
pub struct RetainedWidget(Rc<WidgetNode>);

impl RetainedWidget {
    pub fn new() -> Self {
        Self::with_origin(Point::default())
    }

    pub fn with_origin(origin: Point) -> Self {
        Self(Rc::new(WidgetNode {
            id: next_id(),
            origin: Cell::new(origin),
            alive: Cell::new(true),
            policy: Cell::new(ContextMenuPolicy::Default),
            actions: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    /// Moves the widget; later context-menu requests map through the new origin.
    pub fn set_origin(&self, origin: Point) {
        self.0.origin.set(origin);
    }

    pub fn policy(&self) -> ContextMenuPolicy {
        self.0.policy.get()
    }

    /// Marks the widget as destroyed; it stops hosting menus and shortcuts.
    pub fn destroy(&self) {
        self.0.alive.set(false);
        self.0.actions.borrow_mut().clear();
        self.0.listeners.borrow_mut().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }

    /// Emits a context-menu request at the widget-local `point`.
    ///
    /// Returns `false` unless the widget is alive and its policy is
    /// [`ContextMenuPolicy::Custom`].
    pub fn request_context_menu(&self, point: Point) -> bool {
        if !self.0.alive.get() || self.0.policy.get() != ContextMenuPolicy::Custom {
            return false;
        }
        let listeners: Vec<ContextMenuHandler> = self
            .0
            .listeners
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for listener in listeners {
            listener(point);
        }
        true
    }

    /// Triggers the bound action whose shortcut text equals `shortcut`.
    pub fn press(&self, shortcut: impl Into<Shortcut>) -> bool {
        let shortcut = shortcut.into();
        self.trigger_first(|action| action.shortcut().as_ref() == Some(&shortcut))
    }

    /// Triggers the bound action whose shortcut matches `key`.
    #[cfg(feature = "keymap")]
    pub fn dispatch_key(&self, key: &KeyEvent) -> bool {
        self.trigger_first(|action| action.shortcut().is_some_and(|shortcut| shortcut.matches(key)))
    }

    fn trigger_first<F>(&self, matches: F) -> bool
    where
        F: Fn(&RetainedAction) -> bool,
    {
        if !self.0.alive.get() {
            return false;
        }
        let found = self.0.actions.borrow().iter().find(|&action| matches(action)).cloned();
        found.is_some_and(|action| {
            action.trigger();
            true
        })
    }
}

impl Default for RetainedWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RetainedWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetainedWidget")
            .field("id", &self.0.id)
            .field("origin", &self.0.origin.get())
            .field("alive", &self.0.alive.get())
            .field("policy", &self.0.policy.get())
            .finish_non_exhaustive()
    }
}

impl Widget for RetainedWidget {
    type Id = u64;
    type Action = RetainedAction;
    type Connection = Connection;

    fn id(&self) -> u64 {
        self.0.id
    }

    fn is_alive(&self) -> bool {
        self.0.alive.get()
    }

    fn map_to_global(&self, point: Point) -> Point {
        point.offset(self.0.origin.get())
    }

    fn set_context_menu_policy(&self, policy: ContextMenuPolicy) {
        self.0.policy.set(policy);
    }

    fn actions(&self) -> Vec<RetainedAction> {
        self.0.actions.borrow().clone()
    }

    fn add_action(&self, action: &RetainedAction) {
        let mut actions = self.0.actions.borrow_mut();
        if !actions.contains(action) {
            actions.push(action.clone());
        }
    }

    fn remove_action(&self, action: &RetainedAction) {
        self.0.actions.borrow_mut().retain(|bound| bound != action);
    }

    fn connect_context_menu_requested(&self, handler: ContextMenuHandler) -> Connection {
        let id = next_id();
        self.0.listeners.borrow_mut().push((id, handler));
        Connection(id)
    }

    fn disconnect_context_menu_requested(&self, connection: Connection) {
        self.0
            .listeners
            .borrow_mut()
            .retain(|(id, _)| *id != connection.0);
    }
}

struct MenuBarNode {
    id: u64,
    menus: RefCell<Vec<RetainedMenu>>,
}

/// Shared handle to a window menu bar.
#[derive(Clone)]
pub struct RetainedMenuBar(Rc<MenuBarNode>);

impl RetainedMenuBar {
    pub fn new() -> Self {
        Self(Rc::new(MenuBarNode {
            id: next_id(),
            menus: RefCell::new(Vec::new()),
        }))
    }

    pub fn menus(&self) -> Vec<RetainedMenu> {
        self.0.menus.borrow().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.0.menus.borrow().iter().map(Menu::title).collect()
    }
}

impl Default for RetainedMenuBar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RetainedMenuBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetainedMenuBar")
            .field("id", &self.0.id)
            .field("titles", &self.titles())
            .finish()
    }
}

impl MenuBar for RetainedMenuBar {
    type Id = u64;
    type Menu = RetainedMenu;

    fn id(&self) -> u64 {
        self.0.id
    }

    fn add_menu(&self, menu: &RetainedMenu) {
        self.0.menus.borrow_mut().push(menu.clone());
    }

    fn remove_menu(&self, menu: &RetainedMenu) {
        self.0.menus.borrow_mut().retain(|bound| bound != menu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_lands_before_target() {
        let menu = Retained::new().root_menu();
        let first = menu.add_action("Download");
        let second = menu.add_action("Submit");
        menu.insert_separator(&second);
        menu.insert_separator(&first);

        assert_eq!(menu.to_string(), "---\nDownload\n---\nSubmit\n");
    }

    #[test]
    fn outline_shows_shortcuts_and_nesting() {
        let menu = Retained::new().root_menu();
        let submenu = menu.add_menu("File");
        submenu
            .add_action("Save")
            .set_shortcut(Shortcut::from("Ctrl+S"), ShortcutScope::Window);

        assert_eq!(menu.to_string(), "File/\n  Save [Ctrl+S]\n");
        assert!(menu.find_action("File/Save").is_some());
        assert!(menu.find_action("Save").is_none());
    }

    #[test]
    fn nested_popup_is_ignored() {
        let inner_calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&inner_calls);
        let toolkit = Retained::with_presenter(move |menu: &RetainedMenu, at: Point| {
            counter.set(counter.get() + 1);
            menu.popup(at);
            None
        });

        toolkit.root_menu().popup(Point::default());
        assert_eq!(inner_calls.get(), 1);
    }

    #[test]
    fn requests_need_custom_policy() {
        let widget = RetainedWidget::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let connection =
            widget.connect_context_menu_requested(Rc::new(move |_: Point| counter.set(counter.get() + 1)));

        assert!(!widget.request_context_menu(Point::default()));
        widget.set_context_menu_policy(ContextMenuPolicy::Custom);
        assert!(widget.request_context_menu(Point::default()));
        assert_eq!(hits.get(), 1);

        widget.disconnect_context_menu_requested(connection);
        assert_eq!(widget.listener_count(), 0);
    }

    #[test]
    fn press_triggers_bound_action() {
        let widget = RetainedWidget::new();
        let action = RetainedAction::with_shortcut("Save", "Ctrl+S");
        let saves = Rc::new(Cell::new(0));
        let counter = Rc::clone(&saves);
        action.connect_triggered(Rc::new(move || counter.set(counter.get() + 1)));
        widget.add_action(&action);

        assert!(widget.press("Ctrl+S"));
        assert!(!widget.press("Ctrl+D"));
        assert_eq!(saves.get(), 1);

        widget.destroy();
        assert!(!widget.press("Ctrl+S"));
    }
}
