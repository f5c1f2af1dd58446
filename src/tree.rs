use std::cell::{Cell, RefCell};
use std::collections::hash_map::Entry;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::declaration::{ActionDecl, ActionSpec, BoxError, Priority};
use crate::error::MenuError;
use crate::registry::{MenuRegistry, visible_actions};
use crate::shortcut::{Shortcut, ShortcutScope};
use crate::toolkit::{ContextMenuPolicy, Menu, MenuAction, MenuBar, Point, Toolkit, Widget};

type WidgetId<T> = <<T as Toolkit>::Widget as Widget>::Id;
type Connection<T> = <<T as Toolkit>::Widget as Widget>::Connection;
type BarId<T> = <<T as Toolkit>::MenuBar as MenuBar>::Id;

/// Build-pass settings of a menu tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuTreeConfig {
    /// Width of a priority band; a separator opens each new band. Zero acts as one.
    pub band_size: u16,
    /// Scope applied to every shortcut bound on a widget.
    pub shortcut_scope: ShortcutScope,
    /// Replace widget actions that already use a declared shortcut.
    pub override_shortcuts: bool,
}

impl MenuTreeConfig {
    pub const fn new() -> Self {
        Self {
            band_size: 10,
            shortcut_scope: ShortcutScope::WidgetWithChildren,
            override_shortcuts: true,
        }
    }

    fn band(self, priority: Priority) -> i32 {
        priority.band(i32::from(self.band_size.max(1)))
    }
}

impl Default for MenuTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct WidgetRecord<T: Toolkit> {
    widget: T::Widget,
    connection: Option<Connection<T>>,
    // Actions whose shortcuts this tree bound on the widget during the last build.
    shortcuts: Vec<T::Action>,
}

struct SubmenuIndex<M> {
    by_path: FxHashMap<String, M>,
    top_level: Vec<M>,
}

impl<M> Default for SubmenuIndex<M> {
    fn default() -> Self {
        Self {
            by_path: FxHashMap::default(),
            top_level: Vec::new(),
        }
    }
}

struct TreeInner<T: Toolkit, C> {
    toolkit: T,
    name: String,
    context: Rc<C>,
    config: Cell<MenuTreeConfig>,
    registry: RefCell<MenuRegistry<C>>,
    root: RefCell<Option<T::Menu>>,
    submenus: RefCell<SubmenuIndex<T::Menu>>,
    widgets: RefCell<FxHashMap<WidgetId<T>, WidgetRecord<T>>>,
    menu_bars: RefCell<FxHashMap<BarId<T>, Vec<T::Menu>>>,
}

/// A named set of actions presented as a context menu on attached widgets.
///
/// The menu is rebuilt from the registered actions every time it is shown, so
/// validators see the current context and actions registered after a widget was
/// attached show up on the next display. Clones share the same tree.
///
/// ```ignore
/// let tree = MenuTree::new(Retained::new(), "files");
/// tree.action("Version Control/Submit")
///     .shortcut("Ctrl+S")
///     .priority(40)
///     .register(|()| submit())?;
/// tree.add_widget(&widget)?;
/// ```
pub struct MenuTree<T: Toolkit, C = ()> {
    inner: Rc<TreeInner<T, C>>,
}

impl<T: Toolkit, C> Clone for MenuTree<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Toolkit> MenuTree<T, ()> {
    /// Creates a tree without application context.
    pub fn new(toolkit: T, name: impl Into<String>) -> Self {
        Self::with_context(toolkit, name, Rc::new(()))
    }
}

impl<T: Toolkit, C: 'static> MenuTree<T, C> {
    /// Creates a tree whose callbacks and validators receive `context`.
    pub fn with_context(toolkit: T, name: impl Into<String>, context: Rc<C>) -> Self {
        let name = name.into();
        Self {
            inner: Rc::new(TreeInner {
                toolkit,
                registry: RefCell::new(MenuRegistry::new(name.clone())),
                name,
                context,
                config: Cell::new(MenuTreeConfig::new()),
                root: RefCell::new(None),
                submenus: RefCell::new(SubmenuIndex::default()),
                widgets: RefCell::new(FxHashMap::default()),
                menu_bars: RefCell::new(FxHashMap::default()),
            }),
        }
    }

    #[must_use]
    pub fn with_config(self, config: MenuTreeConfig) -> Self {
        self.inner.config.set(config);
        self
    }

    pub fn config(&self) -> MenuTreeConfig {
        self.inner.config.get()
    }

    /// Applies `config` from the next build pass on.
    pub fn set_config(&self, config: MenuTreeConfig) {
        self.inner.config.set(config);
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn context(&self) -> &C {
        &self.inner.context
    }

    /// Returns the number of registered actions.
    pub fn len(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.borrow().is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.registry.borrow().contains(path)
    }

    /// Registers an action under the path of `decl`.
    pub fn register<F>(&self, decl: ActionDecl<C>, callback: F) -> Result<(), MenuError>
    where
        F: Fn(&C) + 'static,
    {
        self.inner
            .registry
            .borrow_mut()
            .register(decl, callback)
            .map(|_| ())
    }

    /// Starts a chained declaration for `path`.
    pub fn action(&self, path: impl Into<String>) -> ActionBuilder<'_, T, C> {
        ActionBuilder {
            tree: self,
            decl: ActionDecl::new(path),
        }
    }

    /// Returns the actions the next build would place, in menu order.
    pub fn build_order(&self) -> Result<Vec<Rc<ActionSpec<C>>>, MenuError> {
        let ordered = self.inner.registry.borrow().ordered();
        visible_actions(ordered, &*self.inner.context)
    }

    /// Rebuilds the menu; with a widget, its shortcuts are rebound as well.
    pub fn build(&self, widget: Option<&T::Widget>) -> Result<T::Menu, MenuError> {
        self.inner.build(widget)
    }

    /// Attaches the tree as the context menu of `widget`.
    ///
    /// Re-adding an attached widget only rebuilds it.
    pub fn add_widget(&self, widget: &T::Widget) -> Result<(), MenuError> {
        self.inner.build(Some(widget))?;
        widget.set_context_menu_policy(ContextMenuPolicy::Custom);

        let id = widget.id();
        if !self.is_attached(widget) {
            let tree = Rc::downgrade(&self.inner);
            let connection = widget.connect_context_menu_requested(Rc::new(move |point: Point| {
                display_for(&tree, id, point);
            }));
            self.inner
                .widgets
                .borrow_mut()
                .entry(id)
                .or_insert_with(|| WidgetRecord {
                    widget: widget.clone(),
                    connection: None,
                    shortcuts: Vec::new(),
                })
                .connection = Some(connection);
        }

        tracing::debug!(
            tree = %self.inner.name,
            attached = self.attached_count(),
            "attached widget"
        );
        Ok(())
    }

    /// Constructs a widget and attaches it right away.
    pub fn attach_new<F>(&self, create: F) -> Result<T::Widget, MenuError>
    where
        F: FnOnce() -> T::Widget,
    {
        let widget = create();
        self.add_widget(&widget)?;
        Ok(widget)
    }

    /// Detaches `widget` and unbinds the shortcuts this tree added to it.
    ///
    /// Returns `true` if anything was torn down.
    pub fn remove_widget(&self, widget: &T::Widget) -> bool {
        let Some(record) = self.inner.widgets.borrow_mut().remove(&widget.id()) else {
            return false;
        };

        let mut removed = false;
        if let Some(connection) = record.connection {
            record.widget.disconnect_context_menu_requested(connection);
            removed = true;
        }
        for action in &record.shortcuts {
            record.widget.remove_action(action);
            removed = true;
        }

        tracing::debug!(
            tree = %self.inner.name,
            shortcuts = record.shortcuts.len(),
            removed,
            "detached widget"
        );
        removed
    }

    /// Rebuilds the menu and presents it at `point`.
    ///
    /// With a widget, `point` is widget-local and the widget's shortcuts are
    /// rebound. Blocks until the menu closes.
    pub fn display(&self, point: Point, widget: Option<&T::Widget>) -> Result<(), MenuError> {
        self.inner.display(point, widget)
    }

    /// Appends the top-level submenus of the last build to `bar`.
    ///
    /// Builds without a widget first if the tree was never built. Returns the
    /// number of menus added.
    pub fn add_actions_to_menu_bar(&self, bar: &T::MenuBar) -> Result<usize, MenuError> {
        let built = self.inner.root.borrow().is_some();
        if !built {
            self.inner.build(None)?;
        }

        let menus = self.inner.submenus.borrow().top_level.clone();
        for menu in &menus {
            bar.add_menu(menu);
        }
        let added = menus.len();
        self.inner
            .menu_bars
            .borrow_mut()
            .entry(bar.id())
            .or_default()
            .extend(menus);

        tracing::debug!(tree = %self.inner.name, added, "added menus to menu bar");
        Ok(added)
    }

    /// Removes every menu this tree added to `bar`.
    pub fn remove_actions_from_menu_bar(&self, bar: &T::MenuBar) -> bool {
        let Some(menus) = self.inner.menu_bars.borrow_mut().remove(&bar.id()) else {
            return false;
        };
        for menu in &menus {
            bar.remove_menu(menu);
        }
        true
    }

    pub fn is_attached(&self, widget: &T::Widget) -> bool {
        self.inner
            .widgets
            .borrow()
            .get(&widget.id())
            .is_some_and(|record| record.connection.is_some())
    }

    pub fn attached_count(&self) -> usize {
        self.inner
            .widgets
            .borrow()
            .values()
            .filter(|record| record.connection.is_some())
            .count()
    }

    /// Returns the root menu of the last build.
    pub fn menu_root(&self) -> Option<T::Menu> {
        self.inner.root.borrow().clone()
    }

    /// Returns the submenu at `path` (e.g. `"Version Control"`) from the last build.
    pub fn submenu(&self, path: &str) -> Option<T::Menu> {
        self.inner.submenus.borrow().by_path.get(path).cloned()
    }
}

impl<T: Toolkit, C> fmt::Debug for MenuTree<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuTree")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config.get())
            .field("actions", &self.inner.registry.borrow().len())
            .field("widgets", &self.inner.widgets.borrow().len())
            .finish_non_exhaustive()
    }
}

fn display_for<T: Toolkit, C: 'static>(tree: &Weak<TreeInner<T, C>>, id: WidgetId<T>, point: Point) {
    let Some(tree) = tree.upgrade() else {
        return;
    };
    let widget = tree
        .widgets
        .borrow()
        .get(&id)
        .map(|record| record.widget.clone());
    let Some(widget) = widget else {
        return;
    };
    if let Err(err) = tree.display(point, Some(&widget)) {
        tracing::error!(tree = %tree.name, error = %err, "failed to display context menu");
    }
}

impl<T: Toolkit, C: 'static> TreeInner<T, C> {
    fn build(&self, widget: Option<&T::Widget>) -> Result<T::Menu, MenuError> {
        self.prune_dead_widgets();
        if widget.is_some_and(|widget| !widget.is_alive()) {
            return Err(MenuError::InvalidWidget);
        }

        let ordered = self.registry.borrow().ordered();
        let specs = visible_actions(ordered, &*self.context)?;

        if let Some(widget) = widget {
            let previous = self
                .widgets
                .borrow_mut()
                .get_mut(&widget.id())
                .map(|record| mem::take(&mut record.shortcuts))
                .unwrap_or_default();
            for action in &previous {
                widget.remove_action(action);
            }
        }

        let root = self.toolkit.root_menu();
        let mut pass = BuildPass::<T, C> {
            tree: &self.name,
            root: &root,
            context: &self.context,
            widget,
            config: self.config.get(),
            index: SubmenuIndex::default(),
            bands: FxHashMap::default(),
            bound: Vec::new(),
        };
        for spec in &specs {
            pass.place(spec);
        }
        let BuildPass { index, bound, .. } = pass;

        tracing::trace!(
            tree = %self.name,
            actions = specs.len(),
            submenus = index.by_path.len(),
            shortcuts = bound.len(),
            "built menu tree"
        );

        if let Some(widget) = widget {
            match self.widgets.borrow_mut().entry(widget.id()) {
                Entry::Occupied(mut slot) => slot.get_mut().shortcuts = bound,
                Entry::Vacant(slot) => {
                    if !bound.is_empty() {
                        slot.insert(WidgetRecord {
                            widget: widget.clone(),
                            connection: None,
                            shortcuts: bound,
                        });
                    }
                }
            }
        }

        *self.submenus.borrow_mut() = index;
        let previous = self.root.replace(Some(root.clone()));
        if let Some(previous) = previous {
            previous.clear();
        }
        Ok(root)
    }

    /// Forgets widgets that died without being removed.
    fn prune_dead_widgets(&self) {
        let mut widgets = self.widgets.borrow_mut();
        let before = widgets.len();
        widgets.retain(|_, record| record.widget.is_alive());
        let pruned = before - widgets.len();
        if pruned > 0 {
            tracing::debug!(tree = %self.name, pruned, "dropped records of dead widgets");
        }
    }

    fn display(&self, point: Point, widget: Option<&T::Widget>) -> Result<(), MenuError> {
        let root = self.build(widget)?;
        let at = widget.map_or(point, |widget| widget.map_to_global(point));
        tracing::debug!(tree = %self.name, x = at.x, y = at.y, "displaying context menu");
        root.popup(at);
        Ok(())
    }
}

/// Separator bookkeeping for one parent menu.
#[derive(Default)]
struct ParentBands {
    band: i32,
    entries: usize,
}

struct BuildPass<'a, T: Toolkit, C> {
    tree: &'a str,
    root: &'a T::Menu,
    context: &'a Rc<C>,
    widget: Option<&'a T::Widget>,
    config: MenuTreeConfig,
    index: SubmenuIndex<T::Menu>,
    // Keyed by canonical parent path; the root menu is "".
    bands: FxHashMap<String, ParentBands>,
    bound: Vec<T::Action>,
}

impl<T: Toolkit, C: 'static> BuildPass<'_, T, C> {
    fn place(&mut self, spec: &ActionSpec<C>) {
        let (parent, parent_key) = self.descend(spec.path().parents());

        let bands = self.bands.entry(parent_key).or_default();
        let mut separator = false;
        if let Some(priority) = spec.priority() {
            let band = self.config.band(priority);
            if band > bands.band {
                bands.band = band;
                separator = bands.entries > 0;
            }
        }
        bands.entries += 1;

        let action = parent.add_action(spec.path().leaf());
        if separator {
            parent.insert_separator(&action);
        }

        let callback = Rc::clone(spec.callback());
        let context = Rc::clone(self.context);
        action.connect_triggered(Rc::new(move || callback(&*context)));

        if let (Some(shortcut), Some(widget)) = (spec.shortcut(), self.widget) {
            self.bind_shortcut(widget, &action, shortcut, spec);
        }
    }

    /// Walks to the parent menu of a leaf, creating missing submenus.
    ///
    /// Submenus count as entries of their parent but never move its band.
    fn descend(&mut self, parents: &[String]) -> (T::Menu, String) {
        let mut menu = self.root.clone();
        let mut key = String::new();
        for segment in parents {
            let parent_key = key.clone();
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(segment);

            if let Some(existing) = self.index.by_path.get(&key) {
                menu = existing.clone();
                continue;
            }

            let submenu = menu.add_menu(segment);
            if parent_key.is_empty() {
                self.index.top_level.push(submenu.clone());
            }
            self.bands.entry(parent_key).or_default().entries += 1;
            self.index.by_path.insert(key.clone(), submenu.clone());
            menu = submenu;
        }
        (menu, key)
    }

    fn bind_shortcut(
        &mut self,
        widget: &T::Widget,
        action: &T::Action,
        shortcut: &Shortcut,
        spec: &ActionSpec<C>,
    ) {
        let conflicts: Vec<T::Action> = widget
            .actions()
            .into_iter()
            .filter(|existing| existing.shortcut().as_ref() == Some(shortcut))
            .collect();

        if !conflicts.is_empty() && !self.config.override_shortcuts {
            tracing::debug!(
                tree = %self.tree,
                path = %spec.path(),
                shortcut = %shortcut,
                "shortcut already bound on widget; keeping existing action"
            );
            return;
        }

        for existing in conflicts {
            tracing::warn!(
                tree = %self.tree,
                path = %spec.path(),
                shortcut = %shortcut,
                existing = %existing.label(),
                "overriding widget action bound to the same shortcut"
            );
            widget.remove_action(&existing);
            self.bound.retain(|owned| *owned != existing);
        }

        action.set_shortcut(shortcut.clone(), self.config.shortcut_scope);
        widget.add_action(action);
        self.bound.push(action.clone());
    }
}

/// Chained declaration returned by [`MenuTree::action`].
#[must_use = "call `register` to add the action to the tree"]
pub struct ActionBuilder<'t, T: Toolkit, C> {
    tree: &'t MenuTree<T, C>,
    decl: ActionDecl<C>,
}

impl<T: Toolkit, C: 'static> ActionBuilder<'_, T, C> {
    pub fn shortcut(mut self, shortcut: impl Into<Shortcut>) -> Self {
        self.decl = self.decl.shortcut(shortcut);
        self
    }

    pub fn priority<P>(mut self, priority: P) -> Self
    where
        P: TryInto<Priority>,
        P::Error: Into<MenuError>,
    {
        self.decl = self.decl.priority(priority);
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&C) -> bool + 'static,
    {
        self.decl = self.decl.validator(validator);
        self
    }

    pub fn try_validator<F, E>(mut self, validator: F) -> Self
    where
        F: Fn(&C) -> Result<bool, E> + 'static,
        E: Into<BoxError>,
    {
        self.decl = self.decl.try_validator(validator);
        self
    }

    /// Registers the declared action with `callback`.
    pub fn register<F>(self, callback: F) -> Result<(), MenuError>
    where
        F: Fn(&C) + 'static,
    {
        self.tree.register(self.decl, callback)
    }
}
