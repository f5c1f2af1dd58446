use std::collections::hash_map::Entry;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::declaration::{ActionDecl, ActionSpec, Priority};
use crate::error::MenuError;
use crate::path::ActionPath;

/// Path-keyed store of the actions declared for one menu tree.
pub struct MenuRegistry<C = ()> {
    name: String,
    actions: FxHashMap<String, Rc<ActionSpec<C>>>,
    next_sequence: usize,
}

impl<C> MenuRegistry<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: FxHashMap::default(),
            next_sequence: 0,
        }
    }

    /// Returns the name of the owning tree.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.actions.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&ActionSpec<C>> {
        self.actions.get(path).map(Rc::as_ref)
    }

    /// Validates `decl` and stores it under its canonical path.
    ///
    /// On error the registry is left untouched.
    pub fn register<F>(
        &mut self,
        decl: ActionDecl<C>,
        callback: F,
    ) -> Result<&ActionSpec<C>, MenuError>
    where
        F: Fn(&C) + 'static,
    {
        let ActionDecl {
            path,
            shortcut,
            priority,
            validator,
        } = decl;
        let path = ActionPath::parse(&path)?;
        let priority = priority.transpose()?;

        let slot = match self.actions.entry(path.to_string()) {
            Entry::Occupied(slot) => {
                return Err(MenuError::DuplicateAction {
                    tree: self.name.clone(),
                    path: slot.key().clone(),
                });
            }
            Entry::Vacant(slot) => slot,
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        tracing::debug!(
            tree = %self.name,
            path = %slot.key(),
            shortcut = ?shortcut.as_ref().map(ToString::to_string),
            priority = ?priority.map(Priority::value),
            "registered menu action"
        );

        let spec = slot.insert(Rc::new(ActionSpec {
            path,
            shortcut,
            priority,
            validator,
            callback: Rc::new(callback),
            sequence,
        }));
        Ok(&**spec)
    }

    /// Returns every action sorted by priority, then registration order.
    ///
    /// Actions without a priority follow all prioritized ones.
    pub fn ordered(&self) -> Vec<Rc<ActionSpec<C>>> {
        let mut specs: Vec<_> = self.actions.values().cloned().collect();
        specs.sort_by_key(|spec| (spec.priority.is_none(), spec.priority, spec.sequence));
        specs
    }

    /// Returns the ordered actions whose validators currently pass.
    pub fn build_order(&self, ctx: &C) -> Result<Vec<Rc<ActionSpec<C>>>, MenuError> {
        visible_actions(self.ordered(), ctx)
    }
}

impl<C> std::fmt::Debug for MenuRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuRegistry")
            .field("name", &self.name)
            .field("len", &self.actions.len())
            .finish_non_exhaustive()
    }
}

/// Drops the specs hidden by their validator, evaluating each validator once.
pub(crate) fn visible_actions<C>(
    ordered: Vec<Rc<ActionSpec<C>>>,
    ctx: &C,
) -> Result<Vec<Rc<ActionSpec<C>>>, MenuError> {
    let mut visible = Vec::with_capacity(ordered.len());
    for spec in ordered {
        if spec.is_visible(ctx)? {
            visible.push(spec);
        }
    }
    Ok(visible)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io;

    use super::*;

    fn paths<C>(specs: &[Rc<ActionSpec<C>>]) -> Vec<String> {
        specs.iter().map(|spec| spec.path().to_string()).collect()
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let mut registry = MenuRegistry::<()>::new("main");
        registry
            .register(ActionDecl::new("Version Control/Submit"), |()| {})
            .unwrap();

        let err = registry
            .register(ActionDecl::new("Version Control/Submit"), |()| {})
            .unwrap_err();

        assert!(matches!(
            err,
            MenuError::DuplicateAction { ref tree, ref path }
                if tree == "main" && path == "Version Control/Submit"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn failed_registration_keeps_sequence() {
        let mut registry = MenuRegistry::<()>::new("main");
        registry.register(ActionDecl::new("A"), |()| {}).unwrap();
        assert!(registry.register(ActionDecl::new("A"), |()| {}).is_err());
        assert!(
            registry
                .register(ActionDecl::new("B").priority(0.5_f64), |()| {})
                .is_err()
        );
        assert!(registry.register(ActionDecl::new("C//D"), |()| {}).is_err());

        let spec = registry.register(ActionDecl::new("E"), |()| {}).unwrap();
        assert_eq!(spec.sequence(), 1);
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains("B"));
    }

    #[test]
    fn orders_by_priority_then_registration() {
        let mut registry = MenuRegistry::<()>::new("main");
        registry
            .register(ActionDecl::new("Submit").priority(40), |()| {})
            .unwrap();
        registry.register(ActionDecl::new("Refresh"), |()| {}).unwrap();
        registry
            .register(ActionDecl::new("Download").priority(11), |()| {})
            .unwrap();
        registry.register(ActionDecl::new("About"), |()| {}).unwrap();
        registry
            .register(ActionDecl::new("Check Out").priority(11), |()| {})
            .unwrap();

        let order = paths(&registry.build_order(&()).unwrap());
        assert_eq!(order, ["Download", "Check Out", "Submit", "Refresh", "About"]);
        assert_eq!(order, paths(&registry.build_order(&()).unwrap()));
    }

    #[test]
    fn validators_filter_with_context() {
        let mut registry = MenuRegistry::<Cell<bool>>::new("main");
        registry
            .register(
                ActionDecl::new("Check Out").validator(|selected: &Cell<bool>| selected.get()),
                |_| {},
            )
            .unwrap();
        registry.register(ActionDecl::new("Refresh"), |_| {}).unwrap();

        let selected = Cell::new(false);
        assert_eq!(paths(&registry.build_order(&selected).unwrap()), ["Refresh"]);

        selected.set(true);
        assert_eq!(
            paths(&registry.build_order(&selected).unwrap()),
            ["Check Out", "Refresh"]
        );
    }

    #[test]
    fn validator_runs_once_per_pass() {
        let mut registry = MenuRegistry::<Cell<u32>>::new("main");
        registry
            .register(
                ActionDecl::new("Counted").validator(|calls: &Cell<u32>| {
                    calls.set(calls.get() + 1);
                    true
                }),
                |_| {},
            )
            .unwrap();

        let calls = Cell::new(0);
        registry.build_order(&calls).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn validator_error_aborts() {
        let mut registry = MenuRegistry::<()>::new("main");
        registry
            .register(
                ActionDecl::new("Broken").try_validator(|()| {
                    Err::<bool, _>(io::Error::other("selection unavailable"))
                }),
                |()| {},
            )
            .unwrap();

        let err = registry.build_order(&()).unwrap_err();
        assert!(matches!(err, MenuError::Validator { ref path, .. } if path == "Broken"));
    }
}
