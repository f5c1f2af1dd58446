use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::MenuError;
use crate::path::ActionPath;
use crate::shortcut::Shortcut;

/// Boxed error returned by fallible visibility predicates.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Handler invoked with the tree context when an action is activated.
pub type ActionCallback<C> = Rc<dyn Fn(&C)>;

/// Visibility predicate evaluated with the tree context on every build pass.
pub type Validator<C> = Rc<dyn Fn(&C) -> Result<bool, BoxError>>;

/// Sort key of an action; lower values come first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(i32);

impl Priority {
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }

    /// Returns the separator band of this priority (`floor(value / size)`).
    pub const fn band(self, size: i32) -> i32 {
        self.0.div_euclid(size)
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for Priority {
    type Error = MenuError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        i32::try_from(value)
            .map(Self)
            .map_err(|_| MenuError::InvalidPriority {
                value: value.to_string(),
            })
    }
}

impl TryFrom<f64> for Priority {
    type Error = MenuError;

    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let in_range = value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX);
        if value.fract() == 0.0 && in_range {
            Ok(Self(value as i32))
        } else {
            Err(MenuError::InvalidPriority {
                value: value.to_string(),
            })
        }
    }
}

impl TryFrom<&str> for Priority {
    type Error = MenuError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value
            .trim()
            .parse::<i32>()
            .map(Self)
            .map_err(|_| MenuError::InvalidPriority {
                value: value.to_owned(),
            })
    }
}

impl FromStr for Priority {
    type Err = MenuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

/// Declaration of an action before it is registered.
///
/// Conversion failures (e.g. a non-integer priority) are kept until
/// registration so that the registry can reject the whole declaration.
pub struct ActionDecl<C = ()> {
    pub(crate) path: String,
    pub(crate) shortcut: Option<Shortcut>,
    pub(crate) priority: Option<Result<Priority, MenuError>>,
    pub(crate) validator: Option<Validator<C>>,
}

impl<C> ActionDecl<C> {
    /// Starts a declaration for the slash-delimited `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            shortcut: None,
            priority: None,
            validator: None,
        }
    }

    /// Binds a keyboard accelerator; empty text means no shortcut.
    #[must_use]
    pub fn shortcut(mut self, shortcut: impl Into<Shortcut>) -> Self {
        let shortcut = shortcut.into();
        self.shortcut = (!shortcut.is_empty()).then_some(shortcut);
        self
    }

    /// Sets the sort priority.
    #[must_use]
    pub fn priority<P>(mut self, priority: P) -> Self
    where
        P: TryInto<Priority>,
        P::Error: Into<MenuError>,
    {
        self.priority = Some(priority.try_into().map_err(Into::into));
        self
    }

    /// Shows the action only while `validator` returns `true`.
    #[must_use]
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&C) -> bool + 'static,
    {
        self.validator = Some(Rc::new(move |ctx: &C| -> Result<bool, BoxError> {
            Ok(validator(ctx))
        }));
        self
    }

    /// Like [`ActionDecl::validator`], but a failing predicate aborts the build pass.
    #[must_use]
    pub fn try_validator<F, E>(mut self, validator: F) -> Self
    where
        F: Fn(&C) -> Result<bool, E> + 'static,
        E: Into<BoxError>,
    {
        self.validator = Some(Rc::new(move |ctx: &C| -> Result<bool, BoxError> {
            validator(ctx).map_err(Into::into)
        }));
        self
    }
}

/// A registered action.
pub struct ActionSpec<C = ()> {
    pub(crate) path: ActionPath,
    pub(crate) shortcut: Option<Shortcut>,
    pub(crate) priority: Option<Priority>,
    pub(crate) validator: Option<Validator<C>>,
    pub(crate) callback: ActionCallback<C>,
    pub(crate) sequence: usize,
}

impl<C> ActionSpec<C> {
    pub const fn path(&self) -> &ActionPath {
        &self.path
    }

    pub const fn shortcut(&self) -> Option<&Shortcut> {
        self.shortcut.as_ref()
    }

    pub const fn priority(&self) -> Option<Priority> {
        self.priority
    }

    pub const fn callback(&self) -> &ActionCallback<C> {
        &self.callback
    }

    /// Registration order within the owning registry.
    pub const fn sequence(&self) -> usize {
        self.sequence
    }

    /// Evaluates the visibility predicate; actions without one are always visible.
    pub fn is_visible(&self, ctx: &C) -> Result<bool, MenuError> {
        match &self.validator {
            None => Ok(true),
            Some(validator) => validator(ctx).map_err(|source| MenuError::Validator {
                path: self.path.to_string(),
                source,
            }),
        }
    }

    /// Invokes the callback directly, bypassing any menu.
    pub fn trigger(&self, ctx: &C) {
        (self.callback)(ctx);
    }
}

impl<C> fmt::Debug for ActionSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec")
            .field("path", &self.path.to_string())
            .field("shortcut", &self.shortcut)
            .field("priority", &self.priority)
            .field("validator", &self.validator.is_some())
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_uses_floor_division() {
        assert_eq!(Priority::new(11).band(10), 1);
        assert_eq!(Priority::new(19).band(10), 1);
        assert_eq!(Priority::new(21).band(10), 2);
        assert_eq!(Priority::new(-1).band(10), -1);
    }

    #[test]
    fn integral_values_convert() {
        assert_eq!(Priority::try_from(40_i64).unwrap(), Priority::new(40));
        assert_eq!(Priority::try_from(12.0_f64).unwrap(), Priority::new(12));
        assert_eq!(" 7 ".parse::<Priority>().unwrap(), Priority::new(7));
    }

    #[test]
    fn non_integral_values_are_rejected() {
        assert!(matches!(
            Priority::try_from(2.5_f64),
            Err(MenuError::InvalidPriority { .. })
        ));
        assert!(Priority::try_from(f64::NAN).is_err());
        assert!(Priority::try_from(i64::MAX).is_err());
        assert!(Priority::try_from("high").is_err());
    }

    #[test]
    fn empty_shortcut_is_dropped() {
        let decl = ActionDecl::<()>::new("File/Save").shortcut("");
        assert!(decl.shortcut.is_none());

        let decl = ActionDecl::<()>::new("File/Save").shortcut("Ctrl+S");
        assert_eq!(decl.shortcut, Some(Shortcut::from("Ctrl+S")));
    }

    #[test]
    fn priority_failure_is_deferred() {
        let decl = ActionDecl::<()>::new("File/Save").priority(1.5_f64);
        assert!(matches!(decl.priority, Some(Err(_))));

        let decl = ActionDecl::<()>::new("File/Save").priority(3);
        assert!(matches!(decl.priority, Some(Ok(p)) if p.value() == 3));
    }
}
