use std::convert::Infallible;

use crate::declaration::BoxError;

/// Errors raised while declaring actions or attaching/displaying menus.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    /// The path is already claimed within the same menu tree.
    #[error("{path:?} is already registered to menu tree {tree:?}")]
    DuplicateAction { tree: String, path: String },

    /// The declared priority could not be converted to an integer.
    #[error("invalid priority {value:?}: expected an integer")]
    InvalidPriority { value: String },

    /// The path is empty or contains an empty segment.
    #[error("invalid action path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The widget can no longer host a context menu.
    #[error("widget cannot host a context menu (destroyed or detached from the toolkit)")]
    InvalidWidget,

    /// A visibility predicate failed; the build pass was aborted.
    #[error("visibility check for {path:?} failed")]
    Validator {
        path: String,
        #[source]
        source: BoxError,
    },
}

impl From<Infallible> for MenuError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
