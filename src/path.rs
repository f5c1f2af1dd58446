use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::MenuError;

/// Slash-delimited location of an action inside a menu tree.
///
/// Every segment but the last names a submenu; the last one is the action label.
/// Paths always hold at least one non-blank segment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActionPath {
    segments: SmallVec<[String; 4]>,
}

impl ActionPath {
    /// Splits `path` on `/`, rejecting empty paths and blank segments.
    pub fn parse(path: &str) -> Result<Self, MenuError> {
        if path.trim().is_empty() {
            return Err(MenuError::InvalidPath {
                path: path.to_owned(),
                reason: "path is empty",
            });
        }

        let mut segments = SmallVec::new();
        for segment in path.split('/') {
            if segment.trim().is_empty() {
                return Err(MenuError::InvalidPath {
                    path: path.to_owned(),
                    reason: "path contains an empty segment",
                });
            }
            segments.push(segment.to_owned());
        }
        Ok(Self { segments })
    }

    /// Returns all segments, submenus first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the submenu segments (everything but the leaf).
    pub fn parents(&self) -> &[String] {
        match self.segments.split_last() {
            Some((_, parents)) => parents,
            None => &[],
        }
    }

    /// Returns the leaf label.
    pub fn leaf(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Returns the number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for ActionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for ActionPath {
    type Err = MenuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
