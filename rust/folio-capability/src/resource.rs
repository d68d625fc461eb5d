//! Normalised names of protected objects.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a resource name cannot address an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResourceKeyError {
    /// Nothing is left once leading slashes are stripped.
    #[error("resource name is empty")]
    Empty,
    /// A `..` segment would escape the object namespace.
    #[error("resource name contains a parent-directory segment")]
    Traversal,
    /// A `.` segment, which URLs collapse away.
    #[error("resource name contains a `.` segment")]
    DotSegment,
    /// Control characters such as NUL cannot name a stored object.
    #[error("resource name contains a control character")]
    ControlCharacter,
}

/// The name of a protected object, relative to the root of the object store.
///
/// Construction normalises the name: leading slashes are stripped, and the
/// result must be non-empty, free of control characters and free of `..` and
/// `.` segments. Both `/` and `\` count as separators for the segment checks,
/// so `a\..\b` is rejected as well. Every other character, including interior
/// empty segments, is kept as-is because it is part of the object's name.
///
/// ```
/// use folio_capability::{ResourceKey, ResourceKeyError};
///
/// let key = ResourceKey::parse("//gallery/a.jpg").unwrap();
/// assert_eq!(key.as_str(), "gallery/a.jpg");
///
/// assert_eq!(ResourceKey::parse("/"), Err(ResourceKeyError::Empty));
/// assert_eq!(ResourceKey::parse("a/../b"), Err(ResourceKeyError::Traversal));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Normalise and validate a resource name.
    pub fn parse(name: &str) -> Result<Self, ResourceKeyError> {
        let name = name.trim_start_matches('/');

        if name.is_empty() {
            return Err(ResourceKeyError::Empty);
        }

        if name.chars().any(char::is_control) {
            return Err(ResourceKeyError::ControlCharacter);
        }

        for segment in name.split(['/', '\\']) {
            match segment {
                ".." => return Err(ResourceKeyError::Traversal),
                "." => return Err(ResourceKeyError::DotSegment),
                _ => {}
            }
        }

        Ok(Self(name.to_owned()))
    }

    /// The normalised name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `/`-separated segments of the name.
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split('/')
    }

    /// The extension of the final segment, if any.
    pub fn extension(&self) -> Option<&str> {
        let file = self.segments().next_back()?;
        match file.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => Some(extension),
            _ => None,
        }
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ResourceKey {
    type Err = ResourceKeyError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::parse(name)
    }
}

impl TryFrom<&str> for ResourceKey {
    type Error = ResourceKeyError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::parse(name)
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = ResourceKeyError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::parse(&name)
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.0
    }
}
