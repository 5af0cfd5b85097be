//! Map identifiers.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Identifier of a hosted map, of the form `account.map`.
///
/// A map id is also the identity of its offline store: at most one store
/// exists per id.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MapId(String);

impl MapId {
    /// Creates a map id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a file-name safe rendering of the id.
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced with `_`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl From<&str> for MapId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for MapId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
