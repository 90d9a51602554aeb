//! Scope keys
//!
//! A permission value lives either in the global scope or in one board's
//! scope. The global scope is represented by the absence of a board, both in
//! memory and in storage (`board_uri IS NULL`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::BoardUri;

/// Global or per-board scope of a permission value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScopeKey(Option<BoardUri>);

impl ScopeKey {
    #[must_use]
    pub const fn global() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn board(uri: impl Into<BoardUri>) -> Self {
        Self(Some(uri.into()))
    }

    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.0.is_none()
    }

    #[must_use]
    pub const fn board_uri(&self) -> Option<&BoardUri> {
        self.0.as_ref()
    }

    #[must_use]
    pub fn into_board_uri(self) -> Option<BoardUri> {
        self.0
    }

    /// True when a role bound to `self` takes part in a request for `scope`.
    ///
    /// Global roles take part in every request; board roles only in requests
    /// for their own board.
    #[must_use]
    pub fn applies_in(&self, scope: &Self) -> bool {
        self.is_global() || self == scope
    }

    /// Slices compiled for a request in this scope: global first, then the board
    #[must_use]
    pub fn passes(&self) -> Vec<Self> {
        if self.is_global() {
            vec![Self::global()]
        } else {
            vec![Self::global(), self.clone()]
        }
    }

    /// Key used in serialized masks: the board URI, or the empty string for global.
    #[must_use]
    pub fn as_key(&self) -> &str {
        self.0.as_ref().map_or("", BoardUri::as_str)
    }
}

impl From<Option<BoardUri>> for ScopeKey {
    fn from(uri: Option<BoardUri>) -> Self {
        Self(uri.filter(|u| !u.as_str().is_empty()))
    }
}

impl From<BoardUri> for ScopeKey {
    fn from(uri: BoardUri) -> Self {
        Self::from(Some(uri))
    }
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(uri) => write!(f, "/{uri}/"),
            None => write!(f, "global"),
        }
    }
}

// Serialized as a plain string so it can key JSON objects.
impl Serialize for ScopeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_key())
    }
}

impl<'de> Deserialize<'de> for ScopeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(Self::from(Some(BoardUri::from(key))))
    }
}
