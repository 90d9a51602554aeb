//! Permission values and resolution routes
//!
//! Permissions are identified by dotted slugs such as `board.post.delete.other`.
//! A [`PermissionMap`] holds only the slugs some role explicitly assigned; an
//! absent slug means "not set", which is different from an explicit `false`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Flat slug -> value map for one route in one scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap(BTreeMap<String, bool>);

impl PermissionMap {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Explicit value for `slug`, or `None` when no role set it
    #[must_use]
    pub fn get(&self, slug: &str) -> Option<bool> {
        self.0.get(slug).copied()
    }

    /// Value for `slug` with the closed-world default applied
    #[must_use]
    pub fn allows(&self, slug: &str) -> bool {
        self.get(slug).unwrap_or(false)
    }

    pub fn set(&mut self, slug: impl Into<String>, value: bool) {
        self.0.insert(slug.into(), value);
    }

    pub fn remove(&mut self, slug: &str) -> Option<bool> {
        self.0.remove(slug)
    }

    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        self.0.contains_key(slug)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(slug, value)| (slug.as_str(), *value))
    }
}

impl From<BTreeMap<String, bool>> for PermissionMap {
    fn from(map: BTreeMap<String, bool>) -> Self {
        Self(map)
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for PermissionMap {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(slug, value)| (slug.into(), value)).collect())
    }
}

/// Resolution branch selected by accountability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Accountable actors
    Normal,
    /// High-risk actors (e.g. anonymizing networks)
    Unaccountable,
}

impl Route {
    pub const ALL: [Self; 2] = [Self::Normal, Self::Unaccountable];

    /// Route an actor resolves through
    #[must_use]
    pub const fn for_accountability(is_accountable: bool) -> Self {
        if is_accountable {
            Self::Normal
        } else {
            Self::Unaccountable
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Unaccountable => "unaccountable",
        }
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "unaccountable" => Ok(Self::Unaccountable),
            _ => Err(format!("Unknown route: {s}")),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
