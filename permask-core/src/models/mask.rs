use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{PermissionMap, Route, ScopeKey, UserId};

/// Compiled permission mask: route -> scope -> slug -> value
///
/// Backed by ordered maps so serialization is byte-for-byte deterministic.
/// A mask is never patched; a recompilation replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompiledMask(BTreeMap<Route, BTreeMap<ScopeKey, PermissionMap>>);

impl CompiledMask {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, route: Route, scope: ScopeKey, permissions: PermissionMap) {
        self.0.entry(route).or_default().insert(scope, permissions);
    }

    #[must_use]
    pub fn get(&self, route: Route, scope: &ScopeKey) -> Option<&PermissionMap> {
        self.0.get(&route).and_then(|scopes| scopes.get(scope))
    }

    /// Map for one route and scope; empty when the mask holds nothing for it
    #[must_use]
    pub fn slice(&self, route: Route, scope: &ScopeKey) -> PermissionMap {
        self.get(route, scope).cloned().unwrap_or_default()
    }

    /// Scopes present for `route`
    pub fn scopes(&self, route: Route) -> impl Iterator<Item = &ScopeKey> {
        self.0.get(&route).into_iter().flat_map(BTreeMap::keys)
    }

    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        self.0.keys().copied().collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Persisted mask fragment for one (actor, scope) pair
///
/// Anonymous visitors share the entry with `user_id == None`. The presence of
/// an entry means "computed", even when every map inside it is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub user_id: Option<UserId>,
    pub scope: ScopeKey,
    pub mask: CompiledMask,
}

impl CacheEntry {
    #[must_use]
    pub const fn new(user_id: Option<UserId>, scope: ScopeKey, mask: CompiledMask) -> Self {
        Self { user_id, scope, mask }
    }
}
