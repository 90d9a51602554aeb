//! Selection of the concrete roles that apply to one actor in one scope

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    models::{Role, RoleId, ScopeKey, UserId},
    repository::RoleRepository,
    Result,
};

/// A role selected for folding, and the scope slice its values land in.
///
/// Chain and assigned roles land in their own scope. An inherited parent lands
/// in its child's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRole {
    pub role: Role,
    pub scope: ScopeKey,
}

/// Everything a request may draw roles from, loaded once for all routes
#[derive(Debug, Clone, Default)]
pub struct RoleCandidates {
    chain: Vec<Role>,
    assigned: Vec<(Role, Option<Role>)>,
}

impl RoleCandidates {
    /// Roles applying to `chain` in `scope`, ascending by `(weight, role_id)`
    #[must_use]
    pub fn select(&self, chain: &[String], scope: &ScopeKey) -> Vec<ResolvedRole> {
        let mut selected: BTreeMap<(ScopeKey, RoleId), ResolvedRole> = BTreeMap::new();
        let mut add = |role: &Role, slice: &ScopeKey| {
            selected
                .entry((slice.clone(), role.id))
                .or_insert_with(|| ResolvedRole {
                    role: role.clone(),
                    scope: slice.clone(),
                });
        };

        for role in &self.chain {
            if chain.contains(&role.name) && role.scope.applies_in(scope) {
                add(role, &role.scope);
            }
        }

        for (role, parent) in &self.assigned {
            if !role.scope.applies_in(scope) {
                continue;
            }
            add(role, &role.scope);
            if let Some(parent) = parent {
                add(parent, &role.scope);
            }
        }

        let mut resolved: Vec<ResolvedRole> = selected.into_values().collect();
        resolved.sort_by_key(|r| (r.role.weight, r.role.id));
        resolved
    }
}

/// Loads candidate roles and applies the inclusion rules
#[derive(Clone)]
pub struct RoleSetResolver {
    roles: Arc<dyn RoleRepository>,
}

impl std::fmt::Debug for RoleSetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleSetResolver").finish()
    }
}

impl RoleSetResolver {
    #[must_use]
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self { roles }
    }

    /// Load chain roles for `names` and, for registered actors, their direct
    /// assignments with each assignment's system parent.
    pub async fn load(
        &self,
        names: &[String],
        scope: &ScopeKey,
        user_id: Option<&UserId>,
    ) -> Result<RoleCandidates> {
        let chain = self.roles.chain_roles(names, scope).await?;

        let Some(user_id) = user_id else {
            debug!(scope = %scope, "Anonymous actor, skipping role assignments");
            return Ok(RoleCandidates {
                chain,
                assigned: Vec::new(),
            });
        };

        let direct = self.roles.assigned_roles(user_id).await?;
        let parents: BTreeMap<RoleId, Role> = if direct.iter().any(|r| r.inherit_id.is_some()) {
            self.roles
                .system_roles()
                .await?
                .into_iter()
                .map(|role| (role.id, role))
                .collect()
        } else {
            BTreeMap::new()
        };

        let assigned = direct
            .into_iter()
            .map(|role| {
                let parent = role.inherit_id.and_then(|parent_id| {
                    let parent = parents.get(&parent_id).cloned();
                    if parent.is_none() {
                        warn!(
                            user_id = %user_id,
                            role_id = %role.id,
                            parent_id = %parent_id,
                            "Inconsistent assignment: parent role is missing or not a system role, ignoring it"
                        );
                    }
                    parent
                });
                (role, parent)
            })
            .collect();

        Ok(RoleCandidates { chain, assigned })
    }

    /// Roles for a single chain, ascending by weight
    pub async fn resolve(
        &self,
        chain: &[String],
        scope: &ScopeKey,
        user_id: Option<&UserId>,
    ) -> Result<Vec<ResolvedRole>> {
        Ok(self.load(chain, scope, user_id).await?.select(chain, scope))
    }
}
