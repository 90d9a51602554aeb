//! In-process store implementing every repository trait
//!
//! Used by tests and benches. Foreign-key behaviour of the
//! SQL schema is mirrored: permission values need a catalog slug and an
//! existing role, assignments need an existing role.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::{
    models::{CacheEntry, CompiledMask, NewRole, PermissionGroup, Role, RoleId, ScopeKey, UserId},
    Error, Result,
};

use super::{PermissionRepository, RoleCacheRepository, RoleRepository};

#[derive(Default)]
struct State {
    roles: BTreeMap<RoleId, Role>,
    assignments: BTreeSet<(UserId, RoleId)>,
    permissions: BTreeSet<String>,
    groups: BTreeMap<String, PermissionGroup>,
    cache: BTreeMap<(Option<UserId>, ScopeKey), CompiledMask>,
    next_role_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_storage: AtomicBool,
    role_reads: AtomicU64,
    cache_writes: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose catalog already holds every known slug and group
    #[must_use]
    pub fn with_catalog() -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write();
            state
                .permissions
                .extend(crate::models::PERMISSION_SLUGS.iter().map(ToString::to_string));
            for group in crate::models::permission_groups() {
                state.groups.insert(group.group_name.clone(), group);
            }
        }
        store
    }

    /// Make every subsequent call fail as if the database were unreachable
    pub fn set_fail_storage(&self, fail: bool) {
        self.fail_storage.store(fail, Ordering::SeqCst);
    }

    /// Number of role queries served so far
    pub fn role_reads(&self) -> u64 {
        self.role_reads.load(Ordering::SeqCst)
    }

    /// Number of cache rows written so far
    pub fn cache_writes(&self) -> u64 {
        self.cache_writes.load(Ordering::SeqCst)
    }

    /// Number of persisted cache rows
    pub fn cache_len(&self) -> usize {
        self.state.read().cache.len()
    }

    fn check(&self) -> Result<()> {
        if self.fail_storage.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn read_roles(&self) -> Result<()> {
        self.check()?;
        self.role_reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn sorted(mut roles: Vec<Role>) -> Vec<Role> {
    roles.sort_by_key(|role| (role.weight, role.id));
    roles
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn chain_roles(&self, names: &[String], scope: &ScopeKey) -> Result<Vec<Role>> {
        self.read_roles()?;
        let state = self.state.read();
        Ok(sorted(
            state
                .roles
                .values()
                .filter(|role| names.contains(&role.name) && role.scope.applies_in(scope))
                .cloned()
                .collect(),
        ))
    }

    async fn assigned_roles(&self, user_id: &UserId) -> Result<Vec<Role>> {
        self.read_roles()?;
        let state = self.state.read();
        Ok(sorted(
            state
                .assignments
                .iter()
                .filter(|(holder, _)| holder == user_id)
                .filter_map(|(_, role_id)| state.roles.get(role_id).cloned())
                .collect(),
        ))
    }

    async fn system_roles(&self) -> Result<Vec<Role>> {
        self.read_roles()?;
        let state = self.state.read();
        Ok(sorted(
            state.roles.values().filter(|role| role.is_system).cloned().collect(),
        ))
    }

    async fn get(&self, role_id: RoleId) -> Result<Option<Role>> {
        self.read_roles()?;
        Ok(self.state.read().roles.get(&role_id).cloned())
    }

    async fn scopes_defining(
        &self,
        slug: &str,
        names: &[String],
        user_id: Option<&UserId>,
    ) -> Result<Vec<ScopeKey>> {
        self.read_roles()?;
        let state = self.state.read();
        let assigned = |role: &Role| {
            user_id.is_some_and(|user_id| state.assignments.contains(&(user_id.clone(), role.id)))
        };
        let defines = |role_id: Option<RoleId>| {
            role_id
                .and_then(|id| state.roles.get(&id))
                .is_some_and(|role| role.permissions.contains(slug))
        };

        let scopes: BTreeSet<ScopeKey> = state
            .roles
            .values()
            .filter(|role| {
                (role.permissions.contains(slug) && (names.contains(&role.name) || assigned(role)))
                    || (assigned(role) && defines(role.inherit_id))
            })
            .map(|role| role.scope.clone())
            .collect();

        Ok(scopes.into_iter().collect())
    }

    async fn create(&self, role: &NewRole) -> Result<Role> {
        self.check()?;
        let mut state = self.state.write();
        if let Some(parent) = role.inherit_id {
            if !state.roles.contains_key(&parent) {
                return Err(Error::NotFound(format!("Role {parent}")));
            }
        }
        state.next_role_id += 1;
        let created = role.clone().into_role(RoleId(state.next_role_id));
        state.roles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete(&self, role_id: RoleId) -> Result<bool> {
        self.check()?;
        let mut state = self.state.write();
        if state.roles.remove(&role_id).is_none() {
            return Ok(false);
        }
        state.assignments.retain(|(_, assigned)| *assigned != role_id);
        for role in state.roles.values_mut() {
            if role.inherit_id == Some(role_id) {
                role.inherit_id = None;
            }
        }
        Ok(true)
    }

    async fn set_permission(&self, role_id: RoleId, slug: &str, value: bool) -> Result<()> {
        self.check()?;
        let mut state = self.state.write();
        if !state.permissions.contains(slug) {
            return Err(Error::NotFound(format!("Role {role_id} or permission {slug}")));
        }
        let role = state
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| Error::NotFound(format!("Role {role_id} or permission {slug}")))?;
        role.permissions.set(slug, value);
        Ok(())
    }

    async fn clear_permission(&self, role_id: RoleId, slug: &str) -> Result<bool> {
        self.check()?;
        let mut state = self.state.write();
        Ok(state
            .roles
            .get_mut(&role_id)
            .and_then(|role| role.permissions.remove(slug))
            .is_some())
    }

    async fn assign(&self, user_id: &UserId, role_id: RoleId) -> Result<bool> {
        self.check()?;
        let mut state = self.state.write();
        if !state.roles.contains_key(&role_id) {
            return Err(Error::NotFound(format!("Role {role_id}")));
        }
        Ok(state.assignments.insert((user_id.clone(), role_id)))
    }

    async fn unassign(&self, user_id: &UserId, role_id: RoleId) -> Result<bool> {
        self.check()?;
        Ok(self.state.write().assignments.remove(&(user_id.clone(), role_id)))
    }

    async fn holders(&self, role_id: RoleId) -> Result<Vec<UserId>> {
        self.check()?;
        let state = self.state.read();
        Ok(state
            .assignments
            .iter()
            .filter(|(_, assigned)| *assigned == role_id)
            .map(|(user_id, _)| user_id.clone())
            .collect())
    }
}

#[async_trait]
impl PermissionRepository for MemoryStore {
    async fn exists(&self, slug: &str) -> Result<bool> {
        self.check()?;
        Ok(self.state.read().permissions.contains(slug))
    }

    async fn is_system_only(&self, slug: &str) -> Result<bool> {
        self.check()?;
        Ok(self
            .state
            .read()
            .groups
            .values()
            .any(|group| group.is_system_only && group.permissions.iter().any(|p| p == slug)))
    }

    async fn ensure_permissions(&self, slugs: &[String]) -> Result<u64> {
        self.check()?;
        let mut state = self.state.write();
        let inserted = slugs
            .iter()
            .filter(|slug| state.permissions.insert((*slug).clone()))
            .count();
        Ok(inserted as u64)
    }

    async fn ensure_groups(&self, groups: &[PermissionGroup]) -> Result<()> {
        self.check()?;
        let mut state = self.state.write();
        for group in groups {
            state.groups.insert(group.group_name.clone(), group.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl RoleCacheRepository for MemoryStore {
    async fn get(&self, user_id: Option<&UserId>, scope: &ScopeKey) -> Result<Option<CacheEntry>> {
        self.check()?;
        let key = (user_id.cloned(), scope.clone());
        Ok(self
            .state
            .read()
            .cache
            .get(&key)
            .map(|mask| CacheEntry::new(key.0.clone(), key.1.clone(), mask.clone())))
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        self.check()?;
        self.cache_writes.fetch_add(1, Ordering::SeqCst);
        self.state
            .write()
            .cache
            .insert((entry.user_id.clone(), entry.scope.clone()), entry.mask.clone());
        Ok(())
    }

    async fn delete_for_actor(&self, user_id: Option<&UserId>) -> Result<u64> {
        self.check()?;
        let mut state = self.state.write();
        let before = state.cache.len();
        state.cache.retain(|(holder, _), _| holder.as_ref() != user_id);
        Ok((before - state.cache.len()) as u64)
    }

    async fn delete_all(&self) -> Result<u64> {
        self.check()?;
        let mut state = self.state.write();
        let removed = state.cache.len() as u64;
        state.cache.clear();
        Ok(removed)
    }
}
