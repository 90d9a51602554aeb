//! Storage access for roles, the permission catalog and cached masks
//!
//! Repositories carry no policy: they return rows and apply writes. Every
//! method may suspend and may fail with a storage error.

pub mod memory;
pub mod permission;
pub mod role;
pub mod role_cache;

use async_trait::async_trait;

use crate::{
    models::{CacheEntry, NewRole, PermissionGroup, Role, RoleId, ScopeKey, UserId},
    Result,
};

pub use memory::MemoryStore;
pub use permission::PgPermissionRepository;
pub use role::PgRoleRepository;
pub use role_cache::PgRoleCacheRepository;

/// Role definitions, their permission values and direct assignments
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Roles named in `names` whose scope is global or equal to `scope`
    async fn chain_roles(&self, names: &[String], scope: &ScopeKey) -> Result<Vec<Role>>;

    /// Roles directly assigned to a registered user, in every scope
    async fn assigned_roles(&self, user_id: &UserId) -> Result<Vec<Role>>;

    /// All roles flagged as system roles
    async fn system_roles(&self) -> Result<Vec<Role>>;

    async fn get(&self, role_id: RoleId) -> Result<Option<Role>>;

    /// Scopes of roles that assign any value to `slug` and are either named in
    /// `names` or directly assigned to `user_id`, plus the scopes of assigned
    /// roles whose parent assigns it
    async fn scopes_defining(
        &self,
        slug: &str,
        names: &[String],
        user_id: Option<&UserId>,
    ) -> Result<Vec<ScopeKey>>;

    async fn create(&self, role: &NewRole) -> Result<Role>;

    async fn delete(&self, role_id: RoleId) -> Result<bool>;

    async fn set_permission(&self, role_id: RoleId, slug: &str, value: bool) -> Result<()>;

    async fn clear_permission(&self, role_id: RoleId, slug: &str) -> Result<bool>;

    async fn assign(&self, user_id: &UserId, role_id: RoleId) -> Result<bool>;

    async fn unassign(&self, user_id: &UserId, role_id: RoleId) -> Result<bool>;

    /// Users directly assigned to a role
    async fn holders(&self, role_id: RoleId) -> Result<Vec<UserId>>;
}

/// The permission catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn exists(&self, slug: &str) -> Result<bool>;

    /// Whether the slug belongs to a group restricted to global roles
    async fn is_system_only(&self, slug: &str) -> Result<bool>;

    /// Insert missing slugs, returning how many were new
    async fn ensure_permissions(&self, slugs: &[String]) -> Result<u64>;

    /// Upsert groups and replace their slug memberships
    async fn ensure_groups(&self, groups: &[PermissionGroup]) -> Result<()>;
}

/// Persisted masks keyed by (actor, scope)
#[async_trait]
pub trait RoleCacheRepository: Send + Sync {
    /// Exact-key lookup; `None` user means the shared anonymous entry
    async fn get(&self, user_id: Option<&UserId>, scope: &ScopeKey) -> Result<Option<CacheEntry>>;

    /// Atomically replace the entry for the entry's key
    async fn put(&self, entry: &CacheEntry) -> Result<()>;

    /// Delete every entry for an actor across all scopes
    async fn delete_for_actor(&self, user_id: Option<&UserId>) -> Result<u64>;

    async fn delete_all(&self) -> Result<u64>;
}
