//! Role administration
//!
//! Every mutation drops exactly the cached masks it can change: the holders
//! of a plain role, or every mask when the role is a system or chain role.

use std::sync::Arc;

use tracing::info;

use crate::{
    cache::{mask_cache::check_actor, PermissionCache},
    models::{NewRole, Role, RoleId, UserId},
    repository::{PermissionRepository, RoleRepository},
    Error, Result,
};

#[derive(Clone)]
pub struct RoleService {
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
    cache: PermissionCache,
}

impl std::fmt::Debug for RoleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleService").finish()
    }
}

impl RoleService {
    #[must_use]
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        permissions: Arc<dyn PermissionRepository>,
        cache: PermissionCache,
    ) -> Self {
        Self {
            roles,
            permissions,
            cache,
        }
    }

    pub async fn get_role(&self, role_id: RoleId) -> Result<Role> {
        self.roles
            .get(role_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Role {role_id}")))
    }

    pub async fn create_role(&self, role: &NewRole) -> Result<Role> {
        if role.name.trim().is_empty() {
            return Err(Error::InvalidInput("Role name cannot be empty".to_string()));
        }

        if let Some(parent_id) = role.inherit_id {
            let parent = self.get_role(parent_id).await?;
            if !parent.is_system {
                return Err(Error::InvalidInput(format!(
                    "Role {parent_id} is not a system role and cannot be inherited"
                )));
            }
        }

        let created = self.roles.create(role).await?;
        info!(role_id = %created.id, name = %created.name, scope = %created.scope, "Created role");

        // Nobody holds a fresh role; only a chain role changes existing masks
        if created.is_chain_role() {
            self.cache.forget_all().await?;
        }

        Ok(created)
    }

    pub async fn delete_role(&self, role_id: RoleId) -> Result<bool> {
        let role = self.get_role(role_id).await?;
        let holders = self.roles.holders(role_id).await?;

        let deleted = self.roles.delete(role_id).await?;
        if deleted {
            info!(role_id = %role_id, name = %role.name, "Deleted role");
            self.invalidate(&role, &holders).await?;
        }

        Ok(deleted)
    }

    /// Set a slug's value on a role
    ///
    /// Slugs from system-only groups are rejected on board roles.
    pub async fn set_permission(&self, role_id: RoleId, slug: &str, value: bool) -> Result<()> {
        let role = self.get_role(role_id).await?;

        if !self.permissions.exists(slug).await? {
            return Err(Error::NotFound(format!("Permission {slug}")));
        }
        if !role.scope.is_global() && self.permissions.is_system_only(slug).await? {
            return Err(Error::InvalidInput(format!(
                "Permission {slug} can only be assigned to global roles"
            )));
        }

        self.roles.set_permission(role_id, slug, value).await?;
        info!(role_id = %role_id, slug, value, "Set role permission");

        self.invalidate_role(&role).await
    }

    /// Remove a slug from a role so it no longer overrides lighter roles
    pub async fn clear_permission(&self, role_id: RoleId, slug: &str) -> Result<bool> {
        let role = self.get_role(role_id).await?;

        let cleared = self.roles.clear_permission(role_id, slug).await?;
        if cleared {
            info!(role_id = %role_id, slug, "Cleared role permission");
            self.invalidate_role(&role).await?;
        }

        Ok(cleared)
    }

    pub async fn assign_role(&self, user_id: &UserId, role_id: RoleId) -> Result<bool> {
        check_actor(Some(user_id))?;
        self.get_role(role_id).await?;

        let assigned = self.roles.assign(user_id, role_id).await?;
        if assigned {
            info!(user_id = %user_id, role_id = %role_id, "Assigned role");
            self.cache.forget(Some(user_id)).await?;
        }

        Ok(assigned)
    }

    pub async fn unassign_role(&self, user_id: &UserId, role_id: RoleId) -> Result<bool> {
        let removed = self.roles.unassign(user_id, role_id).await?;
        if removed {
            info!(user_id = %user_id, role_id = %role_id, "Unassigned role");
            self.cache.forget(Some(user_id)).await?;
        }

        Ok(removed)
    }

    async fn invalidate_role(&self, role: &Role) -> Result<()> {
        if role.affects_every_actor() {
            return self.invalidate(role, &[]).await;
        }
        let holders = self.roles.holders(role.id).await?;
        self.invalidate(role, &holders).await
    }

    async fn invalidate(&self, role: &Role, holders: &[UserId]) -> Result<()> {
        if role.affects_every_actor() {
            self.cache.forget_all().await?;
            return Ok(());
        }

        for user_id in holders {
            self.cache.forget(Some(user_id)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{catalog, Actor, ScopeKey},
        repository::MemoryStore,
        service::{tenant::CanonicalTenantResolver, MaskCompiler, PermissionService},
        test_helpers::{test_user_id, RoleFixture},
    };

    struct Setup {
        store: Arc<MemoryStore>,
        fixture: RoleFixture,
        roles: RoleService,
        query: PermissionService,
    }

    async fn setup() -> Setup {
        let store = Arc::new(MemoryStore::with_catalog());
        let fixture = RoleFixture::new(store.clone());
        fixture.seed_system_roles().await;
        let cache = PermissionCache::new(store.clone(), MaskCompiler::new(store.clone()), 100);
        let roles = RoleService::new(store.clone(), store.clone(), cache.clone());
        let query = PermissionService::new(cache, store.clone(), store.clone(), Arc::new(CanonicalTenantResolver));
        Setup {
            store,
            fixture,
            roles,
            query,
        }
    }

    #[tokio::test]
    async fn test_assign_role_takes_effect() {
        let s = setup().await;
        let user = test_user_id("user00000001");
        let actor = Actor::registered(user.clone());
        let board = ScopeKey::board("b");
        let janitor = s.fixture.role("janitor", board.clone(), 50).await;
        s.fixture.grant(&janitor, catalog::BOARD_POST_DELETE_OTHER, true).await;

        assert!(!s.query.can_delete_locally(&actor, &board).await.unwrap());
        assert!(s.roles.assign_role(&user, janitor.id).await.unwrap());
        assert!(s.query.can_delete_locally(&actor, &board).await.unwrap());

        assert!(s.roles.unassign_role(&user, janitor.id).await.unwrap());
        assert!(!s.query.can_delete_locally(&actor, &board).await.unwrap());
    }

    #[tokio::test]
    async fn test_assign_rejects_empty_user_id() {
        let s = setup().await;
        let janitor = s.fixture.role("janitor", ScopeKey::board("b"), 50).await;

        let result = s.roles.assign_role(&test_user_id(""), janitor.id).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(s.store.holders(janitor.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chain_role_edit_flushes_everyone() {
        let s = setup().await;
        let anonymous = s.fixture.named("anonymous").await;
        let visitor = Actor::anonymous();
        let member = Actor::registered("user00000001");
        let global = ScopeKey::global();

        assert!(!s.query.can_post_reply(&visitor, &global).await.unwrap());
        assert!(!s.query.can_post_reply(&member, &global).await.unwrap());
        assert_eq!(s.store.cache_len(), 2);

        s.roles
            .set_permission(anonymous.id, catalog::BOARD_POST_CREATE_REPLY, true)
            .await
            .unwrap();
        assert_eq!(s.store.cache_len(), 0);
        assert!(s.query.can_post_reply(&visitor, &global).await.unwrap());
        assert!(s.query.can_post_reply(&member, &global).await.unwrap());
    }

    #[tokio::test]
    async fn test_plain_role_edit_forgets_only_holders() {
        let s = setup().await;
        let holder = test_user_id("user00000001");
        let janitor = s.fixture.role("janitor", ScopeKey::board("b"), 50).await;
        s.fixture.assign(&holder, &janitor).await;

        s.query
            .can_delete_locally(&Actor::registered(holder.clone()), &ScopeKey::board("b"))
            .await
            .unwrap();
        s.query
            .can_delete_locally(&Actor::registered("user00000002"), &ScopeKey::board("b"))
            .await
            .unwrap();
        assert_eq!(s.store.cache_len(), 2);

        s.roles
            .set_permission(janitor.id, catalog::BOARD_POST_DELETE_OTHER, true)
            .await
            .unwrap();
        assert_eq!(s.store.cache_len(), 1);
        assert!(s
            .query
            .can_delete_locally(&Actor::registered(holder), &ScopeKey::board("b"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_clear_permission_restores_lighter_value() {
        let s = setup().await;
        let user = test_user_id("user00000001");
        let registered = s.fixture.named("registered").await;
        s.fixture.grant(&registered, catalog::BOARD_POST_EDIT_SELF, true).await;
        let muted = s.fixture.role("muted", ScopeKey::global(), 40).await;
        s.fixture.grant(&muted, catalog::BOARD_POST_EDIT_SELF, false).await;
        s.roles.assign_role(&user, muted.id).await.unwrap();

        let actor = Actor::registered(user);
        let global = ScopeKey::global();
        assert!(!s.query.can_edit_post_with_password(&actor, &global).await.unwrap());

        assert!(s.roles.clear_permission(muted.id, catalog::BOARD_POST_EDIT_SELF).await.unwrap());
        assert!(s.query.can_edit_post_with_password(&actor, &global).await.unwrap());
        assert!(!s.roles.clear_permission(muted.id, catalog::BOARD_POST_EDIT_SELF).await.unwrap());
    }

    #[tokio::test]
    async fn test_system_only_slug_rejected_on_board_role() {
        let s = setup().await;
        let board_role = s.fixture.role("owner", ScopeKey::board("b"), 60).await;

        let result = s.roles.set_permission(board_role.id, catalog::SYS_ROLES, true).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = s.roles.set_permission(board_role.id, "no.such.slug", true).await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        let result = s.roles.set_permission(RoleId(9999), catalog::BOARD_CONFIG, true).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_role_requires_system_parent() {
        let s = setup().await;
        let plain = s.fixture.role("helper", ScopeKey::global(), 5).await;

        let result = s
            .roles
            .create_role(&NewRole::new("janitor", ScopeKey::board("b"), 50).inheriting(plain.id))
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let parent = s.fixture.system_role("janitor", 40).await;
        let child = s
            .roles
            .create_role(&NewRole::new("janitor", ScopeKey::board("b"), 50).inheriting(parent.id))
            .await
            .unwrap();
        assert_eq!(child.inherit_id, Some(parent.id));
    }

    #[tokio::test]
    async fn test_parent_edit_reaches_child_holders() {
        let s = setup().await;
        let user = test_user_id("user00000001");
        let parent = s.fixture.system_role("janitor", 40).await;
        let child = s
            .roles
            .create_role(&NewRole::new("janitor", ScopeKey::board("b"), 50).inheriting(parent.id))
            .await
            .unwrap();
        s.roles.assign_role(&user, child.id).await.unwrap();

        let actor = Actor::registered(user);
        let board = ScopeKey::board("b");
        assert!(!s.query.can_post_in_locked_threads(&actor, &board).await.unwrap());

        s.roles
            .set_permission(parent.id, catalog::BOARD_POST_LOCK_BYPASS, true)
            .await
            .unwrap();
        assert!(s.query.can_post_in_locked_threads(&actor, &board).await.unwrap());
        assert!(!s
            .query
            .can_post_in_locked_threads(&actor, &ScopeKey::board("other"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_role_forgets_holders() {
        let s = setup().await;
        let user = test_user_id("user00000001");
        let janitor = s.fixture.role("janitor", ScopeKey::board("b"), 50).await;
        s.fixture.grant(&janitor, catalog::BOARD_POST_DELETE_OTHER, true).await;
        s.roles.assign_role(&user, janitor.id).await.unwrap();

        let actor = Actor::registered(user);
        let board = ScopeKey::board("b");
        assert!(s.query.can_delete_locally(&actor, &board).await.unwrap());

        assert!(s.roles.delete_role(janitor.id).await.unwrap());
        assert!(!s.query.can_delete_locally(&actor, &board).await.unwrap());
        assert!(matches!(s.roles.delete_role(janitor.id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_board_chain_role_creation_flushes() {
        let s = setup().await;
        let visitor = Actor::anonymous();
        s.query.can_post_reply(&visitor, &ScopeKey::board("b")).await.unwrap();
        assert_eq!(s.store.cache_len(), 1);

        s.roles
            .create_role(&NewRole::new("anonymous", ScopeKey::board("b"), 1))
            .await
            .unwrap();
        assert_eq!(s.store.cache_len(), 0);
    }
}
