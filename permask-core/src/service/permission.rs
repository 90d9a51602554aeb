//! Permission queries
//!
//! The API the rest of the platform calls. Every answer is read from the
//! compiled mask of the actor's active route: the board slice when it holds
//! the slug, else the global slice, else `false`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error};

use crate::{
    cache::PermissionCache,
    models::{catalog, BoardUri, CompiledMask, IdentityProvider, Role, Route, ScopeKey, UserId},
    repository::{PermissionRepository, RoleRepository},
    Error, Result,
};

use super::{
    route::{build_routes, chain_role_names},
    tenant::TenantResolver,
};

/// Boards an actor may configure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardAccess {
    /// Every board, through a global grant
    All,
    /// Only the listed boards
    Only(Vec<BoardUri>),
}

/// Permission query service
#[derive(Clone)]
pub struct PermissionService {
    cache: PermissionCache,
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
    tenants: Arc<dyn TenantResolver>,
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionService").finish()
    }
}

/// Look up a slug for one route: board slice first, then global, then deny
fn lookup(mask: &CompiledMask, route: Route, slug: &str, scope: &ScopeKey) -> bool {
    if !scope.is_global() {
        if let Some(value) = mask.get(route, scope).and_then(|slice| slice.get(slug)) {
            return value;
        }
    }
    mask.get(route, &ScopeKey::global())
        .and_then(|slice| slice.get(slug))
        .unwrap_or(false)
}

/// The cache key of an actor: anonymous actors share one entry
fn actor_key(actor: &dyn IdentityProvider) -> Option<&UserId> {
    if actor.is_anonymous() {
        None
    } else {
        actor.user_id()
    }
}

impl PermissionService {
    #[must_use]
    pub fn new(
        cache: PermissionCache,
        roles: Arc<dyn RoleRepository>,
        permissions: Arc<dyn PermissionRepository>,
        tenants: Arc<dyn TenantResolver>,
    ) -> Self {
        Self {
            cache,
            roles,
            permissions,
            tenants,
        }
    }

    #[must_use]
    pub const fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// Value of `slug` for `actor` in `scope`; unknown slugs are `false`
    pub async fn permission(
        &self,
        actor: &dyn IdentityProvider,
        slug: &str,
        scope: &ScopeKey,
    ) -> Result<bool> {
        let route = actor.active_route();
        let mask = self.cache.get_mask(actor_key(actor), scope).await?;
        Ok(lookup(&mask, route, slug, scope))
    }

    /// [`permission`](Self::permission) for a board handle such as `/b/`
    pub async fn permission_on(
        &self,
        actor: &dyn IdentityProvider,
        slug: &str,
        board: &str,
    ) -> Result<bool> {
        let scope = self.tenants.resolve(board).await?;
        self.permission(actor, slug, &scope).await
    }

    /// True when `slug` holds globally or on any board where a role the actor
    /// draws from defines it
    pub async fn permission_any(&self, actor: &dyn IdentityProvider, slug: &str) -> Result<bool> {
        if self.permission(actor, slug, &ScopeKey::global()).await? {
            return Ok(true);
        }

        self.ensure_slug(slug).await?;

        for scope in self.candidate_scopes(actor, slug).await? {
            if scope.is_global() {
                continue;
            }
            if self.permission(actor, slug, &scope).await? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Boards where `slug` is defined by an applicable role and holds
    ///
    /// Boards only reached through a global grant are not listed.
    pub async fn can_in_boards(&self, actor: &dyn IdentityProvider, slug: &str) -> Result<Vec<BoardUri>> {
        self.ensure_slug(slug).await?;

        let mut boards = BTreeSet::new();
        for scope in self.candidate_scopes(actor, slug).await? {
            let Some(uri) = scope.board_uri() else {
                continue;
            };
            if self.permission(actor, slug, &scope).await? {
                boards.insert(uri.clone());
            }
        }

        Ok(boards.into_iter().collect())
    }

    /// Drop every cached mask of `actor`
    pub async fn forget_permissions(&self, actor: &dyn IdentityProvider) -> Result<u64> {
        self.cache.forget(actor_key(actor)).await
    }

    /// Fail-closed check: any error is logged and treated as a denial
    pub async fn allows(&self, actor: &dyn IdentityProvider, slug: &str, scope: &ScopeKey) -> bool {
        match self.permission(actor, slug, scope).await {
            Ok(allowed) => allowed,
            Err(e) => {
                error!(
                    error = %e,
                    storage_failure = e.is_storage_failure(),
                    user_id = ?actor.user_id(),
                    slug,
                    scope = %scope,
                    "Permission check failed, denying"
                );
                false
            }
        }
    }

    /// Check a permission, turning a denial into [`Error::Authorization`]
    pub async fn require(&self, actor: &dyn IdentityProvider, slug: &str, scope: &ScopeKey) -> Result<()> {
        if self.permission(actor, slug, scope).await? {
            Ok(())
        } else {
            debug!(user_id = ?actor.user_id(), slug, scope = %scope, "Permission denied");
            Err(Error::Authorization("Permission denied".to_string()))
        }
    }

    async fn ensure_slug(&self, slug: &str) -> Result<()> {
        if self.permissions.exists(slug).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Permission {slug}")))
        }
    }

    async fn candidate_scopes(&self, actor: &dyn IdentityProvider, slug: &str) -> Result<Vec<ScopeKey>> {
        let user_id = actor_key(actor);
        let names = chain_role_names(&build_routes(user_id.is_none()));
        self.roles.scopes_defining(slug, &names, user_id).await
    }

    // Named checks

    pub async fn can_admin_boards(&self, actor: &dyn IdentityProvider) -> Result<bool> {
        self.permission(actor, catalog::SYS_BOARDS, &ScopeKey::global()).await
    }

    pub async fn can_admin_cache(&self, actor: &dyn IdentityProvider) -> Result<bool> {
        self.permission(actor, catalog::SYS_CACHE, &ScopeKey::global()).await
    }

    pub async fn can_admin_logs(&self, actor: &dyn IdentityProvider) -> Result<bool> {
        self.permission(actor, catalog::SYS_LOGS, &ScopeKey::global()).await
    }

    pub async fn can_admin_roles(&self, actor: &dyn IdentityProvider) -> Result<bool> {
        self.permission(actor, catalog::SYS_ROLES, &ScopeKey::global()).await
    }

    pub async fn can_admin_payments(&self, actor: &dyn IdentityProvider) -> Result<bool> {
        self.permission(actor, catalog::SYS_PAYMENTS, &ScopeKey::global()).await
    }

    pub async fn can_admin_permissions(&self, actor: &dyn IdentityProvider) -> Result<bool> {
        self.permission(actor, catalog::SYS_PERMISSIONS, &ScopeKey::global()).await
    }

    pub async fn can_delete_locally(&self, actor: &dyn IdentityProvider, board: &ScopeKey) -> Result<bool> {
        self.permission(actor, catalog::BOARD_POST_DELETE_OTHER, board).await
    }

    pub async fn can_delete_post_with_password(
        &self,
        actor: &dyn IdentityProvider,
        board: &ScopeKey,
    ) -> Result<bool> {
        self.permission(actor, catalog::BOARD_POST_DELETE_SELF, board).await
    }

    pub async fn can_edit_post_with_password(
        &self,
        actor: &dyn IdentityProvider,
        board: &ScopeKey,
    ) -> Result<bool> {
        self.permission(actor, catalog::BOARD_POST_EDIT_SELF, board).await
    }

    pub async fn can_post_reply(&self, actor: &dyn IdentityProvider, board: &ScopeKey) -> Result<bool> {
        self.permission(actor, catalog::BOARD_POST_CREATE_REPLY, board).await
    }

    pub async fn can_post_in_locked_threads(
        &self,
        actor: &dyn IdentityProvider,
        board: &ScopeKey,
    ) -> Result<bool> {
        self.permission(actor, catalog::BOARD_POST_LOCK_BYPASS, board).await
    }

    pub async fn can_remove_attachment_with_password(
        &self,
        actor: &dyn IdentityProvider,
        board: &ScopeKey,
    ) -> Result<bool> {
        self.permission(actor, catalog::BOARD_ATTACHMENT_DELETE_SELF, board).await
    }

    pub async fn can_spoiler_attachment_locally(
        &self,
        actor: &dyn IdentityProvider,
        board: &ScopeKey,
    ) -> Result<bool> {
        self.permission(actor, catalog::BOARD_ATTACHMENT_SPOILER_OTHER, board).await
    }

    pub async fn can_spoiler_attachment_with_password(
        &self,
        actor: &dyn IdentityProvider,
        board: &ScopeKey,
    ) -> Result<bool> {
        self.permission(actor, catalog::BOARD_ATTACHMENT_SPOILER_SELF, board).await
    }

    pub async fn can_spoiler_attachment_globally(&self, actor: &dyn IdentityProvider) -> Result<bool> {
        self.permission(actor, catalog::BOARD_ATTACHMENT_SPOILER_OTHER, &ScopeKey::global()).await
    }

    pub async fn can_view_unindexed_boards(&self, actor: &dyn IdentityProvider) -> Result<bool> {
        self.permission(actor, catalog::SITE_BOARD_VIEW_UNINDEXED, &ScopeKey::global()).await
    }

    /// Boards where the actor may handle ban appeals
    pub async fn can_manage_appeals_in(&self, actor: &dyn IdentityProvider) -> Result<Vec<BoardUri>> {
        self.can_in_boards(actor, catalog::BOARD_USER_UNBAN).await
    }

    /// Boards whose configuration the actor may edit
    pub async fn boards_with_config_rights(&self, actor: &dyn IdentityProvider) -> Result<BoardAccess> {
        if actor.is_anonymous() {
            return Ok(BoardAccess::Only(Vec::new()));
        }

        if self.permission(actor, catalog::BOARD_CONFIG, &ScopeKey::global()).await? {
            return Ok(BoardAccess::All);
        }

        Ok(BoardAccess::Only(
            self.can_in_boards(actor, catalog::BOARD_CONFIG).await?,
        ))
    }

    /// Boards where the actor counts as staff; same as config rights
    pub async fn boards_with_staff_rights(&self, actor: &dyn IdentityProvider) -> Result<BoardAccess> {
        self.boards_with_config_rights(actor).await
    }

    /// Boards whose assets the actor may manage; same as config rights
    pub async fn boards_with_asset_rights(&self, actor: &dyn IdentityProvider) -> Result<BoardAccess> {
        self.boards_with_config_rights(actor).await
    }

    /// Directly assigned roles with a capcode usable on `board`
    ///
    /// A role qualifies when it is global or bound to `board`. Ordered by
    /// weight; anonymous actors have none.
    pub async fn capcodes(&self, actor: &dyn IdentityProvider, board: &ScopeKey) -> Result<Vec<Role>> {
        let Some(user_id) = actor_key(actor) else {
            return Ok(Vec::new());
        };

        Ok(self
            .roles
            .assigned_roles(user_id)
            .await?
            .into_iter()
            .filter(|role| role.capcode.is_some() && role.scope.applies_in(board))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Actor, NewRole, Role},
        repository::{MemoryStore, MockPermissionRepository},
        service::{tenant::CanonicalTenantResolver, MaskCompiler},
        test_helpers::{test_user_id, RoleFixture},
    };

    struct Setup {
        fixture: RoleFixture,
        service: PermissionService,
    }

    impl Setup {
        async fn new() -> Self {
            let store = Arc::new(MemoryStore::with_catalog());
            let fixture = RoleFixture::new(store.clone());
            fixture.seed_system_roles().await;
            let cache = PermissionCache::new(store.clone(), MaskCompiler::new(store.clone()), 100);
            let service = PermissionService::new(cache, store.clone(), store, Arc::new(CanonicalTenantResolver));
            Self { fixture, service }
        }

        async fn system(&self, name: &str) -> Role {
            self.fixture.named(name).await
        }
    }

    #[tokio::test]
    async fn test_default_deny() {
        let setup = Setup::new().await;
        let actor = Actor::registered("user00000001");

        for slug in [catalog::SYS_ROLES, catalog::BOARD_CONFIG, "not.a.slug"] {
            assert!(!setup.service.permission(&actor, slug, &ScopeKey::board("b")).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_board_false_masks_global_true() {
        let setup = Setup::new().await;
        let anonymous = setup.system("anonymous").await;
        setup.fixture.grant(&anonymous, catalog::BOARD_POST_CREATE_REPLY, true).await;
        let board_role = setup.fixture.role("anonymous", ScopeKey::board("t"), 0).await;
        setup.fixture.grant(&board_role, catalog::BOARD_POST_CREATE_REPLY, false).await;

        let actor = Actor::anonymous();
        let service = &setup.service;
        assert!(!service.permission(&actor, catalog::BOARD_POST_CREATE_REPLY, &ScopeKey::board("t")).await.unwrap());
        assert!(service.permission(&actor, catalog::BOARD_POST_CREATE_REPLY, &ScopeKey::global()).await.unwrap());
        assert!(service.permission(&actor, catalog::BOARD_POST_CREATE_REPLY, &ScopeKey::board("u")).await.unwrap());
    }

    #[tokio::test]
    async fn test_board_value_beats_heavier_global_value() {
        let setup = Setup::new().await;
        let registered = setup.system("registered").await;
        setup.fixture.grant(&registered, catalog::BOARD_POST_EDIT_SELF, true).await;
        let board_role = setup.fixture.role("anonymous", ScopeKey::board("t"), 0).await;
        setup.fixture.grant(&board_role, catalog::BOARD_POST_EDIT_SELF, false).await;

        let actor = Actor::registered("user00000001");
        assert!(!setup.service.permission(&actor, catalog::BOARD_POST_EDIT_SELF, &ScopeKey::board("t")).await.unwrap());
    }

    #[tokio::test]
    async fn test_unaccountable_route() {
        let setup = Setup::new().await;
        let registered = setup.system("registered").await;
        setup.fixture.grant(&registered, catalog::BOARD_ATTACHMENT_SPOILER_SELF, true).await;
        let unaccountable = setup.system("unaccountable").await;
        setup.fixture.grant(&unaccountable, catalog::BOARD_ATTACHMENT_SPOILER_SELF, false).await;

        let accountable = Actor::registered("user00000001");
        let risky = Actor::registered("user00000001").with_accountable(false);
        let board = ScopeKey::board("b");
        let slug = catalog::BOARD_ATTACHMENT_SPOILER_SELF;

        assert!(setup.service.permission(&accountable, slug, &board).await.unwrap());
        assert!(!setup.service.permission(&risky, slug, &board).await.unwrap());
    }

    #[tokio::test]
    async fn test_anonymous_reply_on_any_board() {
        let setup = Setup::new().await;
        let anonymous = setup.system("anonymous").await;
        setup.fixture.grant(&anonymous, catalog::BOARD_POST_CREATE_REPLY, true).await;

        let allowed = setup
            .service
            .can_post_reply(&Actor::anonymous(), &ScopeKey::board("x"))
            .await
            .unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    async fn test_can_in_boards() {
        let setup = Setup::new().await;
        let user = test_user_id("user00000001");
        let on_a = setup.fixture.role("moderator", ScopeKey::board("a"), 100).await;
        setup.fixture.grant(&on_a, catalog::BOARD_USER_UNBAN, true).await;
        let on_b = setup.fixture.role("moderator", ScopeKey::board("b"), 100).await;
        setup.fixture.grant(&on_b, catalog::BOARD_USER_UNBAN, false).await;
        let on_c = setup.fixture.role("moderator", ScopeKey::board("c"), 100).await;
        setup.fixture.grant(&on_c, catalog::BOARD_POST_DELETE_OTHER, true).await;
        for role in [&on_a, &on_b, &on_c] {
            setup.fixture.assign(&user, role).await;
        }

        let actor = Actor::registered(user);
        let boards = setup.service.can_manage_appeals_in(&actor).await.unwrap();
        assert_eq!(boards, vec![BoardUri::from("a")]);
    }

    #[tokio::test]
    async fn test_can_in_boards_ignores_global_grants() {
        let setup = Setup::new().await;
        let registered = setup.system("registered").await;
        setup.fixture.grant(&registered, catalog::BOARD_USER_UNBAN, true).await;

        let boards = setup
            .service
            .can_in_boards(&Actor::registered("user00000001"), catalog::BOARD_USER_UNBAN)
            .await
            .unwrap();
        assert!(boards.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_slug_is_not_found() {
        let setup = Setup::new().await;
        let actor = Actor::registered("user00000001");

        let result = setup.service.can_in_boards(&actor, "no.such.slug").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        let result = setup.service.permission_any(&actor, "no.such.slug").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_permission_any() {
        let setup = Setup::new().await;
        let user = test_user_id("user00000001");
        let actor = Actor::registered(user.clone());
        assert!(!setup.service.permission_any(&actor, catalog::BOARD_POST_DELETE_OTHER).await.unwrap());

        let janitor = setup.fixture.role("janitor", ScopeKey::board("b"), 50).await;
        setup.fixture.grant(&janitor, catalog::BOARD_POST_DELETE_OTHER, true).await;
        setup.fixture.assign(&user, &janitor).await;
        setup.service.forget_permissions(&actor).await.unwrap();

        assert!(setup.service.permission_any(&actor, catalog::BOARD_POST_DELETE_OTHER).await.unwrap());
        assert!(!setup.service.can_delete_locally(&actor, &ScopeKey::global()).await.unwrap());
    }

    #[tokio::test]
    async fn test_boards_with_config_rights() {
        let setup = Setup::new().await;
        let user = test_user_id("user00000001");
        let actor = Actor::registered(user.clone());

        let owner = setup.fixture.role("owner", ScopeKey::board("mine"), 90).await;
        setup.fixture.grant(&owner, catalog::BOARD_CONFIG, true).await;
        setup.fixture.assign(&user, &owner).await;
        assert_eq!(
            setup.service.boards_with_config_rights(&actor).await.unwrap(),
            BoardAccess::Only(vec![BoardUri::from("mine")])
        );

        let admin = setup.fixture.role("admin", ScopeKey::global(), 900).await;
        setup.fixture.grant(&admin, catalog::BOARD_CONFIG, true).await;
        setup.fixture.assign(&user, &admin).await;
        setup.service.forget_permissions(&actor).await.unwrap();
        assert_eq!(setup.service.boards_with_config_rights(&actor).await.unwrap(), BoardAccess::All);

        assert_eq!(
            setup.service.boards_with_config_rights(&Actor::anonymous()).await.unwrap(),
            BoardAccess::Only(Vec::new())
        );
    }

    #[tokio::test]
    async fn test_permission_on_resolves_handle() {
        let setup = Setup::new().await;
        let board_role = setup.fixture.role("anonymous", ScopeKey::board("tech"), 0).await;
        setup.fixture.grant(&board_role, catalog::BOARD_POST_CREATE_REPLY, true).await;

        let actor = Actor::anonymous();
        assert!(setup.service.permission_on(&actor, catalog::BOARD_POST_CREATE_REPLY, "/tech/").await.unwrap());
        assert!(matches!(
            setup.service.permission_on(&actor, catalog::BOARD_POST_CREATE_REPLY, "").await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_fail_closed() {
        let store = Arc::new(MemoryStore::with_catalog());
        let cache = PermissionCache::new(store.clone(), MaskCompiler::new(store.clone()), 100);
        let service = PermissionService::new(cache, store.clone(), store.clone(), Arc::new(CanonicalTenantResolver));
        let anonymous = RoleFixture::new(store.clone()).system_role("anonymous", 0).await;
        RoleFixture::new(store.clone())
            .grant(&anonymous, catalog::BOARD_POST_CREATE_REPLY, true)
            .await;
        store.set_fail_storage(true);

        let actor = Actor::anonymous();
        let scope = ScopeKey::global();
        assert!(!service.allows(&actor, catalog::BOARD_POST_CREATE_REPLY, &scope).await);
        let err = service
            .require(&actor, catalog::BOARD_POST_CREATE_REPLY, &scope)
            .await
            .unwrap_err();
        assert!(err.is_storage_failure());

        store.set_fail_storage(false);
        assert!(service.allows(&actor, catalog::BOARD_POST_CREATE_REPLY, &scope).await);
        assert!(matches!(
            service.require(&actor, catalog::SYS_ROLES, &scope).await,
            Err(Error::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let store = Arc::new(MemoryStore::with_catalog());
        let mut permissions = MockPermissionRepository::new();
        permissions
            .expect_exists()
            .returning(|_| Err(Error::StorageUnavailable("catalog offline".to_string())));

        let cache = PermissionCache::new(store.clone(), MaskCompiler::new(store.clone()), 100);
        let service = PermissionService::new(cache, store, Arc::new(permissions), Arc::new(CanonicalTenantResolver));

        let result = service
            .can_in_boards(&Actor::registered("user00000001"), catalog::BOARD_USER_UNBAN)
            .await;
        assert!(result.unwrap_err().is_storage_failure());
    }

    /// A global system `moderator` granting `slug`, a board-`a` child
    /// inheriting it, and the child assigned to `user00000001`
    async fn inherited_moderator(setup: &Setup, slug: &str) -> Actor {
        let moderator = setup.fixture.system_role("moderator", 100).await;
        setup.fixture.grant(&moderator, slug, true).await;
        let janitor = setup
            .fixture
            .store()
            .create(&NewRole::new("janitor", ScopeKey::board("a"), 50).inheriting(moderator.id))
            .await
            .unwrap();
        let user = test_user_id("user00000001");
        setup.fixture.assign(&user, &janitor).await;
        Actor::registered(user)
    }

    #[tokio::test]
    async fn test_inherited_parent_lands_in_child_board() {
        let setup = Setup::new().await;
        let actor = inherited_moderator(&setup, catalog::BOARD_USER_UNBAN).await;
        let service = &setup.service;

        assert!(service.permission(&actor, catalog::BOARD_USER_UNBAN, &ScopeKey::board("a")).await.unwrap());
        assert!(!service.permission(&actor, catalog::BOARD_USER_UNBAN, &ScopeKey::global()).await.unwrap());
        assert!(!service.permission(&actor, catalog::BOARD_USER_UNBAN, &ScopeKey::board("b")).await.unwrap());
    }

    #[tokio::test]
    async fn test_board_enumeration_follows_inherited_parent() {
        let setup = Setup::new().await;
        let actor = inherited_moderator(&setup, catalog::BOARD_USER_UNBAN).await;
        let service = &setup.service;

        assert_eq!(
            service.can_in_boards(&actor, catalog::BOARD_USER_UNBAN).await.unwrap(),
            vec![BoardUri::from("a")]
        );
        assert_eq!(
            service.can_manage_appeals_in(&actor).await.unwrap(),
            vec![BoardUri::from("a")]
        );
        assert!(service.permission_any(&actor, catalog::BOARD_USER_UNBAN).await.unwrap());
    }

    #[tokio::test]
    async fn test_config_rights_through_inherited_parent() {
        let setup = Setup::new().await;
        let actor = inherited_moderator(&setup, catalog::BOARD_CONFIG).await;
        let expected = BoardAccess::Only(vec![BoardUri::from("a")]);

        assert_eq!(setup.service.boards_with_config_rights(&actor).await.unwrap(), expected);
        assert_eq!(setup.service.boards_with_staff_rights(&actor).await.unwrap(), expected);
        assert_eq!(setup.service.boards_with_asset_rights(&actor).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_attachment_and_permission_admin_checks() {
        let setup = Setup::new().await;
        let registered = setup.system("registered").await;
        setup.fixture.grant(&registered, catalog::SYS_PERMISSIONS, true).await;
        setup.fixture.grant(&registered, catalog::BOARD_ATTACHMENT_DELETE_SELF, true).await;
        let janitor = setup.fixture.role("janitor", ScopeKey::board("b"), 50).await;
        setup.fixture.grant(&janitor, catalog::BOARD_ATTACHMENT_SPOILER_OTHER, true).await;
        let user = test_user_id("user00000001");
        setup.fixture.assign(&user, &janitor).await;

        let actor = Actor::registered(user);
        let board = ScopeKey::board("b");
        let service = &setup.service;
        assert!(service.can_admin_permissions(&actor).await.unwrap());
        assert!(!service.can_admin_permissions(&Actor::anonymous()).await.unwrap());
        assert!(service.can_remove_attachment_with_password(&actor, &board).await.unwrap());
        assert!(service.can_spoiler_attachment_locally(&actor, &board).await.unwrap());
        assert!(!service.can_spoiler_attachment_globally(&actor).await.unwrap());
    }

    #[tokio::test]
    async fn test_capcodes_for_board() {
        let setup = Setup::new().await;
        let store = setup.fixture.store();
        let admin = store
            .create(&NewRole::new("admin", ScopeKey::global(), 900).with_capcode("Admin"))
            .await
            .unwrap();
        let board_mod = store
            .create(&NewRole::new("janitor", ScopeKey::board("b"), 50).with_capcode("Janitor"))
            .await
            .unwrap();
        let other_board = store
            .create(&NewRole::new("janitor", ScopeKey::board("c"), 50).with_capcode("Janitor"))
            .await
            .unwrap();
        let plain = setup.fixture.role("helper", ScopeKey::global(), 10).await;
        let user = test_user_id("user00000001");
        for role in [&admin, &board_mod, &other_board, &plain] {
            setup.fixture.assign(&user, role).await;
        }

        let capcodes: Vec<_> = setup
            .service
            .capcodes(&Actor::registered(user), &ScopeKey::board("b"))
            .await
            .unwrap()
            .into_iter()
            .map(|role| role.id)
            .collect();
        assert_eq!(capcodes, vec![board_mod.id, admin.id]);

        let anonymous = setup.service.capcodes(&Actor::anonymous(), &ScopeKey::board("b")).await.unwrap();
        assert!(anonymous.is_empty());
    }
}
