//! Service initialization and dependency injection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::{
    cache::{CacheInvalidationService, PermissionCache},
    repository::{
        PermissionRepository, PgPermissionRepository, PgRoleCacheRepository, PgRoleRepository,
        RoleCacheRepository, RoleRepository,
    },
    service::{MaskCompiler, PermissionService, PgTenantResolver, RoleService, TenantResolver},
    Config,
};

/// Container for all initialized services
#[derive(Clone)]
pub struct Services {
    /// Permission queries
    pub permission_service: PermissionService,
    /// Role administration with cache invalidation
    pub role_service: RoleService,
    /// Mask cache shared by both services
    pub cache: PermissionCache,
    /// Cross-node invalidation (local-only without Redis)
    pub invalidation: Arc<CacheInvalidationService>,
    pub roles: Arc<dyn RoleRepository>,
    pub permissions: Arc<dyn PermissionRepository>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("cache", &self.cache)
            .field("invalidation", &self.invalidation)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Wire services over arbitrary repositories
    #[must_use]
    pub fn with_repositories(
        roles: Arc<dyn RoleRepository>,
        permissions: Arc<dyn PermissionRepository>,
        role_cache: Arc<dyn RoleCacheRepository>,
        tenants: Arc<dyn TenantResolver>,
        l1_capacity: u64,
        invalidation: Arc<CacheInvalidationService>,
    ) -> Self {
        let cache = PermissionCache::new(role_cache, MaskCompiler::new(roles.clone()), l1_capacity)
            .with_invalidation(invalidation.clone());

        let permission_service =
            PermissionService::new(cache.clone(), roles.clone(), permissions.clone(), tenants);
        let role_service = RoleService::new(roles.clone(), permissions.clone(), cache.clone());

        Self {
            permission_service,
            role_service,
            cache,
            invalidation,
            roles,
            permissions,
        }
    }

    /// Start the Redis listener and apply received invalidations to L1
    pub fn start_invalidation(&self) -> Option<tokio::task::JoinHandle<()>> {
        self.invalidation.start();
        self.cache.spawn_invalidation_listener()
    }

    /// Stop the Redis subscriber loop
    pub fn stop_invalidation(&self) {
        self.invalidation.stop();
    }
}

/// Generate a unique node ID for this process
#[must_use]
pub fn generate_node_id() -> String {
    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    format!("{hostname}-{}", nanoid::nanoid!(6))
}

/// Initialize all services over PostgreSQL and, when configured, Redis
pub async fn init_services(pool: PgPool, config: &Config) -> Result<Services, anyhow::Error> {
    info!("Initializing services...");

    let redis_client = if config.redis_enabled() {
        Some(redis::Client::open(config.redis.url.clone())?)
    } else {
        None
    };

    let node_id = if config.cache.node_id.is_empty() {
        generate_node_id()
    } else {
        config.cache.node_id.clone()
    };

    let invalidation = Arc::new(CacheInvalidationService::new(
        redis_client,
        config.invalidation_channel(),
        node_id.clone(),
    ));
    info!(
        node_id = %node_id,
        redis = config.redis_enabled(),
        channel = %invalidation.channel(),
        "Cache invalidation initialized"
    );

    let services = Services::with_repositories(
        Arc::new(PgRoleRepository::new(pool.clone())),
        Arc::new(PgPermissionRepository::new(pool.clone())),
        Arc::new(PgRoleCacheRepository::new(pool.clone())),
        Arc::new(PgTenantResolver::new(pool)),
        config.cache.l1_capacity,
        invalidation,
    );
    info!(l1_capacity = config.cache.l1_capacity, "Permission services initialized");

    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::InvalidationMessage,
        models::{catalog, Actor, ScopeKey, UserId},
        repository::MemoryStore,
        service::CanonicalTenantResolver,
    };

    #[test]
    fn test_generate_node_id_is_unique() {
        assert_ne!(generate_node_id(), generate_node_id());
    }

    async fn memory_services() -> (Arc<MemoryStore>, Services) {
        let store = Arc::new(MemoryStore::new());
        crate::bootstrap::seed_catalog(store.as_ref(), store.as_ref()).await.unwrap();
        let invalidation = Arc::new(CacheInvalidationService::new(
            None,
            "permask:cache:invalidation".to_string(),
            "test-node".to_string(),
        ));
        let services = Services::with_repositories(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(CanonicalTenantResolver),
            100,
            invalidation,
        );
        (store, services)
    }

    #[tokio::test]
    async fn test_services_share_one_cache() {
        let (_store, services) = memory_services().await;

        let actor = Actor::anonymous();
        let scope = ScopeKey::global();
        assert!(!services.permission_service.can_post_reply(&actor, &scope).await.unwrap());

        let anonymous = services
            .roles
            .system_roles()
            .await
            .unwrap()
            .into_iter()
            .find(|role| role.name == "anonymous")
            .unwrap();
        services
            .role_service
            .set_permission(anonymous.id, catalog::BOARD_POST_CREATE_REPLY, true)
            .await
            .unwrap();

        assert!(services.permission_service.can_post_reply(&actor, &scope).await.unwrap());
    }

    #[tokio::test]
    async fn test_started_invalidation_drops_received_actor() {
        let (store, services) = memory_services().await;
        let listener = services.start_invalidation();
        assert!(listener.is_some());

        let user = UserId::from("user00000001");
        let member = Actor::registered(user.clone());
        let visitor = Actor::anonymous();
        let scope = ScopeKey::global();
        let permissions = &services.permission_service;
        permissions.can_post_reply(&member, &scope).await.unwrap();
        permissions.can_post_reply(&visitor, &scope).await.unwrap();

        services
            .invalidation
            .broadcast_all(InvalidationMessage::actor(Some(&user)))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        store.set_fail_storage(true);
        assert!(permissions.can_post_reply(&visitor, &scope).await.is_ok());
        assert!(permissions.can_post_reply(&member, &scope).await.is_err());

        services.stop_invalidation();
    }
}
