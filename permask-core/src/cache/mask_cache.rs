//! Compiled mask cache (L1: Moka in-memory, L2: `role_cache` rows)
//!
//! Lookups check the node-local L1 first, then the persisted row. On a miss
//! every route is compiled and written as one row before anything is
//! returned. Entries never expire; they are only dropped by [`forget`] and
//! [`forget_all`].
//!
//! [`forget`]: PermissionCache::forget
//! [`forget_all`]: PermissionCache::forget_all

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    metrics,
    models::{CacheEntry, CompiledMask, PermissionMap, Route, ScopeKey, UserId},
    repository::RoleCacheRepository,
    service::{build_routes, MaskCompiler},
    Error, Result,
};

use super::invalidation::{CacheInvalidationService, InvalidationMessage};

type L1Key = (Option<UserId>, ScopeKey);

/// Default L1 capacity (entries)
pub const DEFAULT_L1_CAPACITY: u64 = 50_000;

/// Reject registered actors without an ID; stored rows key anonymous on `''`
pub(crate) fn check_actor(user_id: Option<&UserId>) -> Result<()> {
    if user_id.is_some_and(UserId::is_empty) {
        return Err(Error::InvalidInput("User ID must not be empty".to_string()));
    }
    Ok(())
}

/// Read-through mask cache keyed by (actor, scope)
#[derive(Clone)]
pub struct PermissionCache {
    store: Arc<dyn RoleCacheRepository>,
    compiler: MaskCompiler,
    l1: moka::future::Cache<L1Key, Arc<CompiledMask>>,
    invalidation: Option<Arc<CacheInvalidationService>>,
}

impl std::fmt::Debug for PermissionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionCache")
            .field("l1_entries", &self.l1.entry_count())
            .field("invalidation", &self.invalidation)
            .finish()
    }
}

impl PermissionCache {
    #[must_use]
    pub fn new(store: Arc<dyn RoleCacheRepository>, compiler: MaskCompiler, l1_capacity: u64) -> Self {
        let l1 = moka::future::CacheBuilder::new(l1_capacity)
            .support_invalidation_closures()
            .build();

        Self {
            store,
            compiler,
            l1,
            invalidation: None,
        }
    }

    /// Publish forgets and flushes to other nodes through `invalidation`
    #[must_use]
    pub fn with_invalidation(mut self, invalidation: Arc<CacheInvalidationService>) -> Self {
        self.invalidation = Some(invalidation);
        self
    }

    #[must_use]
    pub const fn compiler(&self) -> &MaskCompiler {
        &self.compiler
    }

    /// The full mask for (actor, scope), compiling and persisting it on a miss
    pub async fn get_mask(&self, user_id: Option<&UserId>, scope: &ScopeKey) -> Result<Arc<CompiledMask>> {
        check_actor(user_id)?;
        let key: L1Key = (user_id.cloned(), scope.clone());

        if let Some(mask) = self.l1.get(&key).await {
            metrics::cache::MASK_CACHE_HITS.with_label_values(&["l1"]).inc();
            return Ok(mask);
        }
        metrics::cache::MASK_CACHE_MISSES.with_label_values(&["l1"]).inc();

        if let Some(entry) = self.store.get(user_id, scope).await? {
            metrics::cache::MASK_CACHE_HITS.with_label_values(&["store"]).inc();
            debug!(user_id = ?user_id, scope = %scope, "Mask cache hit (store)");
            let mask = Arc::new(entry.mask);
            self.l1.insert(key, mask.clone()).await;
            return Ok(mask);
        }
        metrics::cache::MASK_CACHE_MISSES.with_label_values(&["store"]).inc();
        debug!(user_id = ?user_id, scope = %scope, "Mask cache miss, compiling");

        let routes = build_routes(user_id.is_none());
        let mask = self.compiler.compile(&routes, scope, user_id).await?;
        let entry = CacheEntry::new(user_id.cloned(), scope.clone(), mask);
        self.store.put(&entry).await?;

        let mask = Arc::new(entry.mask);
        self.l1.insert(key, mask.clone()).await;
        Ok(mask)
    }

    /// The map for one route in exactly `scope` (no global fallback)
    pub async fn get_or_compute(
        &self,
        user_id: Option<&UserId>,
        scope: &ScopeKey,
        route: Route,
    ) -> Result<PermissionMap> {
        Ok(self.get_mask(user_id, scope).await?.slice(route, scope))
    }

    /// Drop every mask of one actor, here and on other nodes
    pub async fn forget(&self, user_id: Option<&UserId>) -> Result<u64> {
        check_actor(user_id)?;
        let removed = self.store.delete_for_actor(user_id).await?;
        self.forget_local(user_id.cloned())?;
        metrics::cache::MASK_CACHE_FLUSHES.with_label_values(&["actor"]).inc();

        if let Some(invalidation) = &self.invalidation {
            invalidation.invalidate_actor(user_id).await?;
        }

        debug!(user_id = ?user_id, removed, "Forgot actor permission masks");
        Ok(removed)
    }

    /// Drop every mask of every actor, here and on other nodes
    pub async fn forget_all(&self) -> Result<u64> {
        let removed = self.store.delete_all().await?;
        self.l1.invalidate_all();
        metrics::cache::MASK_CACHE_FLUSHES.with_label_values(&["all"]).inc();

        if let Some(invalidation) = &self.invalidation {
            invalidation.invalidate_all().await?;
        }

        info!(removed, "Flushed all permission masks");
        Ok(removed)
    }

    /// Apply an invalidation received from another node to L1 only
    pub fn apply(&self, message: &InvalidationMessage) -> Result<()> {
        match message {
            InvalidationMessage::Actor { user_id } => {
                self.forget_local(user_id.as_deref().map(UserId::from))
            }
            InvalidationMessage::All => {
                self.l1.invalidate_all();
                Ok(())
            }
        }
    }

    fn forget_local(&self, user_id: Option<UserId>) -> Result<()> {
        self.l1
            .invalidate_entries_if(move |(holder, _), _| *holder == user_id)
            .map(|_| ())
            .map_err(|e| Error::Internal(format!("Failed to invalidate L1 masks: {e}")))
    }

    /// Apply every message the invalidation service receives until it closes
    #[must_use]
    pub fn spawn_invalidation_listener(&self) -> Option<JoinHandle<()>> {
        let mut receiver = self.invalidation.as_ref()?.subscribe();
        let cache = self.clone();

        Some(tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(message) => {
                        if let Err(e) = cache.apply(&message) {
                            warn!(error = %e, ?message, "Failed to apply mask invalidation");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed mask invalidations, clearing L1");
                        cache.l1.invalidate_all();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    }
}
