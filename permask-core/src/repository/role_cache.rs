use async_trait::async_trait;
use sqlx::{types::Json, PgPool};

use crate::{
    models::{CacheEntry, CompiledMask, ScopeKey, UserId},
    Result,
};

use super::RoleCacheRepository;

/// Mask cache rows in `role_cache`
///
/// Keys are matched through `COALESCE(col, '')` so NULL (anonymous / global)
/// compares equal to NULL, mirroring the table's unique index.
#[derive(Clone)]
pub struct PgRoleCacheRepository {
    pool: PgPool,
}

impl PgRoleCacheRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleCacheRepository for PgRoleCacheRepository {
    async fn get(&self, user_id: Option<&UserId>, scope: &ScopeKey) -> Result<Option<CacheEntry>> {
        let value: Option<Json<CompiledMask>> = sqlx::query_scalar(
            "SELECT value FROM role_cache
             WHERE COALESCE(user_id, '') = COALESCE($1, '')
               AND COALESCE(board_uri, '') = COALESCE($2, '')",
        )
        .bind(user_id)
        .bind(scope.board_uri())
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.map(|Json(mask)| CacheEntry::new(user_id.cloned(), scope.clone(), mask)))
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO role_cache (user_id, board_uri, value, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ((COALESCE(user_id, '')), (COALESCE(board_uri, '')))
             DO UPDATE SET value = EXCLUDED.value, created_at = EXCLUDED.created_at",
        )
        .bind(entry.user_id.as_ref())
        .bind(entry.scope.board_uri())
        .bind(Json(&entry.mask))
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_for_actor(&self, user_id: Option<&UserId>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM role_cache WHERE COALESCE(user_id, '') = COALESCE($1, '')")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM role_cache").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
