use async_trait::async_trait;
use sqlx::PgPool;

use crate::{models::PermissionGroup, Result};

use super::PermissionRepository;

/// Permission catalog backed by PostgreSQL
#[derive(Clone)]
pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn exists(&self, slug: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM permissions WHERE permission_id = $1)",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn is_system_only(&self, slug: &str) -> Result<bool> {
        let system_only = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1
                FROM permission_group_assignments pga
                JOIN permission_groups pg ON pg.group_name = pga.group_name
                WHERE pga.permission_id = $1 AND pg.is_system_only = TRUE
             )",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(system_only)
    }

    async fn ensure_permissions(&self, slugs: &[String]) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO permissions (permission_id)
             SELECT UNNEST($1::TEXT[])
             ON CONFLICT (permission_id) DO NOTHING",
        )
        .bind(slugs)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn ensure_groups(&self, groups: &[PermissionGroup]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for group in groups {
            sqlx::query(
                "INSERT INTO permission_groups (group_name, display_order, is_system_only, is_account_only)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (group_name) DO UPDATE SET
                    display_order = EXCLUDED.display_order,
                    is_system_only = EXCLUDED.is_system_only,
                    is_account_only = EXCLUDED.is_account_only",
            )
            .bind(&group.group_name)
            .bind(group.display_order)
            .bind(group.is_system_only)
            .bind(group.is_account_only)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM permission_group_assignments WHERE group_name = $1")
                .bind(&group.group_name)
                .execute(&mut *tx)
                .await?;

            for (index, slug) in group.permissions.iter().enumerate() {
                let display_order = i32::try_from(index * 10).unwrap_or(i32::MAX);
                sqlx::query(
                    "INSERT INTO permission_group_assignments (group_name, permission_id, display_order)
                     VALUES ($1, $2, $3)",
                )
                .bind(&group.group_name)
                .bind(slug)
                .bind(display_order)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
