use async_trait::async_trait;
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use std::collections::BTreeMap;

use crate::{
    models::{BoardUri, NewRole, PermissionMap, Role, RoleId, ScopeKey, UserId},
    Error, Result,
};

use super::RoleRepository;

/// Columns of `roles` plus the aggregated `role_permissions` object
const ROLE_SELECT: &str = "SELECT
        r.role_id, r.role, r.board_uri, r.weight, r.is_system, r.inherit_id, r.capcode,
        COALESCE(
            jsonb_object_agg(rp.permission_id, rp.value) FILTER (WHERE rp.permission_id IS NOT NULL),
            '{}'::jsonb
        ) AS permissions
     FROM roles r
     LEFT JOIN role_permissions rp ON rp.role_id = r.role_id";

/// Role repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_role(row: &PgRow) -> Result<Role> {
        let board_uri: Option<String> = row.try_get("board_uri")?;
        let inherit_id: Option<i64> = row.try_get("inherit_id")?;
        let permissions: Json<BTreeMap<String, bool>> = row.try_get("permissions")?;

        Ok(Role {
            id: RoleId(row.try_get("role_id")?),
            name: row.try_get("role")?,
            scope: ScopeKey::from(board_uri.map(BoardUri::from)),
            weight: row.try_get("weight")?,
            is_system: row.try_get("is_system")?,
            inherit_id: inherit_id.map(RoleId),
            capcode: row.try_get("capcode")?,
            permissions: PermissionMap::from(permissions.0),
        })
    }

    fn rows_to_roles(rows: &[PgRow]) -> Result<Vec<Role>> {
        rows.iter().map(Self::row_to_role).collect()
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn chain_roles(&self, names: &[String], scope: &ScopeKey) -> Result<Vec<Role>> {
        let rows = sqlx::query(&format!(
            "{ROLE_SELECT}
             WHERE r.role = ANY($1) AND (r.board_uri IS NULL OR r.board_uri = $2)
             GROUP BY r.role_id
             ORDER BY r.weight ASC, r.role_id ASC"
        ))
        .bind(names)
        .bind(scope.board_uri())
        .fetch_all(&self.pool)
        .await?;

        Self::rows_to_roles(&rows)
    }

    async fn assigned_roles(&self, user_id: &UserId) -> Result<Vec<Role>> {
        let rows = sqlx::query(&format!(
            "{ROLE_SELECT}
             JOIN user_roles ur ON ur.role_id = r.role_id
             WHERE ur.user_id = $1
             GROUP BY r.role_id
             ORDER BY r.weight ASC, r.role_id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Self::rows_to_roles(&rows)
    }

    async fn system_roles(&self) -> Result<Vec<Role>> {
        let rows = sqlx::query(&format!(
            "{ROLE_SELECT}
             WHERE r.is_system = TRUE
             GROUP BY r.role_id
             ORDER BY r.weight ASC, r.role_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Self::rows_to_roles(&rows)
    }

    async fn get(&self, role_id: RoleId) -> Result<Option<Role>> {
        let row = sqlx::query(&format!(
            "{ROLE_SELECT}
             WHERE r.role_id = $1
             GROUP BY r.role_id"
        ))
        .bind(role_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_role).transpose()
    }

    async fn scopes_defining(
        &self,
        slug: &str,
        names: &[String],
        user_id: Option<&UserId>,
    ) -> Result<Vec<ScopeKey>> {
        // Anonymous actors have no assignments; the assignment branch is left
        // out entirely instead of matching user_roles against NULL.
        let rows: Vec<Option<String>> = match user_id {
            Some(user_id) => {
                sqlx::query_scalar(
                    "SELECT r.board_uri
                     FROM roles r
                     JOIN role_permissions rp ON rp.role_id = r.role_id
                     WHERE rp.permission_id = $1
                       AND (
                            r.role = ANY($2)
                            OR r.role_id IN (SELECT role_id FROM user_roles WHERE user_id = $3)
                       )
                     UNION
                     SELECT c.board_uri
                     FROM roles c
                     JOIN user_roles ur ON ur.role_id = c.role_id
                     JOIN role_permissions rp ON rp.role_id = c.inherit_id
                     WHERE ur.user_id = $3 AND rp.permission_id = $1",
                )
                .bind(slug)
                .bind(names)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT DISTINCT r.board_uri
                     FROM roles r
                     JOIN role_permissions rp ON rp.role_id = r.role_id
                     WHERE rp.permission_id = $1 AND r.role = ANY($2)",
                )
                .bind(slug)
                .bind(names)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|uri| ScopeKey::from(uri.map(BoardUri::from)))
            .collect())
    }

    async fn create(&self, role: &NewRole) -> Result<Role> {
        let role_id: i64 = sqlx::query_scalar(
            "INSERT INTO roles (role, board_uri, weight, is_system, inherit_id, capcode)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING role_id",
        )
        .bind(&role.name)
        .bind(role.scope.board_uri())
        .bind(role.weight)
        .bind(role.is_system)
        .bind(role.inherit_id.map(|id| id.as_i64()))
        .bind(&role.capcode)
        .fetch_one(&self.pool)
        .await?;

        Ok(role.clone().into_role(RoleId(role_id)))
    }

    async fn delete(&self, role_id: RoleId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE role_id = $1")
            .bind(role_id.as_i64())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id.as_i64())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM roles WHERE role_id = $1")
            .bind(role_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_permission(&self, role_id: RoleId, slug: &str, value: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id, value)
             VALUES ($1, $2, $3)
             ON CONFLICT (role_id, permission_id) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(role_id.as_i64())
        .bind(slug)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| match Error::from(e) {
            Error::NotFound(_) => Error::NotFound(format!("Role {role_id} or permission {slug}")),
            other => other,
        })?;

        Ok(())
    }

    async fn clear_permission(&self, role_id: RoleId, slug: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id.as_i64())
            .bind(slug)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn assign(&self, user_id: &UserId, role_id: RoleId) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)
             ON CONFLICT (user_id, role_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unassign(&self, user_id: &UserId, role_id: RoleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn holders(&self, role_id: RoleId) -> Result<Vec<UserId>> {
        let users: Vec<UserId> =
            sqlx::query_scalar("SELECT user_id FROM user_roles WHERE role_id = $1 ORDER BY user_id")
                .bind(role_id.as_i64())
                .fetch_all(&self.pool)
                .await?;

        Ok(users)
    }
}
