//! Catalog and system role seeding
//!
//! Idempotent: existing slugs and system roles are left untouched, groups are
//! upserted.

use std::collections::BTreeSet;

use tracing::info;

use crate::{
    models::{default_system_roles, permission_groups, PERMISSION_SLUGS},
    repository::{PermissionRepository, RoleRepository},
    Result,
};

/// What a seeding run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_inserted: u64,
    pub groups: usize,
    pub roles_created: Vec<String>,
}

impl SeedReport {
    /// Whether cached masks may now be stale
    #[must_use]
    pub fn changed_roles(&self) -> bool {
        !self.roles_created.is_empty()
    }
}

/// Seed the permission catalog, its groups and the global system roles
pub async fn seed_catalog(
    roles: &dyn RoleRepository,
    permissions: &dyn PermissionRepository,
) -> Result<SeedReport> {
    let slugs: Vec<String> = PERMISSION_SLUGS.iter().map(ToString::to_string).collect();
    let permissions_inserted = permissions.ensure_permissions(&slugs).await?;

    let groups = permission_groups();
    permissions.ensure_groups(&groups).await?;

    let existing: BTreeSet<String> = roles
        .system_roles()
        .await?
        .into_iter()
        .filter(|role| role.scope.is_global())
        .map(|role| role.name)
        .collect();

    let mut roles_created = Vec::new();
    for role in default_system_roles() {
        if existing.contains(&role.name) {
            continue;
        }
        let created = roles.create(&role).await?;
        info!(role_id = %created.id, name = %created.name, weight = created.weight, "Seeded system role");
        roles_created.push(created.name);
    }

    info!(
        permissions_inserted,
        groups = groups.len(),
        roles_created = roles_created.len(),
        "Seeded permission catalog"
    );

    Ok(SeedReport {
        permissions_inserted,
        groups: groups.len(),
        roles_created,
    })
}
