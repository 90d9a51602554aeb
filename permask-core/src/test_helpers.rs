//! Test helpers and fixtures for permask-core tests
//!
//! Fixtures write straight into a [`MemoryStore`], bypassing the services so
//! that tests control exactly which rows exist.

use std::sync::Arc;

use crate::models::{default_system_roles, NewRole, Role, ScopeKey, UserId};
use crate::repository::{MemoryStore, RoleRepository};

/// Create a test user ID
pub fn test_user_id(id: &str) -> UserId {
    UserId::from_string(id.to_string())
}

/// Role and grant builder over an in-memory store
pub struct RoleFixture {
    store: Arc<MemoryStore>,
}

impl RoleFixture {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        self.store.clone()
    }

    /// Create a non-system role
    pub async fn role(&self, name: &str, scope: ScopeKey, weight: i32) -> Role {
        self.store
            .create(&NewRole::new(name, scope, weight))
            .await
            .expect("create role")
    }

    /// Create a global system role
    pub async fn system_role(&self, name: &str, weight: i32) -> Role {
        self.store
            .create(&NewRole::new(name, ScopeKey::global(), weight).system())
            .await
            .expect("create system role")
    }

    /// Create the four chain roles with their default weights
    pub async fn seed_system_roles(&self) -> Vec<Role> {
        let mut roles = Vec::new();
        for role in default_system_roles() {
            roles.push(self.store.create(&role).await.expect("seed system role"));
        }
        roles
    }

    /// Look up a global role by name
    pub async fn named(&self, name: &str) -> Role {
        self.store
            .system_roles()
            .await
            .expect("list system roles")
            .into_iter()
            .find(|role| role.name == name)
            .unwrap_or_else(|| panic!("no system role named {name}"))
    }

    pub async fn grant(&self, role: &Role, slug: &str, value: bool) {
        self.store
            .set_permission(role.id, slug, value)
            .await
            .expect("set permission");
    }

    pub async fn assign(&self, user_id: &UserId, role: &Role) {
        self.store.assign(user_id, role.id).await.expect("assign role");
    }
}
