use serde::{Deserialize, Serialize};

use super::{PermissionMap, RoleId, ScopeKey};

/// Everyone, registered or not
pub const ANONYMOUS: &str = "anonymous";
/// High-risk actors
pub const UNACCOUNTABLE: &str = "unaccountable";
/// Actors with an account
pub const REGISTERED: &str = "registered";
/// Platform policy every actor is subject to
pub const ABSOLUTE: &str = "absolute";

/// Role names that make up the route chains
pub const CHAIN_ROLE_NAMES: [&str; 4] = [ANONYMOUS, UNACCOUNTABLE, REGISTERED, ABSOLUTE];

/// A weighted bundle of permission values, global or bound to one board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub scope: ScopeKey,
    pub weight: i32,
    pub is_system: bool,
    /// The single system role this role inherits from when directly assigned
    pub inherit_id: Option<RoleId>,
    pub capcode: Option<String>,
    pub permissions: PermissionMap,
}

impl Role {
    /// Whether the role participates in the route chains by name
    #[must_use]
    pub fn is_chain_role(&self) -> bool {
        CHAIN_ROLE_NAMES.contains(&self.name.as_str())
    }

    /// Whether editing this role can change the mask of actors who do not hold it
    #[must_use]
    pub fn affects_every_actor(&self) -> bool {
        self.is_system || self.is_chain_role()
    }
}

/// Role creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub scope: ScopeKey,
    pub weight: i32,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub inherit_id: Option<RoleId>,
    #[serde(default)]
    pub capcode: Option<String>,
}

impl NewRole {
    #[must_use]
    pub fn new(name: impl Into<String>, scope: ScopeKey, weight: i32) -> Self {
        Self {
            name: name.into(),
            scope,
            weight,
            is_system: false,
            inherit_id: None,
            capcode: None,
        }
    }

    #[must_use]
    pub const fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    #[must_use]
    pub const fn inheriting(mut self, parent: RoleId) -> Self {
        self.inherit_id = Some(parent);
        self
    }

    #[must_use]
    pub fn with_capcode(mut self, capcode: impl Into<String>) -> Self {
        self.capcode = Some(capcode.into());
        self
    }

    /// Build the stored role once an ID has been allocated
    #[must_use]
    pub fn into_role(self, id: RoleId) -> Role {
        Role {
            id,
            name: self.name,
            scope: self.scope,
            weight: self.weight,
            is_system: self.is_system,
            inherit_id: self.inherit_id,
            capcode: self.capcode,
            permissions: PermissionMap::new(),
        }
    }
}

/// System roles seeded on a fresh installation, lowest weight first
///
/// `unaccountable` outweighs `registered` so its restrictions hold for
/// registered actors on the unaccountable route.
#[must_use]
pub fn default_system_roles() -> Vec<NewRole> {
    vec![
        NewRole::new(ANONYMOUS, ScopeKey::global(), 0).system(),
        NewRole::new(REGISTERED, ScopeKey::global(), 20).system(),
        NewRole::new(UNACCOUNTABLE, ScopeKey::global(), 30).system(),
        NewRole::new(ABSOLUTE, ScopeKey::global(), 1000).system(),
    ]
}
