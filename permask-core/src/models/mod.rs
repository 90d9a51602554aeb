pub mod actor;
pub mod catalog;
pub mod id;
pub mod mask;
pub mod permission;
pub mod role;
pub mod scope;

pub use actor::{Actor, IdentityProvider};
pub use catalog::{permission_groups, PermissionGroup, PERMISSION_SLUGS};
pub use id::{BoardUri, RoleId, UserId};
pub use mask::{CacheEntry, CompiledMask};
pub use permission::{PermissionMap, Route};
pub use role::{default_system_roles, NewRole, Role, CHAIN_ROLE_NAMES};
pub use scope::ScopeKey;
