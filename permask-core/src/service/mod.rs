pub mod compiler;
pub mod permission;
pub mod resolver;
pub mod role;
pub mod route;
pub mod tenant;

pub use compiler::{fold, MaskCompiler};
pub use permission::{BoardAccess, PermissionService};
pub use resolver::{ResolvedRole, RoleCandidates, RoleSetResolver};
pub use role::RoleService;
pub use route::{build_routes, chain_role_names, RouteChains};
pub use tenant::{canonical_board_uri, CanonicalTenantResolver, PgTenantResolver, TenantResolver};
