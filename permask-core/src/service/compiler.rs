//! Folding resolved roles into compiled masks

use std::sync::Arc;

use crate::{
    metrics,
    models::{CompiledMask, PermissionMap, Role, ScopeKey, UserId},
    repository::RoleRepository,
    Result,
};

use super::{
    resolver::{ResolvedRole, RoleSetResolver},
    route::{chain_role_names, RouteChains},
};

/// Merge roles lowest weight first; later values overwrite earlier ones.
///
/// The slice must already be ordered ascending by weight.
#[must_use]
pub fn fold<'a>(roles: impl IntoIterator<Item = &'a Role>) -> PermissionMap {
    let mut permissions = PermissionMap::new();
    for role in roles {
        for (slug, value) in role.permissions.iter() {
            permissions.set(slug, value);
        }
    }
    permissions
}

/// Builds a [`CompiledMask`] covering every route for one (actor, scope)
#[derive(Clone, Debug)]
pub struct MaskCompiler {
    resolver: RoleSetResolver,
}

impl MaskCompiler {
    #[must_use]
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self {
            resolver: RoleSetResolver::new(roles),
        }
    }

    #[must_use]
    pub const fn resolver(&self) -> &RoleSetResolver {
        &self.resolver
    }

    /// Compile every route, with one slice for the global scope and, for a
    /// board request, one for the board.
    ///
    /// Only the role loads suspend; the fold itself is synchronous.
    #[tracing::instrument(
        name = "compile_mask",
        skip(self, routes),
        fields(user_id = user_id.map_or("anonymous", UserId::as_str), scope = %scope)
    )]
    pub async fn compile(
        &self,
        routes: &RouteChains,
        scope: &ScopeKey,
        user_id: Option<&UserId>,
    ) -> Result<CompiledMask> {
        let timer = metrics::compile::MASK_COMPILE_DURATION.start_timer();

        let names = chain_role_names(routes);
        let candidates = self.resolver.load(&names, scope, user_id).await?;

        let mut mask = CompiledMask::new();
        for (route, chain) in routes {
            let resolved = candidates.select(chain, scope);
            for pass in scope.passes() {
                mask.insert(*route, pass.clone(), fold_slice(&resolved, &pass));
            }
        }

        timer.observe_duration();
        metrics::compile::MASK_COMPILATIONS.inc();
        tracing::debug!(routes = routes.len(), "Compiled permission mask");

        Ok(mask)
    }
}

fn fold_slice(resolved: &[ResolvedRole], pass: &ScopeKey) -> PermissionMap {
    fold(resolved.iter().filter(|r| &r.scope == pass).map(|r| &r.role))
}
