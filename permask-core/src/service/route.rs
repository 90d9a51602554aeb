//! Role-name chains per resolution route

use std::collections::BTreeMap;

use crate::models::{
    role::{ABSOLUTE, ANONYMOUS, REGISTERED, UNACCOUNTABLE},
    Route,
};

/// Ordered role names merged for each route
pub type RouteChains = BTreeMap<Route, Vec<String>>;

/// Build the chains for both routes.
///
/// Accountability only selects which chain is read later; both are always
/// compiled so one cache entry serves either classification.
#[must_use]
pub fn build_routes(is_anonymous: bool) -> RouteChains {
    let chain = |with_unaccountable: bool| {
        let mut names = vec![ANONYMOUS.to_string()];
        if with_unaccountable {
            names.push(UNACCOUNTABLE.to_string());
        }
        if !is_anonymous {
            names.push(REGISTERED.to_string());
        }
        names.push(ABSOLUTE.to_string());
        names
    };

    BTreeMap::from([
        (Route::Normal, chain(false)),
        (Route::Unaccountable, chain(true)),
    ])
}

/// Every role name appearing in any chain, deduplicated
#[must_use]
pub fn chain_role_names(routes: &RouteChains) -> Vec<String> {
    let mut names: Vec<String> = routes.values().flatten().cloned().collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_chains() {
        let routes = build_routes(true);
        assert_eq!(routes[&Route::Normal], vec!["anonymous", "absolute"]);
        assert_eq!(
            routes[&Route::Unaccountable],
            vec!["anonymous", "unaccountable", "absolute"]
        );
    }

    #[test]
    fn test_registered_chains() {
        let routes = build_routes(false);
        assert_eq!(routes[&Route::Normal], vec!["anonymous", "registered", "absolute"]);
        assert_eq!(
            routes[&Route::Unaccountable],
            vec!["anonymous", "unaccountable", "registered", "absolute"]
        );
    }

    #[test]
    fn test_chains_end_in_absolute() {
        for is_anonymous in [true, false] {
            for chain in build_routes(is_anonymous).values() {
                assert_eq!(chain.last().map(String::as_str), Some(ABSOLUTE));
            }
        }
    }

    #[test]
    fn test_chain_role_names_dedup() {
        let names = chain_role_names(&build_routes(false));
        assert_eq!(names, vec!["absolute", "anonymous", "registered", "unaccountable"]);
    }
}
