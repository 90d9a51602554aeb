//! Board handle to scope resolution

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    models::{BoardUri, ScopeKey},
    Error, Result,
};

/// Maximum board URI length
pub const MAX_BOARD_URI_LEN: usize = 32;

/// Turns a user-supplied board handle into a canonical [`ScopeKey`]
#[async_trait]
pub trait TenantResolver: Send + Sync {
    async fn resolve(&self, handle: &str) -> Result<ScopeKey>;
}

/// Normalize a handle such as `/b/` or ` Tech ` into its URI
pub fn canonical_board_uri(handle: &str) -> Result<BoardUri> {
    let uri = handle.trim().trim_matches('/').to_lowercase();

    if uri.is_empty() {
        return Err(Error::InvalidInput("Board handle is empty".to_string()));
    }
    if uri.len() > MAX_BOARD_URI_LEN {
        return Err(Error::InvalidInput(format!(
            "Board handle exceeds {MAX_BOARD_URI_LEN} characters"
        )));
    }
    if !uri.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidInput(format!("Invalid board handle: {handle}")));
    }

    Ok(BoardUri::from(uri))
}

/// Resolves handles syntactically, without checking that the board exists
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalTenantResolver;

#[async_trait]
impl TenantResolver for CanonicalTenantResolver {
    async fn resolve(&self, handle: &str) -> Result<ScopeKey> {
        canonical_board_uri(handle).map(ScopeKey::from)
    }
}

/// Resolves handles against the `boards` table
#[derive(Clone)]
pub struct PgTenantResolver {
    pool: PgPool,
}

impl PgTenantResolver {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantResolver for PgTenantResolver {
    async fn resolve(&self, handle: &str) -> Result<ScopeKey> {
        let uri = canonical_board_uri(handle)?;

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM boards WHERE board_uri = $1)")
            .bind(&uri)
            .fetch_one(&self.pool)
            .await?;

        if !exists {
            return Err(Error::NotFound(format!("Board /{uri}/")));
        }

        Ok(ScopeKey::from(uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_board_uri() {
        assert_eq!(canonical_board_uri("/b/").unwrap().as_str(), "b");
        assert_eq!(canonical_board_uri("  Tech ").unwrap().as_str(), "tech");
        assert_eq!(canonical_board_uri("a_b1").unwrap().as_str(), "a_b1");
    }

    #[test]
    fn test_rejects_bad_handles() {
        assert!(matches!(canonical_board_uri("//"), Err(Error::InvalidInput(_))));
        assert!(matches!(canonical_board_uri("b/c"), Err(Error::InvalidInput(_))));
        assert!(matches!(canonical_board_uri(&"x".repeat(33)), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_canonical_resolver() {
        let scope = CanonicalTenantResolver.resolve("/b/").await.unwrap();
        assert_eq!(scope, ScopeKey::board("b"));
    }
}
