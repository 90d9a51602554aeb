use super::{Route, UserId};

/// Identity of the actor whose permissions are being resolved
///
/// Implemented by the platform's request identity. Anonymity and
/// accountability are read from here on every call and never stored
/// globally.
pub trait IdentityProvider: Send + Sync {
    /// Account ID, `None` for anonymous visitors
    fn user_id(&self) -> Option<&UserId>;

    /// Whether the actor is high-risk (`false`) or accountable (`true`)
    fn is_accountable(&self) -> bool;

    fn is_anonymous(&self) -> bool {
        self.user_id().is_none()
    }

    /// Route this actor currently resolves through
    fn active_route(&self) -> Route {
        Route::for_accountability(self.is_accountable())
    }
}

/// Plain actor identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    user_id: Option<UserId>,
    accountable: bool,
}

impl Actor {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            user_id: None,
            accountable: true,
        }
    }

    #[must_use]
    pub fn registered(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            accountable: true,
        }
    }

    #[must_use]
    pub const fn with_accountable(mut self, accountable: bool) -> Self {
        self.accountable = accountable;
        self
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl IdentityProvider for Actor {
    fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    fn is_accountable(&self) -> bool {
        self.accountable
    }
}
