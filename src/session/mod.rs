//! Session resolution
//!
//! Authenticates the caller of an engine operation and yields the acting
//! account. The engine trusts the resolver's result without re-validating
//! credentials; token issuance lives outside this engine.

pub mod jwt;
pub mod middleware;

pub use jwt::JwtSessionResolver;

use async_trait::async_trait;
use thiserror::Error;

use crate::core_types::AccountId;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("Not authenticated")]
    Unauthenticated,
}

/// Resolves the acting account from a request's bearer credential.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve_active_user(&self, bearer_token: &str) -> Result<AccountId, SessionError>;
}

/// Fixed-identity resolver for tests and demo deployments.
pub struct StaticSessionResolver {
    account: AccountId,
}

impl StaticSessionResolver {
    pub fn new(account: AccountId) -> Self {
        Self { account }
    }
}

#[async_trait]
impl SessionResolver for StaticSessionResolver {
    async fn resolve_active_user(&self, _bearer_token: &str) -> Result<AccountId, SessionError> {
        Ok(self.account)
    }
}
