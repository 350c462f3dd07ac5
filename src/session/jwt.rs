//! JWT session resolver
//!
//! Verifies an HS256 bearer token issued by the platform's session service
//! and extracts the account id from the `sub` claim.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use super::{SessionError, SessionResolver};
use crate::core_types::AccountId;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (account id as string)
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
}

pub struct JwtSessionResolver {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionResolver {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve_active_user(&self, bearer_token: &str) -> Result<AccountId, SessionError> {
        let token_data = decode::<Claims>(bearer_token, &self.decoding_key, &self.validation)
            .map_err(|_| SessionError::Unauthenticated)?;

        token_data
            .claims
            .sub
            .parse()
            .map_err(|_| SessionError::Unauthenticated)
    }
}
