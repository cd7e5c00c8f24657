use async_trait::async_trait;
use tracing::{debug, warn};

use super::token::TokenConfig;
use crate::shared::AppError;

/// Resolves a client auth token to a user id
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<String, AppError>;
}

/// Verifies HS256 tokens whose claims carry a `userId`
pub struct JwtAuthVerifier {
    tokens: TokenConfig,
}

impl JwtAuthVerifier {
    pub fn new(tokens: TokenConfig) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl AuthVerifier for JwtAuthVerifier {
    async fn verify(&self, token: &str) -> Result<String, AppError> {
        let claims = self.tokens.validate_token(token).map_err(|e| {
            warn!(error = %e, "Token verification failed");
            AppError::Unauthorized("Invalid token".to_string())
        })?;

        match claims.user_id {
            Some(user_id) if !user_id.is_empty() => {
                debug!(user_id = %user_id, "Token verified");
                Ok(user_id)
            }
            _ => {
                warn!("Token has no userId claim");
                Err(AppError::Unauthorized("Invalid token format".to_string()))
            }
        }
    }
}
