use std::sync::Arc;
use uuid::Uuid;

use super::jwt::JwtService;
use super::repository::TokenRepository;
use super::ServiceError;

/// Caller identity established from a bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub access_token_id: String,
    pub scopes: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Checks bearer tokens against their signature and the stored token row.
#[derive(Clone)]
pub struct TokenValidator {
    jwt: JwtService,
    tokens: Arc<dyn TokenRepository>,
    client_name: String,
}

impl TokenValidator {
    pub fn new(jwt: JwtService, tokens: Arc<dyn TokenRepository>, client_name: String) -> Self {
        Self {
            jwt,
            tokens,
            client_name,
        }
    }

    /// Validates `bearer` and requires `required_scope` on the stored token.
    pub async fn authenticate(
        &self,
        bearer: &str,
        required_scope: &str,
    ) -> Result<AuthenticatedUser, ServiceError> {
        let client = self
            .tokens
            .find_client_by_name(&self.client_name)
            .await?
            .ok_or_else(|| {
                ServiceError::ConfigurationError(format!(
                    "OAuth client '{}' is not provisioned",
                    self.client_name
                ))
            })?;

        let claims = self
            .jwt
            .validate_access_token(bearer, &client.client_id.to_string())
            .map_err(|e| {
                tracing::debug!(error = %e, "Bearer token failed verification");
                ServiceError::InvalidToken
            })?;

        let token = self
            .tokens
            .find_access_token(&claims.jti)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if token.revoked || token.user_id != claims.user_id {
            return Err(ServiceError::InvalidToken);
        }
        if !token.has_scope(required_scope) {
            tracing::debug!(required_scope, "Bearer token lacks required scope");
            return Err(ServiceError::InvalidToken);
        }

        Ok(AuthenticatedUser {
            user_id: token.user_id,
            access_token_id: token.token_id,
            scopes: token.scopes,
        })
    }
}
