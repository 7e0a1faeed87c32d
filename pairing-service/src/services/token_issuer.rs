use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::jwt::{AccessTokenClaims, JwtService};
use super::metrics;
use super::repository::TokenRepository;
use super::ServiceError;
use crate::config::TokenConfig;
use crate::models::{AccessToken, RefreshToken, User};
use crate::utils::to_date_time_string;

/// Scopes granted when the caller does not ask for any.
pub const DEFAULT_SCOPES: &[&str] = &["mobile"];

/// Credentials handed to a client after pairing or rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TokenBundle {
    /// Signed JWT
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token expiry, `YYYY-MM-DD HH:MM:SS` UTC
    pub expires_at: String,
    /// Opaque single-use refresh token
    pub refresh_token: String,
}

/// A signed token pair whose rows have not been stored yet.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub jwt: String,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

impl IssuedTokens {
    /// Response body for the stored pair.
    pub fn into_bundle(self) -> TokenBundle {
        metrics::record_token_event("issued");
        tracing::info!(user_id = %self.access_token.user_id, scopes = ?self.access_token.scopes, "Issued access token");

        TokenBundle {
            access_token: self.jwt,
            token_type: "Bearer".to_string(),
            expires_at: to_date_time_string(self.access_token.expiry_utc),
            refresh_token: self.refresh_token.token_id,
        }
    }
}

/// Mints access/refresh token pairs for the configured OAuth client.
#[derive(Clone)]
pub struct TokenIssuer {
    jwt: JwtService,
    tokens: Arc<dyn TokenRepository>,
    config: TokenConfig,
}

impl TokenIssuer {
    pub fn new(jwt: JwtService, tokens: Arc<dyn TokenRepository>, config: TokenConfig) -> Self {
        Self {
            jwt,
            tokens,
            config,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Issues a token pair for `user` and stores it. An empty `scopes` slice
    /// falls back to `DEFAULT_SCOPES`.
    #[tracing::instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn issue(&self, user: &User, scopes: &[String]) -> Result<TokenBundle, ServiceError> {
        let issued = self.prepare(user, scopes).await?;
        self.tokens
            .insert_token_pair(&issued.access_token, &issued.refresh_token)
            .await?;
        Ok(issued.into_bundle())
    }

    /// Mints and signs a token pair without storing it. The caller persists
    /// the rows, then hands out `IssuedTokens::into_bundle`.
    pub async fn prepare(&self, user: &User, scopes: &[String]) -> Result<IssuedTokens, ServiceError> {
        let client = self
            .tokens
            .find_client_by_name(&self.config.client_name)
            .await?
            .filter(|client| !client.revoked)
            .ok_or_else(|| {
                tracing::error!(client = %self.config.client_name, "OAuth client missing or revoked");
                ServiceError::ConfigurationError(format!(
                    "OAuth client '{}' is not provisioned",
                    self.config.client_name
                ))
            })?;

        let scopes = if scopes.is_empty() {
            DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
        } else {
            scopes.to_vec()
        };

        let access_token = AccessToken::new(
            user.user_id,
            client.client_id,
            scopes,
            self.config.access_token_expiry_days,
        );
        let refresh_token = RefreshToken::new(
            access_token.token_id.clone(),
            self.config.refresh_token_expiry_days,
        );

        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            iss: self.jwt.issuer().to_string(),
            aud: client.client_id.to_string(),
            jti: access_token.token_id.clone(),
            iat: now,
            nbf: now,
            exp: access_token.expiry_utc.timestamp(),
            scopes: access_token.scopes.clone(),
            user_id: user.user_id,
        };
        let jwt = self.jwt.encode_access_token(&claims)?;

        Ok(IssuedTokens {
            jwt,
            access_token,
            refresh_token,
        })
    }
}
