use std::sync::Arc;

use super::metrics;
use super::repository::{TokenRepository, UserDirectory};
use super::token_issuer::{TokenBundle, TokenIssuer};
use super::ServiceError;

/// Rotates refresh tokens. Each refresh token can be exchanged once.
#[derive(Clone)]
pub struct TokenRefresher {
    issuer: TokenIssuer,
    tokens: Arc<dyn TokenRepository>,
    users: Arc<dyn UserDirectory>,
}

impl TokenRefresher {
    pub fn new(
        issuer: TokenIssuer,
        tokens: Arc<dyn TokenRepository>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            issuer,
            tokens,
            users,
        }
    }

    /// Revokes the session behind `refresh_token_id` and issues a new pair
    /// with the same scopes. Unknown, revoked, expired or concurrently
    /// rotated tokens fail with `InvalidToken`.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, refresh_token_id: &str) -> Result<TokenBundle, ServiceError> {
        let result = self.rotate(refresh_token_id).await;
        match &result {
            Ok(_) => metrics::record_token_event("rotated"),
            Err(ServiceError::InvalidToken) => metrics::record_token_event("rejected"),
            Err(_) => {}
        }
        result
    }

    async fn rotate(&self, refresh_token_id: &str) -> Result<TokenBundle, ServiceError> {
        let refresh_token = self
            .tokens
            .find_refresh_token(refresh_token_id)
            .await?
            .filter(|token| token.is_valid())
            .ok_or(ServiceError::InvalidToken)?;

        let access_token = self
            .tokens
            .find_access_token(&refresh_token.access_token_id)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if !self
            .tokens
            .revoke_session(&refresh_token.token_id, &access_token.token_id)
            .await?
        {
            tracing::warn!(user_id = %access_token.user_id, "Refresh token replayed during rotation");
            return Err(ServiceError::InvalidToken);
        }

        let user = self
            .users
            .find_user_by_id(access_token.user_id)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        self.issuer.issue(&user, &access_token.scopes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::models::{OAuthClient, User};
    use crate::services::{JwtService, MemoryDatabase};
    use chrono::{Duration, Utc};

    struct Fixture {
        db: Arc<MemoryDatabase>,
        issuer: TokenIssuer,
        refresher: TokenRefresher,
        client: OAuthClient,
        user: User,
    }

    fn fixture() -> Result<Fixture, anyhow::Error> {
        let db = Arc::new(MemoryDatabase::new());
        let client = OAuthClient::new(crate::models::oauth_client::DEFAULT_CLIENT_NAME.to_string());
        db.add_client(client.clone())?;
        let user = User::new("viewer@example.com".to_string(), None);
        db.add_user(user.clone())?;

        let issuer = TokenIssuer::new(
            JwtService::from_secret(b"refresher-test-secret", "https://pairing.example.com"),
            db.clone(),
            TokenConfig::default(),
        );
        let refresher = TokenRefresher::new(issuer.clone(), db.clone(), db.clone());
        Ok(Fixture {
            db,
            issuer,
            refresher,
            client,
            user,
        })
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_keeps_scopes() -> Result<(), anyhow::Error> {
        let f = fixture()?;
        let original = f.issuer.issue(&f.user, &["tv".to_string()]).await?;

        let rotated = f.refresher.refresh(&original.refresh_token).await?;
        assert_ne!(rotated.refresh_token, original.refresh_token);
        assert_ne!(rotated.access_token, original.access_token);

        let audience = f.client.client_id.to_string();
        let claims = f.issuer.jwt().validate_access_token(&rotated.access_token, &audience)?;
        assert_eq!(claims.scopes, vec!["tv".to_string()]);
        assert_eq!(claims.user_id, f.user.user_id);

        let old_claims = f.issuer.jwt().validate_access_token(&original.access_token, &audience)?;
        let old_access = f.db.find_access_token(&old_claims.jti).await?;
        assert!(old_access.is_some_and(|t| t.revoked));
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_is_single_use() -> Result<(), anyhow::Error> {
        let f = fixture()?;
        let bundle = f.issuer.issue(&f.user, &["tv".to_string()]).await?;

        f.refresher.refresh(&bundle.refresh_token).await?;
        let replay = f.refresher.refresh(&bundle.refresh_token).await;
        assert!(matches!(replay, Err(ServiceError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_refresh_has_one_winner() -> Result<(), anyhow::Error> {
        let f = fixture()?;
        let bundle = f.issuer.issue(&f.user, &["tv".to_string()]).await?;

        let (a, b) = tokio::join!(
            f.refresher.refresh(&bundle.refresh_token),
            f.refresher.refresh(&bundle.refresh_token)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_token_is_invalid() -> Result<(), anyhow::Error> {
        let f = fixture()?;
        let result = f.refresher.refresh("does-not-exist").await;
        assert!(matches!(result, Err(ServiceError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_token_is_invalid() -> Result<(), anyhow::Error> {
        let f = fixture()?;
        let bundle = f.issuer.issue(&f.user, &["tv".to_string()]).await?;

        let mut stored = f
            .db
            .find_refresh_token(&bundle.refresh_token)
            .await?
            .ok_or_else(|| anyhow::anyhow!("refresh token not stored"))?;
        stored.expiry_utc = Utc::now() - Duration::seconds(1);
        f.db.put_refresh_token(stored)?;

        let result = f.refresher.refresh(&bundle.refresh_token).await;
        assert!(matches!(result, Err(ServiceError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_user_is_invalid() -> Result<(), anyhow::Error> {
        let f = fixture()?;
        let bundle = f.issuer.issue(&f.user, &["tv".to_string()]).await?;
        f.db.remove_user(f.user.user_id)?;

        let result = f.refresher.refresh(&bundle.refresh_token).await;
        assert!(matches!(result, Err(ServiceError::InvalidToken)));
        Ok(())
    }
}
