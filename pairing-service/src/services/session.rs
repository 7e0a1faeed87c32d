use std::sync::Arc;

use super::metrics;
use super::repository::UserDirectory;
use super::token_issuer::{TokenBundle, TokenIssuer};
use super::ServiceError;
use crate::utils::{verify_password, Password};

/// Password sign-in for the mobile app. The resulting token carries the
/// default `mobile` scope, which is what `/api/active-tv-code` requires.
#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UserDirectory>,
    issuer: TokenIssuer,
}

impl SessionService {
    pub fn new(users: Arc<dyn UserDirectory>, issuer: TokenIssuer) -> Self {
        Self { users, issuer }
    }

    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: Password) -> Result<TokenBundle, ServiceError> {
        let user = self
            .users
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let Some(hash) = user.password_hash.as_deref() else {
            tracing::warn!(user_id = %user.user_id, "Login attempted on account without a password");
            metrics::record_token_event("rejected");
            return Err(ServiceError::InvalidCredentials);
        };

        if verify_password(&password, hash).is_err() {
            tracing::warn!(user_id = %user.user_id, "Login failed");
            metrics::record_token_event("rejected");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.issuer.issue(&user, &[]).await?;
        tracing::info!(user_id = %user.user_id, "User logged in");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::models::{OAuthClient, User};
    use crate::services::{JwtService, MemoryDatabase};
    use crate::utils::hash_password;

    const PASSWORD: &str = "correct horse battery";

    struct Setup {
        sessions: SessionService,
        issuer: TokenIssuer,
        client: OAuthClient,
        user: User,
    }

    fn setup() -> Result<Setup, anyhow::Error> {
        let db = Arc::new(MemoryDatabase::new());
        let client = OAuthClient::new(crate::models::oauth_client::DEFAULT_CLIENT_NAME.to_string());
        db.add_client(client.clone())?;
        let user = User::new("viewer@example.com".to_string(), None)
            .with_password_hash(hash_password(&Password::new(PASSWORD.to_string()))?);
        db.add_user(user.clone())?;
        db.add_user(User::new("sso@example.com".to_string(), None))?;

        let issuer = TokenIssuer::new(
            JwtService::from_secret(b"session-test-secret", "https://pairing.example.com"),
            db.clone(),
            TokenConfig::default(),
        );
        Ok(Setup {
            sessions: SessionService::new(db, issuer.clone()),
            issuer,
            client,
            user,
        })
    }

    #[tokio::test]
    async fn test_login_issues_mobile_token() -> Result<(), anyhow::Error> {
        let s = setup()?;

        let bundle = s
            .sessions
            .login("Viewer@Example.com", Password::new(PASSWORD.to_string()))
            .await?;
        let claims = s
            .issuer
            .jwt()
            .validate_access_token(&bundle.access_token, &s.client.client_id.to_string())?;
        assert_eq!(claims.user_id, s.user.user_id);
        assert_eq!(claims.scopes, vec!["mobile".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() -> Result<(), anyhow::Error> {
        let sessions = setup()?.sessions;

        for (email, password) in [
            ("viewer@example.com", "wrong password"),
            ("nobody@example.com", PASSWORD),
            ("sso@example.com", PASSWORD),
        ] {
            let result = sessions
                .login(email, Password::new(password.to_string()))
                .await;
            assert!(
                matches!(result, Err(ServiceError::InvalidCredentials)),
                "{} should be rejected",
                email
            );
        }
        Ok(())
    }
}
