use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fs;
use uuid::Uuid;

use crate::config::JwtConfig;

/// HS256 signer/verifier for access tokens. The key is read once at
/// construction.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer (application base URL)
    pub iss: String,
    /// Audience (OAuth client id)
    pub aud: String,
    /// JWT ID, equal to the access token row id
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub scopes: Vec<String>,
    pub user_id: Uuid,
}

impl JwtService {
    /// Create a new JWT service by loading the symmetric key from a file
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let secret = fs::read(&config.signing_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read signing key from {}: {}",
                config.signing_key_path,
                e
            )
        })?;

        let secret = trim_trailing_newlines(&secret);
        if secret.is_empty() {
            return Err(anyhow::anyhow!(
                "Signing key file {} is empty",
                config.signing_key_path
            ));
        }

        tracing::info!("JWT service initialized with HS256 key");
        Ok(Self::from_secret(secret, &config.issuer))
    }

    pub fn from_secret(secret: &[u8], issuer: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn encode_access_token(&self, claims: &AccessTokenClaims) -> Result<String, anyhow::Error> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    /// Verifies signature, `exp`, `nbf`, `iss` and `aud` and returns the claims.
    pub fn validate_access_token(
        &self,
        token: &str,
        audience: &str,
    ) -> Result<AccessTokenClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud"]);

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

fn trim_trailing_newlines(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !matches!(b, b'\n' | b'\r'))
        .map_or(0, |i| i + 1);
    &bytes[..end]
}
