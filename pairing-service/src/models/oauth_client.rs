//! OAuth client model - the single trusted first-party client.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Name the client record is provisioned under unless configured otherwise.
pub const DEFAULT_CLIENT_NAME: &str = "cross-authentication";

/// OAuth client entity. Its id is the audience of every issued JWT.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OAuthClient {
    pub client_id: Uuid,
    pub client_name: String,
    pub revoked: bool,
    pub created_utc: DateTime<Utc>,
}

impl OAuthClient {
    pub fn new(client_name: String) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            client_name,
            revoked: false,
            created_utc: Utc::now(),
        }
    }
}
