//! User model - read-only view of externally managed accounts.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// User entity. Registration and profile changes happen elsewhere; this
/// service resolves users by e-mail or id and checks their password on login.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    /// Argon2 PHC string; `None` when the account has no password login.
    pub password_hash: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a new user.
    pub fn new(email: String, display_name: Option<String>) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email,
            display_name,
            password_hash: None,
            created_utc: Utc::now(),
        }
    }

    pub fn with_password_hash(mut self, password_hash: String) -> Self {
        self.password_hash = Some(password_hash);
        self
    }
}
