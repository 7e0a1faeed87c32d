use service_core::error::AppError;
use thiserror::Error;

/// Failures raised by the pairing and token services. The HTTP layer maps
/// them onto status codes through `From<ServiceError> for AppError`.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Unknown e-mail, code or user; also expired or already consumed codes.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Code does not belong to the authenticated user")]
    InvalidOwner,

    /// Unknown e-mail, wrong password or no password set.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Refresh token unknown, revoked, expired or already rotated; bearer
    /// token failing validation.
    #[error("Invalid token")]
    InvalidToken,

    /// Deployment problem, e.g. the OAuth client record is missing.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Timed out waiting for the pairing code lock")]
    LockTimeout,

    #[error("Could not find a free pairing code")]
    CodeSpaceExhausted,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Seconds a client should wait before retrying after a lock timeout.
const LOCK_RETRY_AFTER_SECS: u64 = 1;

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => {
                AppError::NotFound(anyhow::anyhow!("{} not found or expired", what))
            }
            ServiceError::InvalidOwner => AppError::Forbidden(anyhow::anyhow!(
                "Code does not belong to the authenticated user"
            )),
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"))
            }
            ServiceError::InvalidToken => {
                AppError::Unauthorized(anyhow::anyhow!("Token invalid or revoked"))
            }
            ServiceError::ConfigurationError(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
            ServiceError::LockTimeout => AppError::ServiceUnavailable(
                "Code is being updated, try again".to_string(),
                Some(LOCK_RETRY_AFTER_SECS),
            ),
            ServiceError::CodeSpaceExhausted => {
                AppError::InternalError(anyhow::anyhow!("Could not find a free pairing code"))
            }
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Cache(e) => AppError::InternalError(e.context("Cache error")),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::StatusCode;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ServiceError::NotFound("Code"), StatusCode::NOT_FOUND),
            (ServiceError::InvalidOwner, StatusCode::FORBIDDEN),
            (ServiceError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ServiceError::InvalidToken, StatusCode::UNAUTHORIZED),
            (ServiceError::LockTimeout, StatusCode::SERVICE_UNAVAILABLE),
            (
                ServiceError::ConfigurationError("OAuth client missing".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::CodeSpaceExhausted,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }
}
