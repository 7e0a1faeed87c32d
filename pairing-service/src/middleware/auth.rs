use service_core::axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{services::AuthenticatedUser, AppState};

/// Scope a bearer token needs to activate pairing codes.
pub const MOBILE_SCOPE: &str = "mobile";

/// Middleware to require a bearer token carrying the `mobile` scope
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let user = state.validator.authenticate(token, MOBILE_SCOPE).await?;

    // Store the caller in request extensions so handlers can access it
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Extractor for the caller established by `bearer_auth_middleware`
pub struct AuthUser(pub AuthenticatedUser);

#[service_core::axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<AuthenticatedUser>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Authenticated user missing from request extensions"
            ))
        })?;

        Ok(AuthUser(user.clone()))
    }
}
