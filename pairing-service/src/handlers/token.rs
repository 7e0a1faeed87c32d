use service_core::{
    axum::{extract::State, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::{Data, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Sign in with e-mail and password
///
/// Returns a `mobile` scoped token pair, the credential the app presents to
/// `/api/active-tv-code`.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, tokens returned under `data`", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many login attempts from this address", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tokens"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = state
        .sessions
        .login(&req.email, Password::new(req.password))
        .await?;
    Ok(Json(Data::new(LoginResponse { token })))
}

/// Exchange a refresh token for a new token pair
///
/// The presented refresh token, its access token and every sibling refresh
/// token are revoked; replaying it afterwards fails with 401.
#[utoipa::path(
    post,
    path = "/api/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token rotated, returned under `data`", body = RefreshResponse),
        (status = 401, description = "Refresh token invalid, expired or already used", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tokens"
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = state.refresher.refresh(&req.refresh_token).await?;
    Ok(Json(Data::new(RefreshResponse { token })))
}
