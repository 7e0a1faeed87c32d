use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::{
        ActivateCodeRequest, ActivateCodeResponse, Data, GenerateCodeRequest,
        GenerateCodeResponse, PollCodeRequest, PollCodeResponse,
    },
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

/// Generate a pairing code for the account behind an e-mail address
#[utoipa::path(
    post,
    path = "/api/generate-tv-code",
    request_body = GenerateCodeRequest,
    responses(
        (status = 201, description = "Code generated, returned under `data`", body = GenerateCodeResponse),
        (status = 404, description = "No user with that e-mail", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "TV Pairing"
)]
pub async fn generate_tv_code(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<GenerateCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let generated = state.pairing.generate(&req.email).await?;
    Ok((
        StatusCode::CREATED,
        Json(Data::new(GenerateCodeResponse::from(generated))),
    ))
}

/// Poll the state of a pairing code from the TV
///
/// Once the code has been activated the first poll returns the TV's tokens
/// and consumes the code.
#[utoipa::path(
    post,
    path = "/api/poll-tv-code",
    request_body = PollCodeRequest,
    responses(
        (status = 200, description = "Current code state, returned under `data`", body = PollCodeResponse),
        (status = 404, description = "Code unknown, expired or consumed", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many polls from this address", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "TV Pairing"
)]
pub async fn poll_tv_code(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PollCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.pairing.poll(&req.code).await?;
    Ok(Json(Data::new(PollCodeResponse::from(outcome))))
}

/// Activate a pairing code from the signed-in mobile app
#[utoipa::path(
    post,
    path = "/api/active-tv-code",
    request_body = ActivateCodeRequest,
    responses(
        (status = 200, description = "Code activated, returned under `data`", body = ActivateCodeResponse),
        (status = 401, description = "Missing, invalid or under-scoped token", body = ErrorResponse),
        (status = 403, description = "Code belongs to another user", body = ErrorResponse),
        (status = 404, description = "Code unknown or expired", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 503, description = "Code is locked by a concurrent activation", body = ErrorResponse)
    ),
    tag = "TV Pairing",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn activate_tv_code(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<ActivateCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.pairing.activate(&req.code, user.user_id).await?;
    Ok(Json(Data::with_message(
        "TV code activated",
        ActivateCodeResponse::from(outcome),
    )))
}
