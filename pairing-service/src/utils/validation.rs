use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::dtos::ErrorResponse;

/// JSON body extractor that also runs `validator` rules; rule violations are
/// reported as 422 with the failing fields in the message.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                // Keep axum's own status: 415 for a missing content type,
                // 422 for a well-formed body of the wrong shape, 400 otherwise.
                let err_resp = ErrorResponse {
                    error: rejection.body_text(),
                };
                (rejection.status(), Json(err_resp)).into_response()
            })?;

        value.validate().map_err(|e| {
            let err_resp = ErrorResponse {
                error: format!("Validation failed: {}", e),
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(err_resp)).into_response()
        })?;

        Ok(ValidatedJson(value))
    }
}
