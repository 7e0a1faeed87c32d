use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::services::{ActivationOutcome, GeneratedCode, PollOutcome, TokenBundle};
use crate::utils::to_date_time_string;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GenerateCodeRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PollCodeRequest {
    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    #[schema(example = "042371", min_length = 6, max_length = 6)]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ActivateCodeRequest {
    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    #[schema(example = "042371", min_length = 6, max_length = 6)]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateCodeResponse {
    #[schema(example = "042371")]
    pub code: String,
    #[schema(example = "2025-02-09 14:40:53")]
    pub expires_at: String,
}

impl From<GeneratedCode> for GenerateCodeResponse {
    fn from(generated: GeneratedCode) -> Self {
        Self {
            code: generated.code,
            expires_at: to_date_time_string(generated.expires_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PollCodeResponse {
    #[schema(example = false)]
    pub activated: bool,
    #[schema(example = "2025-02-09 14:40:53")]
    pub expires_at: String,
    /// Only present on the poll that completes the pairing.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token: Option<TokenBundle>,
}

impl From<PollOutcome> for PollCodeResponse {
    fn from(outcome: PollOutcome) -> Self {
        Self {
            activated: outcome.activated,
            expires_at: to_date_time_string(outcome.expires_at),
            token: outcome.token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivateCodeResponse {
    #[schema(example = true)]
    pub activated: bool,
    #[schema(example = "2025-02-09 14:40:53")]
    pub expires_at: String,
}

impl From<ActivationOutcome> for ActivateCodeResponse {
    fn from(outcome: ActivationOutcome) -> Self {
        Self {
            activated: true,
            expires_at: to_date_time_string(outcome.expires_at),
        }
    }
}
