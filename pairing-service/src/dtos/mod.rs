pub mod auth;
pub mod tv;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use auth::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};
pub use tv::{
    ActivateCodeRequest, ActivateCodeResponse, GenerateCodeRequest, GenerateCodeResponse,
    PollCodeRequest, PollCodeResponse,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Code not found or expired")]
    pub error: String,
}

/// Success envelope: every payload is returned under `data`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Data<T> {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self {
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: Some(message.into()),
            data,
        }
    }
}
