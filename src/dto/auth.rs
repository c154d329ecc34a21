use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Scorer login form.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// Token to send back in the `X-Scorer-Token` header.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

/// Which scorer credential variables are set. Values are never echoed.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfigResponse {
    pub has_username: bool,
    pub has_password: bool,
    pub username_length: usize,
    pub password_length: usize,
}
