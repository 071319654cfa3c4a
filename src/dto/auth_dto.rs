use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::user_dto::UserResponse;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub status: String,
    pub token: String,
    pub user: UserResponse,
}
