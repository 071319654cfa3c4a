use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::user::{User, UserChanges};
use crate::utils::validation::{validate_name, validate_role};

/// A user as exposed over the API. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
    #[serde(default)]
    pub email_notifications: bool,
    #[serde(default)]
    pub push_notifications: bool,
    pub profile_picture: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            role: value.role,
            phone: value.phone,
            location: value.location,
            bio: value.bio,
            department: value.department,
            email_notifications: value.email_notifications,
            push_notifications: value.push_notifications,
            profile_picture: value.profile_picture,
            created_at: Some(value.created_at),
            updated_at: Some(value.updated_at),
        }
    }
}

/// Self-service profile update. Only these fields are writable; anything else
/// in the request body (email, role, department, ...) is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(custom(function = "validate_name"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}

impl From<UpdateProfilePayload> for UserChanges {
    fn from(value: UpdateProfilePayload) -> Self {
        Self {
            name: value.name.map(|n| n.trim().to_string()),
            phone: value.phone,
            location: value.location,
            bio: value.bio,
            email_notifications: value.email_notifications,
            push_notifications: value.push_notifications,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(custom(function = "validate_role"))]
    pub role: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserPayload {
    #[validate(custom(function = "validate_name"))]
    pub name: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    #[validate(custom(function = "validate_role"))]
    pub role: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    pub status: String,
    pub user: UserResponse,
}

impl UserEnvelope {
    pub fn success(user: impl Into<UserResponse>) -> Self {
        Self {
            status: "success".into(),
            user: user.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub status: String,
    pub count: usize,
    pub users: Vec<UserResponse>,
}

impl From<Vec<User>> for UserListResponse {
    fn from(users: Vec<User>) -> Self {
        let users: Vec<UserResponse> = users.into_iter().map(Into::into).collect();
        Self {
            status: "success".into(),
            count: users.len(),
            users,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub status: String,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePictureResponse {
    pub status: String,
    pub message: String,
    pub profile_picture: String,
}
