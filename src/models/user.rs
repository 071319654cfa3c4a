use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_AGENT: &str = "agent";
pub const ROLE_USER: &str = "user";

pub const ROLES: [&str; 4] = [ROLE_ADMIN, ROLE_MANAGER, ROLE_AGENT, ROLE_USER];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a user about to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
    pub email_notifications: bool,
    pub push_notifications: bool,
}

/// Partial update of a user record. `None` keeps the stored value.
///
/// The profile picture is not part of it; it only changes through
/// [`crate::services::user_store::UserStore::set_profile_picture`].
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}

impl User {
    /// Builds the record a store would persist for `new`.
    pub fn from_new(new: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            phone: new.phone,
            location: new.location,
            bio: new.bio,
            department: new.department,
            email_notifications: new.email_notifications,
            push_notifications: new.push_notifications,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(v) = changes.name {
            self.name = v;
        }
        if let Some(v) = changes.email {
            self.email = v;
        }
        if let Some(v) = changes.password_hash {
            self.password_hash = v;
        }
        if let Some(v) = changes.role {
            self.role = v;
        }
        if changes.phone.is_some() {
            self.phone = changes.phone;
        }
        if changes.location.is_some() {
            self.location = changes.location;
        }
        if changes.bio.is_some() {
            self.bio = changes.bio;
        }
        if changes.department.is_some() {
            self.department = changes.department;
        }
        if let Some(v) = changes.email_notifications {
            self.email_notifications = v;
        }
        if let Some(v) = changes.push_notifications {
            self.push_notifications = v;
        }
        self.updated_at = Utc::now();
    }
}
