use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::dto::user_dto::{AdminUpdateUserPayload, CreateUserPayload, UpdateProfilePayload};
use crate::error::{Error, Result};
use crate::models::user::{NewUser, User, UserChanges, ROLE_ADMIN, ROLE_USER};
use crate::services::upload_service::{ProfileUploads, UploadedFile};
use crate::services::user_store::UserStore;
use crate::utils::crypto::{hash_password, verify_password};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    uploads: ProfileUploads,
}

fn not_found() -> Error {
    Error::NotFound("User not found".to_string())
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, uploads: ProfileUploads) -> Self {
        Self { store, uploads }
    }

    pub fn uploads(&self) -> &ProfileUploads {
        &self.uploads
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.store.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.store.find_by_id(id).await?.ok_or_else(not_found)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = self.store.find_by_email(email.trim()).await?;
        match user {
            Some(user) if verify_password(password, &user.password_hash) => Ok(user),
            _ => Err(Error::Unauthorized("Invalid email or password".to_string())),
        }
    }

    pub async fn update_profile(&self, id: Uuid, payload: UpdateProfilePayload) -> Result<User> {
        self.store
            .update(id, payload.into())
            .await?
            .ok_or_else(not_found)
    }

    pub async fn create(&self, payload: CreateUserPayload) -> Result<User> {
        let email = payload.email.trim().to_lowercase();
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(Error::BadRequest("Email is already registered".to_string()));
        }

        let user = self
            .store
            .insert(NewUser {
                name: payload.name.trim().to_string(),
                email,
                password_hash: hash_password(&payload.password)?,
                role: payload
                    .role
                    .map(|r| r.to_lowercase())
                    .unwrap_or_else(|| ROLE_USER.to_string()),
                phone: payload.phone,
                location: payload.location,
                bio: payload.bio,
                department: payload.department,
                email_notifications: payload.email_notifications.unwrap_or(true),
                push_notifications: payload.push_notifications.unwrap_or(false),
            })
            .await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Creates the first admin account from deployment credentials.
    /// Returns `None` when an account with that email already exists.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<Option<User>> {
        let payload = CreateUserPayload {
            name: "Administrator".into(),
            email: email.trim().to_string(),
            password: password.to_string(),
            role: Some(ROLE_ADMIN.into()),
            phone: None,
            location: None,
            bio: None,
            department: None,
            email_notifications: None,
            push_notifications: None,
        };
        payload.validate()?;

        if self.store.find_by_email(&payload.email).await?.is_some() {
            return Ok(None);
        }
        self.create(payload).await.map(Some)
    }

    pub async fn update(&self, id: Uuid, payload: AdminUpdateUserPayload) -> Result<User> {
        let email = payload.email.map(|e| e.trim().to_lowercase());
        if let Some(ref email) = email {
            if let Some(existing) = self.store.find_by_email(email).await? {
                if existing.id != id {
                    return Err(Error::BadRequest("Email is already registered".to_string()));
                }
            }
        }
        let password_hash = match payload.password {
            Some(ref plain) => Some(hash_password(plain)?),
            None => None,
        };

        let changes = UserChanges {
            name: payload.name.map(|n| n.trim().to_string()),
            email,
            password_hash,
            role: payload.role.map(|r| r.to_lowercase()),
            phone: payload.phone,
            location: payload.location,
            bio: payload.bio,
            department: payload.department,
            email_notifications: payload.email_notifications,
            push_notifications: payload.push_notifications,
        };
        self.store.update(id, changes).await?.ok_or_else(not_found)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let user = self.store.delete(id).await?.ok_or_else(not_found)?;
        if let Some(ref picture) = user.profile_picture {
            self.uploads.remove(picture).await;
        }
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Records `file` as the user's picture, then removes the previous one.
    ///
    /// The record update is the confirming step: if it fails, or the user no
    /// longer exists, the new file is removed again and the old one is kept.
    pub async fn replace_profile_picture(&self, id: Uuid, file: UploadedFile) -> Result<User> {
        let new_url = file.public_url();
        let previous = match self.store.find_by_id(id).await {
            Ok(Some(user)) => user.profile_picture,
            Ok(None) => {
                self.uploads.remove(&new_url).await;
                return Err(not_found());
            }
            Err(e) => {
                self.uploads.remove(&new_url).await;
                return Err(e);
            }
        };

        let user = match self.store.set_profile_picture(id, Some(new_url.clone())).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.uploads.remove(&new_url).await;
                return Err(not_found());
            }
            Err(e) => {
                tracing::error!(user_id = %id, "Failed to record profile picture: {}", e);
                self.uploads.remove(&new_url).await;
                return Err(e);
            }
        };
        tracing::info!(user_id = %id, path = %new_url, "Profile picture updated");

        if let Some(old) = previous.filter(|old| *old != new_url) {
            self.uploads.remove(&old).await;
        }
        Ok(user)
    }

    /// Clears the user's picture reference, then removes the file.
    /// Succeeds without changes when no picture is set.
    pub async fn remove_profile_picture(&self, id: Uuid) -> Result<User> {
        let user = self.get(id).await?;
        let Some(old) = user.profile_picture else {
            return Ok(user);
        };

        let user = self
            .store
            .set_profile_picture(id, None)
            .await?
            .ok_or_else(not_found)?;
        self.uploads.remove(&old).await;
        Ok(user)
    }
}
