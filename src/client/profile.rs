//! Profile page flow: editing the profile form and the upload/delete cycle
//! of the profile picture.
//!
//! The picture follows a small state machine:
//!
//! ```text
//! Idle ──select_file──▶ Uploading{preview} ──upload_selected──▶ Settled(Success | Failed)
//! Idle ──request_delete──▶ ConfirmingDelete ──confirm_delete──▶ Deleting ──▶ Settled(..)
//!                                  └──cancel_delete──▶ Idle
//! ```
//!
//! The local preview shown while uploading is a [`PreviewUrl`], which releases
//! itself when dropped. Leaving `Uploading` by any path, including dropping
//! the page mid-flight, therefore cleans it up.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::api::{ProfileApi, SelectedFile};
use super::session::SessionStore;
use super::{ClientError, ClientResult};
use crate::dto::user_dto::{UpdateProfilePayload, UserResponse};
use crate::utils::time::unix_millis;
use crate::utils::validation::{validate_image, UploadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// Hands out local preview URLs and tracks which are still live.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<String>>>,
    next_id: Arc<AtomicU64>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, file: &SelectedFile) -> PreviewUrl {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("blob:preview/{}/{}", id, file.name);
        self.live().insert(url.clone());
        PreviewUrl {
            url,
            registry: self.clone(),
        }
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live().contains(url)
    }

    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    fn live(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A live preview; revoked on drop.
#[derive(Debug)]
pub struct PreviewUrl {
    url: String,
    registry: PreviewRegistry,
}

impl PreviewUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewUrl {
    fn drop(&mut self) {
        self.registry.live().remove(&self.url);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(String),
}

#[derive(Debug)]
pub enum PictureState {
    Idle,
    Uploading {
        preview: PreviewUrl,
        file: SelectedFile,
    },
    ConfirmingDelete,
    Deleting,
    Settled(Outcome),
}

impl PictureState {
    pub fn is_busy(&self) -> bool {
        matches!(self, PictureState::Uploading { .. } | PictureState::Deleting)
    }
}

pub struct ProfilePage<'a, A: ProfileApi + ?Sized> {
    api: &'a A,
    session: &'a mut SessionStore,
    origin: String,
    previews: PreviewRegistry,
    profile: Option<UserResponse>,
    picture: PictureState,
    image_timestamp: i64,
    notifications: Vec<Notification>,
}

impl<'a, A: ProfileApi + ?Sized> ProfilePage<'a, A> {
    /// `origin` is prefixed to stored picture paths to build image URLs.
    /// The profile starts out as the session's user until [`Self::load`].
    pub fn new(
        api: &'a A,
        session: &'a mut SessionStore,
        previews: PreviewRegistry,
        origin: impl Into<String>,
    ) -> Self {
        let profile = session.user().cloned();
        Self {
            api,
            session,
            origin: origin.into().trim_end_matches('/').to_string(),
            previews,
            profile,
            picture: PictureState::Idle,
            image_timestamp: unix_millis(),
            notifications: Vec::new(),
        }
    }

    pub async fn load(&mut self) -> ClientResult<()> {
        self.refetch().await
    }

    pub fn profile(&self) -> Option<&UserResponse> {
        self.profile.as_ref()
    }

    pub fn session(&self) -> &SessionStore {
        &*self.session
    }

    pub fn picture_state(&self) -> &PictureState {
        &self.picture
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.picture, PictureState::Uploading { .. })
    }

    pub fn image_timestamp(&self) -> i64 {
        self.image_timestamp
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// The image to show: the live preview, else the stored picture with a
    /// cache-busting timestamp, else `None`.
    pub fn display_url(&self) -> Option<String> {
        if let PictureState::Uploading { preview, .. } = &self.picture {
            return Some(preview.as_str().to_string());
        }
        self.profile
            .as_ref()
            .and_then(|p| p.profile_picture.as_ref())
            .map(|path| format!("{}{}?t={}", self.origin, path, self.image_timestamp))
    }

    /// Letter shown in place of a missing picture.
    pub fn initial(&self) -> char {
        self.profile
            .as_ref()
            .and_then(|p| p.name.chars().next())
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or('U')
    }

    pub fn can_delete(&self) -> bool {
        !self.picture.is_busy()
            && self
                .profile
                .as_ref()
                .is_some_and(|p| p.profile_picture.is_some())
    }

    /// Form defaults for the editable fields.
    pub fn form_defaults(&self) -> UpdateProfilePayload {
        match &self.profile {
            Some(p) => UpdateProfilePayload {
                name: Some(p.name.clone()),
                phone: p.phone.clone(),
                location: p.location.clone(),
                bio: p.bio.clone(),
                email_notifications: Some(p.email_notifications),
                push_notifications: Some(p.push_notifications),
            },
            None => UpdateProfilePayload::default(),
        }
    }

    /// Pre-checks `file` and, when it passes, shows a local preview and
    /// enters `Uploading`.
    pub fn select_file(&mut self, file: SelectedFile) -> ClientResult<()> {
        if self.picture.is_busy() {
            return Err(ClientError::Validation(
                "Another picture operation is in progress".to_string(),
            ));
        }
        if let Err(e) = validate_image(&file.name, &file.mime, file.size()) {
            let message = match e {
                UploadError::TooLarge { .. } => "File size must be less than 5MB",
                UploadError::Empty => "The selected file is empty",
                _ => "Only image files are allowed (JPEG, PNG, GIF)",
            };
            self.notify(NotificationKind::Error, message);
            return Err(e.into());
        }

        let preview = self.previews.create(&file);
        self.picture = PictureState::Uploading { preview, file };
        Ok(())
    }

    /// Sends the selected file and reconciles local state with the server.
    pub async fn upload_selected(&mut self) -> ClientResult<()> {
        let file = match &self.picture {
            PictureState::Uploading { file, .. } => file.clone(),
            _ => return Err(ClientError::Validation("No file selected".to_string())),
        };

        let result = self.upload_and_refresh(&file).await;
        // Dropping the old state revokes the preview.
        self.picture = PictureState::Idle;

        match result {
            Ok(()) => {
                self.picture = PictureState::Settled(Outcome::Success);
                self.notify(
                    NotificationKind::Success,
                    "Profile picture updated successfully!",
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("Upload failed: {}", e);
                let message = e
                    .server_message()
                    .unwrap_or("Failed to upload profile picture")
                    .to_string();
                self.picture = PictureState::Settled(Outcome::Failed(message.clone()));
                self.notify(NotificationKind::Error, message);
                Err(e)
            }
        }
    }

    async fn upload_and_refresh(&mut self, file: &SelectedFile) -> ClientResult<()> {
        let stored = self.api.upload_profile_picture(file).await?;
        tracing::debug!(path = %stored, "Upload accepted");
        self.refresh_after_change().await
    }

    /// Asks for confirmation before a delete. Returns whether the page is now
    /// waiting for it.
    pub fn request_delete(&mut self) -> bool {
        if !self.can_delete() {
            return false;
        }
        self.picture = PictureState::ConfirmingDelete;
        true
    }

    pub fn cancel_delete(&mut self) {
        if matches!(self.picture, PictureState::ConfirmingDelete) {
            self.picture = PictureState::Idle;
        }
    }

    pub async fn confirm_delete(&mut self) -> ClientResult<()> {
        if !matches!(self.picture, PictureState::ConfirmingDelete) {
            return Err(ClientError::Validation(
                "Deletion was not confirmed".to_string(),
            ));
        }
        self.picture = PictureState::Deleting;

        let result = match self.api.delete_profile_picture().await {
            Ok(()) => self.refresh_after_change().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.picture = PictureState::Settled(Outcome::Success);
                self.notify(
                    NotificationKind::Success,
                    "Profile picture deleted successfully!",
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("Delete failed: {}", e);
                let message = "Failed to delete profile picture".to_string();
                self.picture = PictureState::Settled(Outcome::Failed(message.clone()));
                self.notify(NotificationKind::Error, message);
                Err(e)
            }
        }
    }

    /// Saves the editable profile fields. `name` is required.
    pub async fn submit_profile(&mut self, form: UpdateProfilePayload) -> ClientResult<UserResponse> {
        let has_name = form
            .name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());
        if !has_name {
            return Err(ClientError::Validation("Name is required".to_string()));
        }

        match self.api.update_profile(&form).await {
            Ok(user) => {
                self.notify(NotificationKind::Success, "Profile updated successfully");
                self.session.update_user(&user)?;
                if let Err(e) = self.refetch().await {
                    tracing::warn!("Failed to refetch profile: {}", e);
                    self.profile = Some(user.clone());
                }
                Ok(user)
            }
            Err(e) => {
                self.notify(NotificationKind::Error, "Failed to update profile");
                Err(e)
            }
        }
    }

    async fn refresh_after_change(&mut self) -> ClientResult<()> {
        self.session.refresh_user(self.api).await?;
        self.refetch().await?;
        self.image_timestamp = unix_millis().max(self.image_timestamp + 1);
        Ok(())
    }

    async fn refetch(&mut self) -> ClientResult<()> {
        let profile = self.api.get_profile().await?;
        self.profile = Some(profile);
        Ok(())
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.notifications.push(Notification {
            kind,
            message: message.into(),
        });
    }
}
