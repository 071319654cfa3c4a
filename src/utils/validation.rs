use std::path::Path;

use validator::ValidationError;

use crate::models::user::ROLES;

/// Upper bound for a profile picture, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/gif"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    Missing,

    #[error("Uploaded file is empty")]
    Empty,

    #[error("Only image files are allowed (jpeg, jpg, png, gif)")]
    UnsupportedType,

    #[error("File size must be less than 5MB")]
    TooLarge { size: usize },
}

/// Checks an image against the profile picture allow-list and size cap.
///
/// Both the extension of `file_name` and the declared `mime` must be allowed.
/// Returns the lower-cased extension to store the file under.
pub fn validate_image(file_name: &str, mime: &str, size: usize) -> Result<String, UploadError> {
    if size > MAX_IMAGE_BYTES {
        return Err(UploadError::TooLarge { size });
    }
    if size == 0 {
        return Err(UploadError::Empty);
    }

    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or(UploadError::UnsupportedType)?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::UnsupportedType);
    }

    let mime = mime.trim().to_ascii_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(UploadError::UnsupportedType);
    }

    Ok(ext)
}

/// Rejects names that are empty once surrounding whitespace is removed.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("blank_name");
        err.message = Some("Name is required".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_role(role: &str) -> Result<(), ValidationError> {
    if ROLES.iter().any(|r| r.eq_ignore_ascii_case(role)) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_role"))
    }
}
