use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::Rng;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::utils::{time::unix_millis, validation::validate_image};

/// URL prefix under which stored profile pictures are served.
pub const PUBLIC_PREFIX: &str = "/uploads/profiles/";

const PROFILE_SUBDIR: &str = "profiles";
const NAME_ATTEMPTS: usize = 5;

/// A file accepted and written by [`ProfileUploads::store`].
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub stored_name: String,
    pub size: usize,
    pub mime: String,
}

impl UploadedFile {
    pub fn public_url(&self) -> String {
        format!("{}{}", PUBLIC_PREFIX, self.stored_name)
    }
}

/// Profile picture storage rooted at `<uploads>/profiles`.
#[derive(Debug, Clone)]
pub struct ProfileUploads {
    dir: PathBuf,
}

impl ProfileUploads {
    pub fn new(uploads_root: impl AsRef<Path>) -> Self {
        Self {
            dir: uploads_root.as_ref().join(PROFILE_SUBDIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Validates and writes an image under a freshly generated name.
    ///
    /// Nothing touches the disk unless validation passes.
    pub async fn store(&self, original_name: &str, mime: &str, data: &[u8]) -> Result<UploadedFile> {
        let ext = validate_image(original_name, mime, data.len())?;
        self.ensure_dir().await?;

        for _ in 0..NAME_ATTEMPTS {
            let stored_name = generate_name(&ext);
            let path = self.dir.join(&stored_name);
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = write_all(&mut file, data).await {
                tracing::error!("Failed to write profile picture {}: {}", path.display(), e);
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(e.into());
            }

            tracing::info!(
                original = original_name,
                stored = %stored_name,
                size = data.len(),
                "Stored profile picture"
            );
            return Ok(UploadedFile {
                original_name: original_name.to_string(),
                stored_name,
                size: data.len(),
                mime: mime.to_string(),
            });
        }

        Err(Error::Internal(
            "Could not allocate a unique file name".to_string(),
        ))
    }

    /// Maps a stored public URL to its file. Only the final path component is
    /// used, so the result always lies inside the profile directory.
    pub fn path_for(&self, public_url: &str) -> Option<PathBuf> {
        let path = public_url.split(['?', '#']).next().unwrap_or_default();
        let name = Path::new(path).file_name()?;
        Some(self.dir.join(name))
    }

    /// Deletes the file behind `public_url`. A missing file is not an error;
    /// any other failure is logged and swallowed.
    pub async fn remove(&self, public_url: &str) -> bool {
        let Some(path) = self.path_for(public_url) else {
            tracing::warn!("Ignoring malformed profile picture reference: {}", public_url);
            return false;
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Deleted profile picture: {}", path.display());
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!("Failed to delete profile picture {}: {}", path.display(), e);
                false
            }
        }
    }
}

async fn write_all(file: &mut fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

fn generate_name(ext: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("profile-{}-{}.{}", unix_millis(), suffix, ext)
}
