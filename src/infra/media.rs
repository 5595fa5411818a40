//! Filesystem storage for post image attachments.
//!
//! Images are stored under a `posts/` prefix keyed by the (sanitized)
//! original filename; a name collision gets a short random suffix instead
//! of overwriting the earlier upload.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

const POSTS_PREFIX: &str = "posts";

#[derive(Debug, Error)]
pub enum MediaStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error("uploaded image is empty")]
    EmptyPayload,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Filesystem-backed image storage rooted at the configured media directory.
#[derive(Debug)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    /// Initialise storage rooted at the provided directory, creating it if
    /// necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(root.join(POSTS_PREFIX))?;
        Ok(Self { root })
    }

    /// Store an uploaded image and return its stored path
    /// (`posts/<filename>`).
    pub async fn store(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<String, MediaStorageError> {
        if data.is_empty() {
            return Err(MediaStorageError::EmptyPayload);
        }

        let filename = sanitize_filename(original_name);
        let mut stored_path = format!("{POSTS_PREFIX}/{filename}");
        if fs::try_exists(self.resolve(&stored_path)?).await? {
            stored_path = format!("{POSTS_PREFIX}/{}", suffixed(&filename));
        }

        let absolute = self.resolve(&stored_path)?;
        let mut file = fs::File::create(&absolute).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        Ok(stored_path)
    }

    /// Read a stored image back into memory.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, MediaStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Reject absolute paths and parent traversal before touching the disk.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, MediaStorageError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(MediaStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "image".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

fn suffixed(filename: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    let short = &suffix[..8];
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-{short}.{ext}"),
        None => format!("{filename}-{short}"),
    }
}
