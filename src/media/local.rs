use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use super::{MediaStore, StoredMedia};
use crate::error::AppError;

/// Local filesystem implementation of `MediaStore`.
///
/// Files are copied into `root_path` under a random name and served by the
/// router at `url_prefix`.
pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./public/media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root_path: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    #[cfg(test)]
    fn root(&self) -> &Path {
        &self.root_path
    }
}

fn is_valid_public_id(public_id: &str) -> bool {
    !public_id.is_empty()
        && public_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(&self, staged: &Path) -> Result<StoredMedia, AppError> {
        fs::create_dir_all(&self.root_path).await?;

        let public_id = Uuid::new_v4().simple().to_string();
        let file_name = match staged.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", public_id, ext),
            None => public_id.clone(),
        };

        fs::copy(staged, self.root_path.join(&file_name)).await?;

        Ok(StoredMedia {
            url: format!("{}/{}", self.url_prefix.trim_end_matches('/'), file_name),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), AppError> {
        if !is_valid_public_id(public_id) {
            return Err(AppError::BadRequest(format!("Invalid media id '{}'", public_id)));
        }

        let mut removed = false;
        let mut entries = fs::read_dir(&self.root_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(public_id) {
                fs::remove_file(&path).await?;
                removed = true;
            }
        }

        if !removed {
            return Err(AppError::NotFound(format!("Media '{}' not found", public_id)));
        }
        Ok(())
    }
}
