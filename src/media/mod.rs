//! Media upload adapter.
//!
//! Handlers never talk to a storage backend directly: the uploaded file is
//! staged on local disk, handed to a `MediaStore`, and only the returned URL
//! is persisted.

pub mod local;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::{error::AppError, utils::form::UploadedFile};

pub use local::LocalMediaStore;

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub url: String,
    /// Identifier accepted by `MediaStore::destroy`.
    pub public_id: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persists a staged file and returns its durable location.
    async fn upload(&self, staged: &Path) -> Result<StoredMedia, AppError>;

    /// Removes a previously uploaded asset.
    async fn destroy(&self, public_id: &str) -> Result<(), AppError>;
}

/// Extension of an uploaded file name, lowercased, restricted to ASCII
/// alphanumerics.
fn safe_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Writes the file under `dir` with a random name, keeping its extension.
pub async fn stage_file(dir: &Path, file: &UploadedFile) -> Result<PathBuf, AppError> {
    tokio::fs::create_dir_all(dir).await?;

    let mut name = Uuid::new_v4().simple().to_string();
    if let Some(ext) = safe_extension(&file.file_name) {
        name.push('.');
        name.push_str(&ext);
    }

    let path = dir.join(name);
    tokio::fs::write(&path, &file.data).await?;
    Ok(path)
}

/// Stage, upload, then drop the staged copy whatever the outcome.
///
/// Any failure surfaces as `UploadError(failure_message)`; the cause is logged.
pub async fn upload_file(
    media: &dyn MediaStore,
    staging_dir: &Path,
    file: &UploadedFile,
    failure_message: &str,
) -> Result<StoredMedia, AppError> {
    let staged = stage_file(staging_dir, file).await.map_err(|e| {
        tracing::error!("Failed to stage upload '{}': {}", file.file_name, e);
        AppError::UploadError(failure_message.to_string())
    })?;

    let result = media.upload(&staged).await;

    if let Err(e) = tokio::fs::remove_file(&staged).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove staged file {}: {}", staged.display(), e);
        }
    }

    result.map_err(|e| {
        tracing::error!("Media store rejected '{}': {}", file.file_name, e);
        AppError::UploadError(failure_message.to_string())
    })
}

/// Public id of an asset from its URL: the last path segment without its
/// extension. Relative URLs (`/media/abc.png`) are accepted.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(url)))
        .ok()?;

    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let id = last.split('.').next()?;

    (!id.is_empty()).then(|| id.to_string())
}
