// src/handlers/mod.rs

pub mod comment;
pub mod post;
pub mod user;

use uuid::Uuid;

use crate::{error::AppError, models::user::User, state::AppState};

/// Parses a path identifier. A malformed id is a bad request, like a missing field.
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("Invalid {} ID", resource)))
}

/// Only the author may modify or delete a post or comment.
pub(crate) fn ensure_author(author: Uuid, user: &User, resource: &str) -> Result<(), AppError> {
    if author != user.id {
        return Err(AppError::Forbidden(format!(
            "You are not allowed to modify this {}",
            resource
        )));
    }
    Ok(())
}

/// Best-effort removal of a media asset; failures are only logged.
pub(crate) async fn discard_media(state: &AppState, public_id: &str) {
    if let Err(e) = state.media.destroy(public_id).await {
        tracing::warn!("Failed to remove media '{}': {}", public_id, e);
    }
}
