use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author: Uuid,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for the comment store.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub author: Uuid,
    pub post_id: Uuid,
}

/// DTO for creating or editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Content is required (at most 2000 characters)"
    ))]
    pub content: String,
}

impl CommentRequest {
    /// Trims the content before validation so whitespace-only input is rejected.
    pub fn normalized(mut self) -> Self {
        self.content = self.content.trim().to_string();
        self
    }
}
