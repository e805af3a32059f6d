use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::user::AuthorSummary;

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image: Option<String>,

    /// Private posts never appear in the public listing or in search.
    #[serde(rename = "private")]
    pub is_private: bool,

    /// Author's user id. Not a foreign key; ownership is checked in handlers.
    pub author: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post as returned by the listing endpoints, with the author populated.
/// `author` is `null` when the referenced user no longer resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWithAuthor {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    #[serde(rename = "private")]
    pub is_private: bool,
    pub author: Option<AuthorSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostWithAuthor {
    pub fn new(post: Post, author: Option<AuthorSummary>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            image: post.image,
            is_private: post.is_private,
            author,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// Insert payload for the post store.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub is_private: bool,
    pub author: Uuid,
}

/// Fields written by an update. `None` leaves the stored value untouched.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub is_private: Option<bool>,
}

/// DTO for creating or updating a post, assembled from form fields.
#[derive(Debug, Deserialize, Validate)]
pub struct PostRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title and content are required (title at most 200 chars)"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 50000,
        message = "Title and content are required (content at most 50000 chars)"
    ))]
    pub content: String,
}

/// Query parameters for the search endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Paginated public listing (`GET /post`, `GET /post/search`).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub page: i64,
    pub total_pages: i64,
    pub total_posts: i64,
    pub posts: Vec<PostWithAuthor>,
}

/// Per-user listing, which also reports the visibility split.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPostPage {
    pub page: i64,
    pub total_pages: i64,
    pub total_posts: i64,
    pub total_published: i64,
    pub total_private: i64,
    pub posts: Vec<PostWithAuthor>,
}

/// Counts over every post of one author, independent of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorPostCounts {
    pub total: i64,
    pub published: i64,
    pub private: i64,
}
