//! # Store traits
//!
//! Persistence contracts for users, posts and comments. `PgStore` backs the
//! server when a database is configured; `MemoryStore` otherwise, and in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, NewComment},
        pagination::Pagination,
        post::{AuthorPostCounts, NewPost, Post, PostChanges, PostWithAuthor},
        user::{NewUser, User},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Identity persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Any user holding either the username or the email.
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` when the new username or email belongs to someone else.
    async fn update_account(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError>;

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> Result<Option<User>, AppError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;

    /// Overwrites (or clears, with `None`) the stored refresh token.
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), AppError>;

    /// Replaces the stored refresh token with `next` only if it still equals
    /// `current`. Returns whether the swap happened.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, AppError>;
}

/// Post persistence. Listings are newest first.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, post: NewPost) -> Result<Post, AppError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, AppError>;

    /// One page of non-private posts and the total number of them.
    async fn list_public_posts(
        &self,
        page: Pagination,
    ) -> Result<(Vec<PostWithAuthor>, i64), AppError>;

    /// Non-private posts whose title contains `query`, case-insensitively.
    async fn search_public_posts(
        &self,
        query: &str,
        page: Pagination,
    ) -> Result<(Vec<PostWithAuthor>, i64), AppError>;

    /// One page of every post by `author`, private ones included.
    async fn list_posts_by_author(
        &self,
        author: Uuid,
        page: Pagination,
    ) -> Result<(Vec<PostWithAuthor>, AuthorPostCounts), AppError>;

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, AppError>;

    /// Returns the deleted post, if it existed.
    async fn delete_post(&self, id: Uuid) -> Result<Option<Post>, AppError>;
}

/// Comment persistence.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, AppError>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError>;

    /// Oldest first.
    async fn list_comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, AppError>;

    async fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>, AppError>;

    async fn delete_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError>;
}
