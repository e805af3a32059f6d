use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use super::{ensure_author, parse_id};
use crate::{
    error::AppError,
    extractors::JsonBody,
    models::{
        comment::{CommentRequest, NewComment},
        response::ApiResponse,
    },
    state::AppState,
    utils::{html::clean_html, jwt::CurrentUser},
};

fn comment_content(payload: CommentRequest) -> Result<String, AppError> {
    let payload = payload.normalized();
    payload.validate()?;

    let content = clean_html(&payload.content).trim().to_string();
    if content.is_empty() {
        return Err(AppError::BadRequest("Content is required".to_string()));
    }
    Ok(content)
}

/// Create a new comment.
///
/// The post id only has to be well formed; whether the post exists is not
/// checked.
pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    JsonBody(payload): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = parse_id(&post_id, "Post")?;
    let content = comment_content(payload)?;

    let comment = state
        .comments
        .create_comment(NewComment {
            content,
            author: user.id,
            post_id,
        })
        .await?;

    Ok(ApiResponse::created("Comment added successfully", comment))
}

/// List all comments for a post, oldest first.
pub async fn get_comments_by_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = parse_id(&post_id, "Post")?;

    let comments = state.comments.list_comments_for_post(post_id).await?;

    Ok(ApiResponse::ok("Comments fetched successfully", comments))
}

pub async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<String>,
    JsonBody(payload): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment_id = parse_id(&comment_id, "Comment")?;
    let content = comment_content(payload)?;

    let comment = state
        .comments
        .find_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    ensure_author(comment.author, &user, "comment")?;

    let updated = state
        .comments
        .update_comment(comment_id, &content)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    Ok(ApiResponse::ok("Comment updated successfully", updated))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let comment_id = parse_id(&comment_id, "Comment")?;

    let comment = state
        .comments
        .find_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    ensure_author(comment.author, &user, "comment")?;

    let deleted = state
        .comments
        .delete_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    Ok(ApiResponse::ok("Comment deleted successfully", deleted))
}
