use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use super::{discard_media, ensure_author, parse_id};
use crate::{
    error::AppError,
    extractors::QueryParams,
    media::upload_file,
    models::{
        pagination::{PageParams, Pagination},
        post::{NewPost, PostChanges, PostPage, PostRequest, SearchParams, UserPostPage},
        response::ApiResponse,
    },
    state::AppState,
    utils::{form::FormData, html::clean_html, jwt::CurrentUser},
};

/// Reads and validates `title` / `content`; the content is sanitized.
fn post_fields(form: &FormData) -> Result<PostRequest, AppError> {
    let payload = PostRequest {
        title: form.text_or_empty("title"),
        content: form.text_or_empty("content"),
    };
    payload.validate()?;

    let content = clean_html(&payload.content).trim().to_string();
    if content.is_empty() {
        return Err(AppError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }

    Ok(PostRequest {
        title: payload.title,
        content,
    })
}

/// Create a new post, optionally with an `image` file.
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut form: FormData,
) -> Result<impl IntoResponse, AppError> {
    let payload = post_fields(&form)?;
    let is_private = form.flag("private")?.unwrap_or(false);

    let image = match form.take_file("image") {
        Some(file) => Some(
            upload_file(
                state.media.as_ref(),
                &state.config.upload_staging_dir,
                &file,
                "Error uploading post image",
            )
            .await?,
        ),
        None => None,
    };

    let created = state
        .posts
        .create_post(NewPost {
            title: payload.title,
            content: payload.content,
            image: image.as_ref().map(|m| m.url.clone()),
            is_private,
            author: user.id,
        })
        .await;

    let post = match created {
        Ok(post) => post,
        Err(e) => {
            if let Some(image) = &image {
                discard_media(&state, &image.public_id).await;
            }
            return Err(e);
        }
    };

    tracing::info!(post_id = %post.id, author = %user.id, "Post created");

    Ok(ApiResponse::created("Post created successfully", post))
}

/// List public posts, newest first.
pub async fn list_posts(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::try_from(&params)?;
    let (posts, total) = state.posts.list_public_posts(page).await?;

    Ok(ApiResponse::ok(
        "Posts fetched successfully",
        PostPage {
            page: page.page,
            total_pages: page.total_pages(total),
            total_posts: total,
            posts,
        },
    ))
}

/// Case-insensitive title search over public posts.
/// A missing or blank `query` matches every public post.
pub async fn search_posts(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::from_raw(params.page.as_deref(), params.limit.as_deref())?;
    let query = params.query.as_deref().map(str::trim).unwrap_or_default();

    let (posts, total) = state.posts.search_public_posts(query, page).await?;

    Ok(ApiResponse::ok(
        "Posts fetched successfully",
        PostPage {
            page: page.page,
            total_pages: page.total_pages(total),
            total_posts: total,
            posts,
        },
    ))
}

/// Get a single post by ID. Direct fetches ignore the private flag.
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = parse_id(&post_id, "Post")?;

    let post = state
        .posts
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(ApiResponse::ok("Post fetched successfully", post))
}

/// Every post of one user, private ones included, with visibility counts.
pub async fn get_posts_of_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_id(&user_id, "User")?;
    let page = Pagination::try_from(&params)?;

    let (posts, counts) = state.posts.list_posts_by_author(user_id, page).await?;

    Ok(ApiResponse::ok(
        "Posts fetched successfully",
        UserPostPage {
            page: page.page,
            total_pages: page.total_pages(counts.total),
            total_posts: counts.total,
            total_published: counts.published,
            total_private: counts.private,
            posts,
        },
    ))
}

/// Update a post.
/// Requires: Login + Author.
///
/// `title` and `content` are required; `private` and `image` are kept when
/// omitted. A new `image` file takes precedence over an `image` URL field.
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    mut form: FormData,
) -> Result<impl IntoResponse, AppError> {
    let post_id = parse_id(&post_id, "Post")?;
    let payload = post_fields(&form)?;
    let is_private = form.flag("private")?;

    let post = state
        .posts
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    ensure_author(post.author, &user, "post")?;

    let uploaded = match form.take_file("image") {
        Some(file) => Some(
            upload_file(
                state.media.as_ref(),
                &state.config.upload_staging_dir,
                &file,
                "Error uploading post image",
            )
            .await?,
        ),
        None => None,
    };

    let image = uploaded
        .as_ref()
        .map(|m| m.url.clone())
        .or_else(|| form.text("image").map(str::to_string));

    let updated = state
        .posts
        .update_post(
            post_id,
            PostChanges {
                title: payload.title,
                content: payload.content,
                image,
                is_private,
            },
        )
        .await;

    let updated = match updated {
        Ok(Some(post)) => post,
        other => {
            if let Some(media) = &uploaded {
                discard_media(&state, &media.public_id).await;
            }
            return Err(match other {
                Err(e) => e,
                _ => AppError::NotFound("Post not found".to_string()),
            });
        }
    };

    Ok(ApiResponse::ok("Post updated successfully", updated))
}

/// Delete a post.
/// Requires: Login + Author. Comments on the post are left in place.
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = parse_id(&post_id, "Post")?;

    let post = state
        .posts
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    ensure_author(post.author, &user, "post")?;

    let deleted = state
        .posts
        .delete_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    tracing::info!(post_id = %deleted.id, author = %user.id, "Post deleted");

    Ok(ApiResponse::ok("Post deleted successfully", deleted))
}
