// src/handlers/user.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
};
use validator::Validate;

use super::{discard_media, parse_id};
use crate::{
    error::AppError,
    extractors::JsonBody,
    media::{public_id_from_url, upload_file},
    models::{
        response::ApiResponse,
        user::{
            ChangePasswordRequest, LoginRequest, LoginResponse, NewUser, RefreshTokenRequest,
            RegisterRequest, UpdateAccountRequest,
        },
    },
    state::AppState,
    utils::{
        cookie::{REFRESH_COOKIE_NAME, clear_session_cookies, get_cookie, session_cookies},
        form::FormData,
        hash::{hash_password, verify_password},
        jwt::{CurrentUser, TokenPair, verify_token},
    },
};

/// Registers a new user.
///
/// Multipart body with `username`, `email`, `password` and an `avatar` file.
/// The avatar is uploaded before the user is created; a session is opened
/// right away (cookies set, refresh token stored).
pub async fn register(
    State(state): State<AppState>,
    mut form: FormData,
) -> Result<impl IntoResponse, AppError> {
    let payload = RegisterRequest {
        username: form.text_or_empty("username"),
        email: form.text_or_empty("email"),
        password: form.raw("password").unwrap_or_default().to_string(),
    };
    if [&payload.username, &payload.email, &payload.password]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }
    payload.validate()?;

    let username = payload.username.to_lowercase();

    if state
        .users
        .find_user_by_username_or_email(&username, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "User with this username or email already exists".to_string(),
        ));
    }

    let avatar_file = form
        .take_file("avatar")
        .ok_or_else(|| AppError::BadRequest("Avatar file is required".to_string()))?;

    let hashed_password = hash_password(&payload.password)?;

    let avatar = upload_file(
        state.media.as_ref(),
        &state.config.upload_staging_dir,
        &avatar_file,
        "Error uploading avatar",
    )
    .await?;

    let user = match state
        .users
        .create_user(NewUser {
            username,
            email: payload.email,
            password: hashed_password,
            avatar: avatar.url.clone(),
        })
        .await
    {
        Ok(user) => user,
        Err(e) => {
            discard_media(&state, &avatar.public_id).await;
            return Err(e);
        }
    };

    let tokens = TokenPair::issue(&state.config, user.id)?;
    state
        .users
        .set_refresh_token(user.id, Some(&tokens.refresh_token))
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        AppendHeaders(session_cookies(&state.config, &tokens)),
        ApiResponse::created("User registered successfully", user),
    ))
}

/// Authenticates a user and opens a session.
///
/// Unknown usernames and wrong passwords get the same 401.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = payload.username.trim().to_lowercase();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }
    payload.validate()?;

    let user = state
        .users
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let tokens = TokenPair::issue(&state.config, user.id)?;
    state
        .users
        .set_refresh_token(user.id, Some(&tokens.refresh_token))
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        AppendHeaders(session_cookies(&state.config, &tokens)),
        ApiResponse::ok(
            "User logged in successfully",
            LoginResponse {
                user,
                access_token: tokens.access_token.clone(),
                refresh_token: tokens.refresh_token.clone(),
            },
        ),
    ))
}

/// Ends the session: the stored refresh token is cleared, so any refresh
/// token still held by a client stops working immediately.
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    state.users.set_refresh_token(user.id, None).await?;

    tracing::info!(user_id = %user.id, "User logged out");

    Ok((
        AppendHeaders(clear_session_cookies(&state.config)),
        ApiResponse::message(StatusCode::OK, "User logged out successfully"),
    ))
}

/// Exchanges a refresh token for a new access/refresh pair.
///
/// The token comes from the `refreshToken` cookie or the JSON body. It must
/// equal the one stored on the user; the swap to the new token is atomic, so
/// every refresh token works at most once.
pub async fn refresh_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let incoming = match get_cookie(&headers, REFRESH_COOKIE_NAME) {
        Some(token) => Some(token.to_string()),
        None => serde_json::from_slice::<RefreshTokenRequest>(&body)
            .unwrap_or_default()
            .refresh_token,
    }
    .map(|token| token.trim().to_string())
    .filter(|token| !token.is_empty())
    .ok_or_else(|| AppError::AuthError("Unauthorized request".to_string()))?;

    let claims = verify_token(&incoming, &state.config.refresh_token_secret)
        .map_err(|_| AppError::AuthError("Invalid refresh token".to_string()))?;

    let user = state
        .users
        .find_user_by_id(claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid refresh token".to_string()))?;

    let revoked = || AppError::AuthError("Refresh token is expired or used".to_string());

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        return Err(revoked());
    }

    let tokens = TokenPair::issue(&state.config, user.id)?;
    if !state
        .users
        .rotate_refresh_token(user.id, &incoming, &tokens.refresh_token)
        .await?
    {
        // Another refresh with the same token won the race.
        return Err(revoked());
    }

    tracing::debug!(user_id = %user.id, "Refresh token rotated");

    Ok((
        AppendHeaders(session_cookies(&state.config, &tokens)),
        ApiResponse::ok("Access token refreshed", tokens),
    ))
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if !verify_password(&payload.old_password, &user.password)? {
        return Err(AppError::AuthError("Invalid old password".to_string()));
    }

    let hashed_password = hash_password(&payload.new_password)?;
    state.users.update_password(user.id, &hashed_password).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::message(
        StatusCode::OK,
        "Password changed successfully",
    ))
}

pub async fn get_current_user(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    ApiResponse::ok("Current user fetched successfully", user)
}

pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = parse_id(&user_id, "User")?;

    let user = state
        .users
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok("User fetched successfully", user))
}

/// Updates username and/or email. Omitted fields keep their current value.
pub async fn update_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<UpdateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = UpdateAccountRequest {
        username: payload
            .username
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty()),
        email: payload
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
    };

    if payload.username.is_none() && payload.email.is_none() {
        return Err(AppError::BadRequest(
            "Username or email is required".to_string(),
        ));
    }
    payload.validate()?;

    let username = payload.username.unwrap_or(user.username);
    let email = payload.email.unwrap_or(user.email);

    let updated = state
        .users
        .update_account(user.id, &username, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok("Account details updated successfully", updated))
}

/// Replaces the avatar. The old asset is removed only after the new URL is
/// saved, and a failure to remove it does not fail the request.
pub async fn update_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut form: FormData,
) -> Result<impl IntoResponse, AppError> {
    let avatar_file = form
        .take_file("avatar")
        .ok_or_else(|| AppError::BadRequest("Avatar file is required".to_string()))?;

    let avatar = upload_file(
        state.media.as_ref(),
        &state.config.upload_staging_dir,
        &avatar_file,
        "Error uploading avatar",
    )
    .await?;

    let updated = match state.users.update_avatar(user.id, &avatar.url).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            discard_media(&state, &avatar.public_id).await;
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Err(e) => {
            discard_media(&state, &avatar.public_id).await;
            return Err(e);
        }
    };

    match public_id_from_url(&user.avatar) {
        Some(old_id) if old_id != avatar.public_id => discard_media(&state, &old_id).await,
        _ => {}
    }

    Ok(ApiResponse::ok("Avatar updated successfully", updated))
}
