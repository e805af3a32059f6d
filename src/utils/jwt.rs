// src/utils/jwt.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::user::User,
    state::AppState,
    utils::cookie::{ACCESS_COOKIE_NAME, get_cookie},
};

/// JWT Claims structure, shared by access and refresh tokens.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID.
    pub sub: String,
    /// Issued-at as Unix timestamp.
    pub iat: i64,
    /// Expiration time as Unix timestamp.
    pub exp: i64,
    /// Random per-token id; two tokens issued in the same second still differ.
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }
}

/// Signs a token for `user_id` that expires `ttl_secs` from now.
pub fn sign_token(user_id: Uuid, secret: &str, ttl_secs: i64) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let exp = now
        .checked_add(ttl_secs)
        .ok_or_else(|| AppError::InternalServerError("Token lifetime out of range".to_string()))?;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Fails on a bad signature, a malformed token, or an expired one.
/// Expiry is checked without leeway.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::AuthError("Invalid token".to_string())
    })?;

    Ok(token_data.claims)
}

pub fn issue_access_token(config: &Config, user_id: Uuid) -> Result<String, AppError> {
    sign_token(user_id, &config.access_token_secret, config.access_token_expiry)
}

pub fn issue_refresh_token(config: &Config, user_id: Uuid) -> Result<String, AppError> {
    sign_token(user_id, &config.refresh_token_secret, config.refresh_token_expiry)
}

/// An access/refresh pair handed out at login, registration and refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn issue(config: &Config, user_id: Uuid) -> Result<Self, AppError> {
        Ok(Self {
            access_token: issue_access_token(config, user_id)?,
            refresh_token: issue_refresh_token(config, user_id)?,
        })
    }
}

/// The access token of a request: the `accessToken` cookie, or a
/// `Authorization: Bearer` header when no cookie is present.
fn access_token_from(headers: &HeaderMap) -> Option<&str> {
    get_cookie(headers, ACCESS_COOKIE_NAME).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}

/// Resolves the user behind a request's access token.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = access_token_from(headers)
        .ok_or_else(|| AppError::AuthError("Unauthorized request".to_string()))?;

    let claims = verify_token(token, &state.config.access_token_secret)
        .map_err(|_| AppError::AuthError("Invalid access token".to_string()))?;

    state
        .users
        .find_user_by_id(claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid access token".to_string()))
}

/// The authenticated caller, attached to the request by `auth_middleware`
/// or resolved on demand when used as an extractor.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Axum Middleware: Authentication.
///
/// Validates the access token, loads the user and stores it in the request
/// extensions as `CurrentUser`. Anything else ends the request with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Lets handlers on partially protected routes (e.g. `GET` public, `POST`
/// authenticated) require a session without a route layer.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(current.clone());
        }

        let user = authenticate(state, &parts.headers).await?;
        Ok(CurrentUser(user))
    }
}
