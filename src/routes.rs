// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{comment, post as posts, user},
    models::response::ApiResponse,
    state::AppState,
    utils::jwt::auth_middleware,
};

const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Assembles the main application router.
///
/// * Everything lives under `/api/v1`; uploaded media is served from the
///   configured base URL.
/// * Routes mixing public reads with authenticated writes rely on the
///   `CurrentUser` extractor; fully private groups get `auth_middleware`.
/// * Applies global middleware (Trace, CORS, body limit).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let public_user_routes = Router::new()
        .route("/user/register", post(user::register))
        .route("/user/login", post(user::login))
        .route("/user/refresh-token", post(user::refresh_access_token))
        .route("/user/{user_id}", get(user::get_user_by_id));

    let private_user_routes = Router::new()
        .route("/user/logout", post(user::logout))
        .route("/user/change-password", post(user::change_password))
        .route("/user/current-user", get(user::get_current_user))
        .route("/user/update-account", patch(user::update_account))
        .route("/user/avatar", patch(user::update_avatar))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let post_routes = Router::new()
        .route("/post", get(posts::list_posts).post(posts::create_post))
        .route("/post/", get(posts::list_posts).post(posts::create_post))
        .route("/post/search", get(posts::search_posts))
        .route("/post/user/{user_id}", get(posts::get_posts_of_user))
        .route(
            "/post/{post_id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        );

    let comment_routes = Router::new()
        .route(
            "/comment/{post_id}",
            get(comment::get_comments_by_post).post(comment::add_comment),
        )
        .merge(
            Router::new()
                .route(
                    "/comment/c/{comment_id}",
                    patch(comment::update_comment).delete(comment::delete_comment),
                )
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let api_routes = Router::new()
        .merge(public_user_routes)
        .merge(private_user_routes)
        .merge(post_routes)
        .merge(comment_routes);

    let mut router = Router::new().nest("/api/v1", api_routes);

    // Only a path prefix can be mounted; an absolute URL points at another host.
    let media_prefix = state.config.media_base_url.trim_end_matches('/');
    if media_prefix.starts_with('/') && media_prefix.len() > 1 {
        router = router.nest_service(media_prefix, ServeDir::new(&state.config.media_dir));
    }

    router
        .fallback(route_not_found)
        // Global Middleware (applied from outside in)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn route_not_found() -> impl IntoResponse {
    ApiResponse::error(StatusCode::NOT_FOUND, "Route not found")
}
