// tests/common/mod.rs

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use backend::{
    config::Config,
    media::{LocalMediaStore, MediaStore},
    routes,
    state::AppState,
    store::{MemoryStore, PgStore},
};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

pub const ACCESS_SECRET: &str = "test_access_secret_for_integration_tests";
pub const REFRESH_SECRET: &str = "test_refresh_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub media_dir: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }
}

fn test_config(root: &PathBuf) -> Config {
    Config {
        database_url: None,
        port: 0,
        access_token_secret: ACCESS_SECRET.to_string(),
        access_token_expiry: 600, // 10 minutes for tests
        refresh_token_secret: REFRESH_SECRET.to_string(),
        refresh_token_expiry: 3600,
        cookie_secure: false,
        cors_origins: vec!["http://localhost:3000".to_string()],
        media_dir: root.join("media"),
        media_base_url: "/media".to_string(),
        upload_staging_dir: root.join("temp"),
        rust_log: "error".to_string(),
    }
}

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("blog-backend-test-{}", Uuid::new_v4()))
}

/// Spawns the app on a random port, backed by the in-memory store and a
/// media directory of its own.
pub async fn spawn_app() -> TestApp {
    let root = temp_root();
    let config = test_config(&root);
    let media = Arc::new(LocalMediaStore::new(
        config.media_dir.clone(),
        config.media_base_url.clone(),
    ));
    serve(config, media).await
}

/// Same as `spawn_app`, with a custom media backend.
pub async fn spawn_app_with_media(media: Arc<dyn MediaStore>) -> TestApp {
    let config = test_config(&temp_root());
    serve(config, media).await
}

/// Connects to `DATABASE_URL` and runs the migrations.
/// `None` when the variable is unset, so Postgres tests can be skipped.
pub async fn connect_test_db() -> Option<PgPool> {
    let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty())?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(pool)
}

/// Spawns the app on `PgStore`. `None` without `DATABASE_URL`.
pub async fn spawn_pg_app() -> Option<TestApp> {
    let pool = connect_test_db().await?;
    let config = test_config(&temp_root());
    let media = Arc::new(LocalMediaStore::new(
        config.media_dir.clone(),
        config.media_base_url.clone(),
    ));
    let media_dir = config.media_dir.clone();
    let state = AppState::new(Arc::new(PgStore::new(pool)), media, config);
    Some(serve_state(state, media_dir).await)
}

async fn serve(config: Config, media: Arc<dyn MediaStore>) -> TestApp {
    let media_dir = config.media_dir.clone();
    let state = AppState::new(Arc::new(MemoryStore::new()), media, config);
    serve_state(state, media_dir).await
}

async fn serve_state(state: AppState, media_dir: PathBuf) -> TestApp {
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        media_dir,
    }
}

/// A unique, valid username.
pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

pub fn avatar_part() -> Part {
    Part::bytes(b"\x89PNG\r\n\x1a\nfake-image".to_vec())
        .file_name("avatar.png")
        .mime_str("image/png")
        .unwrap()
}

pub fn register_form(username: &str, email: &str, password: &str) -> Form {
    Form::new()
        .text("username", username.to_string())
        .text("email", email.to_string())
        .text("password", password.to_string())
        .part("avatar", avatar_part())
}

/// A registered user and the tokens from logging in.
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub password: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn register(app: &TestApp, client: &reqwest::Client, username: &str) -> Value {
    let response = client
        .post(app.url("/user/register"))
        .multipart(register_form(
            username,
            &format!("{}@example.com", username),
            "password123",
        ))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

pub async fn login(
    app: &TestApp,
    client: &reqwest::Client,
    username: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(app.url("/user/login"))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to execute request")
}

/// Registers a fresh user and logs in.
pub async fn create_user(app: &TestApp, prefix: &str) -> TestUser {
    let client = reqwest::Client::new();
    let username = unique_name(prefix);
    register(app, &client, &username).await;

    let response = login(app, &client, &username, "password123").await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();

    TestUser {
        id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
        username,
        password: "password123".to_string(),
        access_token: body["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh_token: body["data"]["refreshToken"].as_str().unwrap().to_string(),
    }
}

/// Creates a post through the API and returns its JSON.
pub async fn create_post(app: &TestApp, user: &TestUser, title: &str, private: bool) -> Value {
    let response = reqwest::Client::new()
        .post(app.url("/post"))
        .bearer_auth(&user.access_token)
        .multipart(
            Form::new()
                .text("title", title.to_string())
                .text("content", format!("Content of {}", title))
                .text("private", private.to_string()),
        )
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    body["data"].clone()
}
