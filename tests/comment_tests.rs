// tests/comment_tests.rs

mod common;

use common::*;
use serde_json::{Value, json};
use uuid::Uuid;

async fn add_comment(app: &TestApp, user: &TestUser, post_id: &str, content: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(app.url(&format!("/comment/{}", post_id)))
        .bearer_auth(&user.access_token)
        .json(&json!({ "content": content }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn comments_are_listed_oldest_first() {
    let app = spawn_app().await;
    let user = create_user(&app, "commenter").await;
    let post = create_post(&app, &user, "Discuss", false).await;
    let post_id = post["id"].as_str().unwrap();

    let response = add_comment(&app, &user, post_id, "  first  ").await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Comment added successfully");
    assert_eq!(body["data"]["content"], "first");
    assert_eq!(body["data"]["author"], user.id);
    assert_eq!(body["data"]["postId"], post_id);

    add_comment(&app, &user, post_id, "second").await;

    let response = reqwest::Client::new()
        .get(app.url(&format!("/comment/{}", post_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Comments fetched successfully");
    let contents: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["first", "second"]);
}

#[tokio::test]
async fn comment_on_unknown_post_is_accepted() {
    let app = spawn_app().await;
    let user = create_user(&app, "ghost").await;

    let response = add_comment(&app, &user, &Uuid::new_v4().to_string(), "hello?").await;
    assert_eq!(response.status().as_u16(), 201);

    let response = add_comment(&app, &user, "not-an-id", "hello?").await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn comment_requires_login_and_content() {
    let app = spawn_app().await;
    let user = create_user(&app, "empty").await;
    let post_id = Uuid::new_v4().to_string();

    let response = reqwest::Client::new()
        .post(app.url(&format!("/comment/{}", post_id)))
        .json(&json!({ "content": "anonymous" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    for content in ["", "    ", "<script>x</script>"] {
        let response = add_comment(&app, &user, &post_id, content).await;
        assert_eq!(response.status().as_u16(), 400, "content {:?}", content);
    }

    let response = reqwest::Client::new()
        .post(app.url(&format!("/comment/{}", post_id)))
        .bearer_auth(&user.access_token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn only_the_author_can_edit_or_delete_a_comment() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let alice = create_user(&app, "calice").await;
    let bob = create_user(&app, "cbob").await;
    let post_id = Uuid::new_v4().to_string();

    let response = add_comment(&app, &alice, &post_id, "original").await;
    let body: Value = response.json().await.unwrap();
    let url = app.url(&format!("/comment/c/{}", body["data"]["id"].as_str().unwrap()));

    let response = client
        .patch(&url)
        .bearer_auth(&bob.access_token)
        .json(&json!({ "content": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .delete(&url)
        .bearer_auth(&bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client.patch(&url).json(&json!({ "content": "x" })).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .patch(&url)
        .bearer_auth(&alice.access_token)
        .json(&json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Comment updated successfully");
    assert_eq!(body["data"]["content"], "edited");

    let response = client
        .delete(&url)
        .bearer_auth(&alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .delete(&url)
        .bearer_auth(&alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Comment not found");
}
