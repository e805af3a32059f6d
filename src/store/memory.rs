use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CommentStore, PostStore, UserStore};
use crate::{
    error::AppError,
    models::{
        comment::{Comment, NewComment},
        pagination::Pagination,
        post::{AuthorPostCounts, NewPost, Post, PostChanges, PostWithAuthor},
        user::{AuthorSummary, NewUser, User},
    },
};

/// Process-local store. Each collection keeps insertion order so listings
/// can walk it backwards for newest-first.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    posts: RwLock<Vec<Post>>,
    comments: RwLock<Vec<Comment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves authors for a page of posts. Missing users become `None`.
    async fn with_authors(&self, posts: Vec<Post>) -> Vec<PostWithAuthor> {
        let users = self.users.read().await;
        let authors: HashMap<Uuid, AuthorSummary> = users
            .iter()
            .map(|u| (u.id, AuthorSummary::from(u)))
            .collect();

        posts
            .into_iter()
            .map(|post| {
                let author = authors.get(&post.author).cloned();
                PostWithAuthor::new(post, author)
            })
            .collect()
    }

    async fn page_of<F>(&self, page: Pagination, keep: F) -> (Vec<Post>, i64)
    where
        F: Fn(&Post) -> bool,
    {
        let posts = self.posts.read().await;
        let matching: Vec<&Post> = posts.iter().rev().filter(|p| keep(*p)).collect();
        let total = matching.len() as i64;

        let window = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .cloned()
            .collect();

        (window, total)
    }
}

fn username_or_email_taken(users: &[User], except: Option<Uuid>, username: &str, email: &str) -> bool {
    users
        .iter()
        .filter(|u| Some(u.id) != except)
        .any(|u| u.username == username || u.email == email)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if username_or_email_taken(&users, None, &user.username, &user.email) {
            return Err(AppError::Conflict(
                "User with this username or email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password: user.password,
            avatar: user.avatar,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn update_account(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        if username_or_email_taken(&users, Some(id), username, email) {
            return Err(AppError::Conflict(
                "User with this username or email already exists".to_string(),
            ));
        }

        Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
            user.username = username.to_string();
            user.email = email.to_string();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
            user.avatar = avatar.to_string();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.password = password_hash.to_string();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.refresh_token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) if user.refresh_token.as_deref() == Some(current) => {
                user.refresh_token = Some(next.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create_post(&self, post: NewPost) -> Result<Post, AppError> {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: post.title,
            content: post.content,
            image: post.image,
            is_private: post.is_private,
            author: post.author,
            created_at: now,
            updated_at: now,
        };
        self.posts.write().await.push(post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        Ok(self.posts.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn list_public_posts(
        &self,
        page: Pagination,
    ) -> Result<(Vec<PostWithAuthor>, i64), AppError> {
        let (posts, total) = self.page_of(page, |p| !p.is_private).await;
        Ok((self.with_authors(posts).await, total))
    }

    async fn search_public_posts(
        &self,
        query: &str,
        page: Pagination,
    ) -> Result<(Vec<PostWithAuthor>, i64), AppError> {
        let needle = query.to_lowercase();
        let (posts, total) = self
            .page_of(page, |p| !p.is_private && p.title.to_lowercase().contains(&needle))
            .await;
        Ok((self.with_authors(posts).await, total))
    }

    async fn list_posts_by_author(
        &self,
        author: Uuid,
        page: Pagination,
    ) -> Result<(Vec<PostWithAuthor>, AuthorPostCounts), AppError> {
        let (posts, total, private) = {
            let posts = self.posts.read().await;
            let mine: Vec<&Post> = posts.iter().rev().filter(|p| p.author == author).collect();
            let total = mine.len() as i64;
            let private = mine.iter().filter(|p| p.is_private).count() as i64;

            let window: Vec<Post> = mine
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(page.limit as usize)
                .cloned()
                .collect();
            (window, total, private)
        };

        let counts = AuthorPostCounts {
            total,
            published: total - private,
            private,
        };
        Ok((self.with_authors(posts).await, counts))
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, AppError> {
        let mut posts = self.posts.write().await;
        Ok(posts.iter_mut().find(|p| p.id == id).map(|post| {
            post.title = changes.title;
            post.content = changes.content;
            if let Some(image) = changes.image {
                post.image = Some(image);
            }
            if let Some(is_private) = changes.is_private {
                post.is_private = is_private;
            }
            post.updated_at = Utc::now();
            post.clone()
        }))
    }

    async fn delete_post(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        let mut posts = self.posts.write().await;
        Ok(posts
            .iter()
            .position(|p| p.id == id)
            .map(|index| posts.remove(index)))
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, AppError> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            content: comment.content,
            author: comment.author,
            post_id: comment.post_id,
            created_at: now,
            updated_at: now,
        };
        self.comments.write().await.push(comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError> {
        Ok(self.comments.read().await.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, AppError> {
        Ok(self
            .comments
            .read()
            .await
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>, AppError> {
        let mut comments = self.comments.write().await;
        Ok(comments.iter_mut().find(|c| c.id == id).map(|comment| {
            comment.content = content.to_string();
            comment.updated_at = Utc::now();
            comment.clone()
        }))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError> {
        let mut comments = self.comments.write().await;
        Ok(comments
            .iter()
            .position(|c| c.id == id)
            .map(|index| comments.remove(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password: "hash".into(),
            avatar: "/media/a.png".into(),
        }
    }

    fn new_post(author: Uuid, title: &str, is_private: bool) -> NewPost {
        NewPost {
            title: title.into(),
            content: "body".into(),
            image: None,
            is_private,
            author,
        }
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice", "alice@x.com")).await.unwrap();

        assert!(matches!(
            store.create_user(new_user("alice", "other@x.com")).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            store.create_user(new_user("bob", "alice@x.com")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn rotation_only_succeeds_against_current_token() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("alice", "alice@x.com")).await.unwrap();
        store.set_refresh_token(user.id, Some("first")).await.unwrap();

        assert!(store.rotate_refresh_token(user.id, "first", "second").await.unwrap());
        assert!(!store.rotate_refresh_token(user.id, "first", "third").await.unwrap());

        store.set_refresh_token(user.id, None).await.unwrap();
        assert!(!store.rotate_refresh_token(user.id, "second", "fourth").await.unwrap());
    }

    #[tokio::test]
    async fn public_listing_and_search_skip_private_posts() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("alice", "alice@x.com")).await.unwrap();
        store.create_post(new_post(user.id, "Rust ABC", false)).await.unwrap();
        store.create_post(new_post(user.id, "secret abc", true)).await.unwrap();
        store.create_post(new_post(user.id, "Other", false)).await.unwrap();

        let (posts, total) = store.list_public_posts(Pagination::default()).await.unwrap();
        assert_eq!(total, 2);
        assert!(posts.iter().all(|p| !p.is_private));
        assert_eq!(posts[0].title, "Other");
        assert_eq!(posts[0].author.as_ref().unwrap().username, "alice");

        let (found, total) = store
            .search_public_posts("abc", Pagination::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].title, "Rust ABC");

        let (mine, counts) = store
            .list_posts_by_author(user.id, Pagination { page: 1, limit: 2 })
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(counts, AuthorPostCounts { total: 3, published: 2, private: 1 });
    }
}
