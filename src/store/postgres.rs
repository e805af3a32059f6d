use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
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

const USER_COLUMNS: &str =
    "id, username, email, password, avatar, refresh_token, created_at, updated_at";

const POST_COLUMNS: &str = "id, title, content, image, is_private, author, created_at, updated_at";

const COMMENT_COLUMNS: &str = "id, content, author, post_id, created_at, updated_at";

/// Post joined with its author's public fields.
const POST_WITH_AUTHOR_SELECT: &str = r#"
    SELECT
        p.id, p.title, p.content, p.image, p.is_private, p.author,
        p.created_at, p.updated_at,
        u.username AS author_username,
        u.avatar AS author_avatar
    FROM posts p
    LEFT JOIN users u ON u.id = p.author
"#;

#[derive(FromRow)]
struct PostRow {
    #[sqlx(flatten)]
    post: Post,
    author_username: Option<String>,
    author_avatar: Option<String>,
}

impl From<PostRow> for PostWithAuthor {
    fn from(row: PostRow) -> Self {
        let author = row.author_username.map(|username| AuthorSummary {
            id: row.post.author,
            username,
            avatar: row.author_avatar.unwrap_or_default(),
        });
        PostWithAuthor::new(row.post, author)
    }
}

/// Postgres-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_posts_with_authors(
        &self,
        filter: &str,
        binds: PostFilter<'_>,
        page: Pagination,
    ) -> Result<Vec<PostWithAuthor>, AppError> {
        let sql = format!(
            "{} WHERE {} ORDER BY p.created_at DESC, p.id DESC LIMIT $1 OFFSET $2",
            POST_WITH_AUTHOR_SELECT, filter
        );

        let query = sqlx::query_as::<_, PostRow>(&sql)
            .bind(page.limit)
            .bind(page.offset());

        let rows = match binds {
            PostFilter::Public => query.fetch_all(&self.pool).await?,
            PostFilter::Title(q) => query.bind(q).fetch_all(&self.pool).await?,
            PostFilter::Author(id) => query.bind(id).fetch_all(&self.pool).await?,
        };

        Ok(rows.into_iter().map(PostWithAuthor::from).collect())
    }
}

/// Extra bind (always `$3`) for the listing queries.
enum PostFilter<'a> {
    Public,
    Title(&'a str),
    Author(Uuid),
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (username, email, password, avatar) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );

        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.avatar)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $2 LIMIT 1",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_account(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET username = $2, email = $3, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(avatar)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $3 WHERE id = $1 AND refresh_token = $2",
        )
        .bind(id)
        .bind(current)
        .bind(next)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn create_post(&self, post: NewPost) -> Result<Post, AppError> {
        let sql = format!(
            "INSERT INTO posts (title, content, image, is_private, author) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            POST_COLUMNS
        );

        let created = sqlx::query_as::<_, Post>(&sql)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.image)
            .bind(post.is_private)
            .bind(post.author)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create post: {:?}", e);
                AppError::from(e)
            })?;

        Ok(created)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_public_posts(
        &self,
        page: Pagination,
    ) -> Result<(Vec<PostWithAuthor>, i64), AppError> {
        let posts = self
            .fetch_posts_with_authors("p.is_private = FALSE", PostFilter::Public, page)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE is_private = FALSE")
            .fetch_one(&self.pool)
            .await?;

        Ok((posts, total))
    }

    async fn search_public_posts(
        &self,
        query: &str,
        page: Pagination,
    ) -> Result<(Vec<PostWithAuthor>, i64), AppError> {
        // STRPOS avoids LIKE wildcards in user input; an empty needle matches everything.
        let posts = self
            .fetch_posts_with_authors(
                "p.is_private = FALSE AND STRPOS(LOWER(p.title), LOWER($3)) > 0",
                PostFilter::Title(query),
                page,
            )
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE is_private = FALSE AND STRPOS(LOWER(title), LOWER($1)) > 0",
        )
        .bind(query)
        .fetch_one(&self.pool)
        .await?;

        Ok((posts, total))
    }

    async fn list_posts_by_author(
        &self,
        author: Uuid,
        page: Pagination,
    ) -> Result<(Vec<PostWithAuthor>, AuthorPostCounts), AppError> {
        let posts = self
            .fetch_posts_with_authors("p.author = $3", PostFilter::Author(author), page)
            .await?;

        let (total, private): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_private) FROM posts WHERE author = $1",
        )
        .bind(author)
        .fetch_one(&self.pool)
        .await?;

        Ok((
            posts,
            AuthorPostCounts {
                total,
                published: total - private,
                private,
            },
        ))
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, AppError> {
        let sql = format!(
            r#"
            UPDATE posts
            SET title = $2,
                content = $3,
                image = COALESCE($4, image),
                is_private = COALESCE($5, is_private),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        );

        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.content)
            .bind(&changes.image)
            .bind(changes.is_private)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_post(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        let sql = format!("DELETE FROM posts WHERE id = $1 RETURNING {}", POST_COLUMNS);
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, AppError> {
        let sql = format!(
            "INSERT INTO comments (content, author, post_id) VALUES ($1, $2, $3) RETURNING {}",
            COMMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(&comment.content)
            .bind(comment.author)
            .bind(comment.post_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError> {
        let sql = format!("SELECT {} FROM comments WHERE id = $1", COMMENT_COLUMNS);
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, AppError> {
        let sql = format!(
            "SELECT {} FROM comments WHERE post_id = $1 ORDER BY created_at ASC, id ASC",
            COMMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_comment(&self, id: Uuid, content: &str) -> Result<Option<Comment>, AppError> {
        let sql = format!(
            "UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            COMMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(content)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError> {
        let sql = format!("DELETE FROM comments WHERE id = $1 RETURNING {}", COMMENT_COLUMNS);
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }
}
