use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::Post;
use crate::utils::PaginationParams;

/// Input data for creating a new post. The owner comes from the
/// authenticated caller, never from the payload.
#[derive(Debug)]
pub struct CreatePostData {
    pub title: String,
    pub text: String,
    pub category_id: Uuid,
    pub upload: Option<String>,
}

/// Input data for a full update.
#[derive(Debug)]
pub struct UpdatePostData {
    pub title: String,
    pub text: String,
    pub category_id: Uuid,
}

/// A post row joined with its owner's username, the shape the list
/// representation needs.
#[derive(Debug, FromRow)]
pub struct PostListRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub text: String,
    pub upload: Option<String>,
    pub created: DateTime<Utc>,
    pub category_id: Uuid,
    pub owner_username: String,
}

impl PostListRow {
    pub fn into_parts(self) -> (Post, String) {
        (
            Post {
                id: self.id,
                owner_id: self.owner_id,
                title: self.title,
                text: self.text,
                upload: self.upload,
                created: self.created,
                category_id: self.category_id,
            },
            self.owner_username,
        )
    }
}

pub async fn create_post(
    pool: &PgPool,
    owner_id: Uuid,
    data: CreatePostData,
) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (owner_id, title, text, upload, category_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(owner_id)
    .bind(data.title)
    .bind(data.text)
    .bind(data.upload)
    .bind(data.category_id)
    .fetch_one(pool)
    .await
}

pub async fn get_post_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_posts_page(
    pool: &PgPool,
    pagination: &PaginationParams,
    page_size: u32,
) -> Result<Vec<PostListRow>, sqlx::Error> {
    sqlx::query_as::<_, PostListRow>(
        r#"
        SELECT posts.*, users.username AS owner_username
        FROM posts
        JOIN users ON users.id = posts.owner_id
        ORDER BY posts.created DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(pagination.limit(page_size))
    .bind(pagination.offset(page_size))
    .fetch_all(pool)
    .await
}

pub async fn count_posts(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await
}

pub async fn update_post(
    pool: &PgPool,
    post_id: Uuid,
    data: UpdatePostData,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET title = $1, text = $2, category_id = $3
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(data.title)
    .bind(data.text)
    .bind(data.category_id)
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

/// Partial update: absent fields keep their current value.
pub async fn patch_post(
    pool: &PgPool,
    post_id: Uuid,
    title: Option<String>,
    text: Option<String>,
    category_id: Option<Uuid>,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts
        SET title = COALESCE($1, title),
            text = COALESCE($2, text),
            category_id = COALESCE($3, category_id)
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(title)
    .bind(text)
    .bind(category_id)
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_post(pool: &PgPool, post_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Posts created in the given window, oldest first. The weekly digest asks
/// for the trailing seven days.
pub async fn get_posts_created_between(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT * FROM posts
        WHERE created >= $1 AND created <= $2
        ORDER BY created ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}
