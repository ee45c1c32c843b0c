use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Comment;
use crate::utils::PaginationParams;

/// Input data for creating a comment. The owner comes from the
/// authenticated caller.
#[derive(Debug)]
pub struct CreateCommentData {
    pub text: String,
    pub post_id: Uuid,
}

/// Filters the moderation listing accepts: an exact post and/or a set of
/// category names matched against the owning post's category.
#[derive(Debug, Default)]
pub struct CommentFilter {
    pub post_id: Option<Uuid>,
    pub categories: Option<Vec<String>>,
}

pub async fn create_comment(
    pool: &PgPool,
    owner_id: Uuid,
    data: CreateCommentData,
) -> Result<Comment, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (owner_id, text, post_id)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(owner_id)
    .bind(data.text)
    .bind(data.post_id)
    .fetch_one(pool)
    .await
}

pub async fn get_comment_by_id(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_comments_by_post(
    pool: &PgPool,
    post_id: Uuid,
) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT * FROM comments
        WHERE post_id = $1
        ORDER BY created ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
}

pub async fn get_comments_page(
    pool: &PgPool,
    pagination: &PaginationParams,
    page_size: u32,
) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT * FROM comments
        ORDER BY created ASC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(pagination.limit(page_size))
    .bind(pagination.offset(page_size))
    .fetch_all(pool)
    .await
}

pub async fn count_comments(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await
}

pub async fn update_comment(
    pool: &PgPool,
    comment_id: Uuid,
    text: String,
    post_id: Uuid,
) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        UPDATE comments
        SET text = $1, post_id = $2
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(text)
    .bind(post_id)
    .bind(comment_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_comment(pool: &PgPool, comment_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Comments on posts owned by the given user, filtered and paginated. This
/// is the queryset behind the moderation listing.
pub async fn get_comments_for_post_owner(
    pool: &PgPool,
    owner_id: Uuid,
    filter: &CommentFilter,
    pagination: &PaginationParams,
    page_size: u32,
) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT comments.*
        FROM comments
        JOIN posts ON posts.id = comments.post_id
        JOIN categories ON categories.id = posts.category_id
        WHERE posts.owner_id = $1
          AND ($2::uuid IS NULL OR comments.post_id = $2)
          AND ($3::text[] IS NULL OR categories.name = ANY($3))
        ORDER BY comments.created ASC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(owner_id)
    .bind(filter.post_id)
    .bind(filter.categories.as_deref())
    .bind(pagination.limit(page_size))
    .bind(pagination.offset(page_size))
    .fetch_all(pool)
    .await
}

pub async fn count_comments_for_post_owner(
    pool: &PgPool,
    owner_id: Uuid,
    filter: &CommentFilter,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM comments
        JOIN posts ON posts.id = comments.post_id
        JOIN categories ON categories.id = posts.category_id
        WHERE posts.owner_id = $1
          AND ($2::uuid IS NULL OR comments.post_id = $2)
          AND ($3::text[] IS NULL OR categories.name = ANY($3))
        "#,
    )
    .bind(owner_id)
    .bind(filter.post_id)
    .bind(filter.categories.as_deref())
    .fetch_one(pool)
    .await
}

/// Resolves a single comment within the owner-restricted set. A comment on
/// someone else's thread is indistinguishable from a missing one.
pub async fn get_comment_for_post_owner(
    pool: &PgPool,
    comment_id: Uuid,
    owner_id: Uuid,
) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT comments.*
        FROM comments
        JOIN posts ON posts.id = comments.post_id
        WHERE comments.id = $1 AND posts.owner_id = $2
        "#,
    )
    .bind(comment_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await
}

pub async fn set_accepted(
    pool: &PgPool,
    comment_id: Uuid,
    accepted: bool,
) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        UPDATE comments
        SET accepted = $1
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(accepted)
    .bind(comment_id)
    .fetch_optional(pool)
    .await
}
