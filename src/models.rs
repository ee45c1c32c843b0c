use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered account. The email is the login identifier; the username is
/// what other users see.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// `None` marks an account that cannot log in with a password.
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// A listing published under a category.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub text: String,
    /// Stored path of the optional upload, relative to the media root.
    pub upload: Option<String>,
    pub created: DateTime<Utc>,
    pub category_id: Uuid,
}

/// A comment on a post. `accepted` starts false and is flipped through the
/// moderation view by whoever owns the thread.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub text: String,
    pub created: DateTime<Utc>,
    pub accepted: bool,
    pub post_id: Uuid,
}

/// An opaque API token, the session-style alternative to signed tokens.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApiToken {
    pub token: String,
    pub user_id: Uuid,
    pub created: DateTime<Utc>,
}
