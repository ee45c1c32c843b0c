use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::distributions::{Alphanumeric, Distribution};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ApiToken, User};

const API_TOKEN_LENGTH: usize = 40;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Users must have a username")]
    MissingUsername,

    #[error("Users must have an email address")]
    MissingEmail,

    #[error("Superusers must have a password")]
    MissingPassword,

    #[error("A user with that username already exists")]
    DuplicateUsername,

    #[error("A user with that email already exists")]
    DuplicateEmail,

    #[error("Failed to hash password")]
    PasswordHash,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Lowercases the domain part of an email address, leaving the local part
/// untouched.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn hash_password(password: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| UserError::PasswordHash)
}

/// Checks a candidate password against the stored hash. Accounts without a
/// password hash are unusable and never verify.
pub fn verify_password(user: &User, password: &str) -> bool {
    let Some(stored) = &user.password_hash else {
        return false;
    };
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Creates an ordinary user. A missing password is allowed and produces an
/// account that cannot log in.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password: Option<&str>,
) -> Result<User, UserError> {
    insert_user(pool, username, email, password, false).await
}

/// Creates a staff user. Unlike ordinary creation, the password is required.
pub async fn create_superuser(
    pool: &PgPool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, UserError> {
    if password.is_empty() {
        return Err(UserError::MissingPassword);
    }
    insert_user(pool, username, email, Some(password), true).await
}

async fn insert_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password: Option<&str>,
    is_staff: bool,
) -> Result<User, UserError> {
    if username.trim().is_empty() {
        return Err(UserError::MissingUsername);
    }
    if email.trim().is_empty() {
        return Err(UserError::MissingEmail);
    }

    let password_hash = match password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, is_staff)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(normalize_email(email))
    .bind(password_hash)
    .bind(is_staff)
    .fetch_one(pool)
    .await
    .map_err(map_unique_violation)?;

    Ok(user)
}

fn map_unique_violation(err: sqlx::Error) -> UserError {
    if let Some(db_err) = err.as_database_error() {
        match db_err.constraint() {
            Some("users_username_key") => return UserError::DuplicateUsername,
            Some("users_email_key") => return UserError::DuplicateEmail,
            _ => {}
        }
    }
    UserError::Database(err)
}

pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// All users, used by the weekly digest fan-out.
pub async fn get_all_users(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC")
        .fetch_all(pool)
        .await
}

/// Mints an opaque API token for the user.
pub async fn create_api_token(pool: &PgPool, user_id: Uuid) -> Result<ApiToken, sqlx::Error> {
    let mut rng = StdRng::from_entropy();
    let token: String = (0..API_TOKEN_LENGTH)
        .map(|_| Alphanumeric.sample(&mut rng) as char)
        .collect();

    sqlx::query_as::<_, ApiToken>(
        r#"
        INSERT INTO api_tokens (token, user_id)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(token)
    .bind(user_id)
    .fetch_one(pool)
    .await
}
