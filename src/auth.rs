use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;
use crate::AppState;

/// Signed access tokens expire one day after issuance.
const ACCESS_TOKEN_TTL_DAYS: i64 = 1;

const BEARER_PREFIX: &str = "Bearer ";
const TOKEN_PREFIX: &str = "Token ";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: Uuid,
    exp: i64,
}

#[derive(Debug, Error, Clone)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("No account matches the provided token")]
    UnknownUser,

    #[error("User account is inactive")]
    InactiveUser,

    #[error("Internal server error during authentication")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            // Everything else means the caller's identity is missing or
            // unusable, which is "not authenticated" rather than "forbidden".
            _ => StatusCode::UNAUTHORIZED,
        };
        (status, self.to_string()).into_response()
    }
}

/// Issues a signed access token carrying the user's id.
pub fn issue_access_token(
    user_id: Uuid,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expires_at = Utc::now() + Duration::days(ACCESS_TOKEN_TTL_DAYS);
    make_token(user_id, secret, expires_at.timestamp())
}

fn make_token(
    user_id: Uuid,
    secret: &str,
    exp: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims { id: user_id, exp };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verifies a signed access token and returns the embedded user id.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })?;

    Ok(data.claims.id)
}

/// Extracted for any handler that requires a logged-in caller. Carries the
/// full user row so handlers can check ownership and staff status.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?
            .to_str()
            .map_err(|_| AuthError::MissingCredentials)?;

        let user = if let Some(token) = authorization.strip_prefix(BEARER_PREFIX) {
            let user_id = verify_access_token(token, &app_state.config.secret_key)?;
            lookup_user_by_id(&app_state, user_id).await?
        } else if let Some(token) = authorization.strip_prefix(TOKEN_PREFIX) {
            lookup_user_by_api_token(&app_state, token).await?
        } else {
            return Err(AuthError::MissingCredentials);
        };

        if !user.is_active {
            return Err(AuthError::InactiveUser);
        }

        Ok(AuthenticatedUser(user))
    }
}

async fn lookup_user_by_id(state: &AppState, user_id: Uuid) -> Result<User, AuthError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db_pool)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "Failed to load user during authentication");
            AuthError::Internal
        })?
        .ok_or(AuthError::UnknownUser)
}

async fn lookup_user_by_api_token(state: &AppState, token: &str) -> Result<User, AuthError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT users.*
        FROM users
        JOIN api_tokens ON api_tokens.user_id = users.id
        WHERE api_tokens.token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|err| {
        tracing::error!(error = %err, "Failed to look up API token");
        AuthError::Internal
    })?
    .ok_or(AuthError::InvalidToken)
}
