//! Shared helper functions for integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use sqlx::PgPool;
use uuid::Uuid;

use bulletin_server::{
    auth, create_router,
    config::Config,
    mailer::{MailTransport, OutgoingEmail},
    models::{Category, Comment, Post, User},
    repositories::{category_repository, comment_repository, post_repository, user_repository},
};

pub const TEST_SECRET: &str = "test-secret";

/// A transport that records every message and can be told to fail, either
/// wholesale or for a single recipient.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail_all: AtomicBool,
    fail_recipient: Mutex<Option<String>>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent_messages(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    pub fn fail_for_recipient(&self, recipient: &str) {
        *self.fail_recipient.lock().unwrap() = Some(recipient.to_string());
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, message: &OutgoingEmail) -> anyhow::Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            anyhow::bail!("mail transport unreachable");
        }
        if self.fail_recipient.lock().unwrap().as_deref() == Some(message.to.as_str()) {
            anyhow::bail!("mail transport rejected recipient {}", message.to);
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn test_config() -> Arc<Config> {
    Arc::new(Config {
        database_url: String::new(),
        http_port: 0,
        secret_key: TEST_SECRET.to_string(),
        default_from_email: "noreply@test.local".to_string(),
        mail_api_url: None,
        mail_api_key: None,
        page_size: 10,
        upload_dir: "./test_media".to_string(),
        max_upload_bytes: 5 * 1024 * 1024,
    })
}

pub fn create_test_app(pool: PgPool, mailer: Arc<dyn MailTransport>) -> Router {
    create_router(pool, test_config(), mailer)
}

pub async fn create_test_user(pool: &PgPool, username: &str, email: &str) -> User {
    user_repository::create_user(pool, username, email, None)
        .await
        .expect("Failed to create test user")
}

pub async fn create_staff_user(pool: &PgPool, username: &str, email: &str) -> User {
    user_repository::create_superuser(pool, username, email, "password")
        .await
        .expect("Failed to create staff user")
}

/// `Authorization` header value carrying a signed access token.
pub fn bearer_auth(user: &User) -> String {
    let token = auth::issue_access_token(user.id, TEST_SECRET).expect("Failed to issue token");
    format!("Bearer {}", token)
}

/// `Authorization` header value carrying an opaque API token.
pub async fn api_token_auth(pool: &PgPool, user: &User) -> String {
    let token = user_repository::create_api_token(pool, user.id)
        .await
        .expect("Failed to create API token");
    format!("Token {}", token.token)
}

pub async fn create_test_category(pool: &PgPool, name: &str) -> Category {
    category_repository::create_category(pool, name)
        .await
        .expect("Failed to create test category")
}

pub async fn create_test_post(
    pool: &PgPool,
    owner: &User,
    category: &Category,
    title: &str,
    text: &str,
) -> Post {
    post_repository::create_post(
        pool,
        owner.id,
        post_repository::CreatePostData {
            title: title.to_string(),
            text: text.to_string(),
            category_id: category.id,
            upload: None,
        },
    )
    .await
    .expect("Failed to create test post")
}

pub async fn create_test_comment(pool: &PgPool, owner: &User, post: &Post, text: &str) -> Comment {
    comment_repository::create_comment(
        pool,
        owner.id,
        comment_repository::CreateCommentData {
            text: text.to_string(),
            post_id: post.id,
        },
    )
    .await
    .expect("Failed to create test comment")
}

// Function to generate a random boundary string
pub fn generate_boundary() -> String {
    format!("----WebKitFormBoundary{}", Uuid::new_v4().simple())
}

/// Builds a multipart body for post creation with the standard fields.
pub fn multipart_post_body(boundary: &str, title: &str, text: &str, category: Uuid) -> Vec<u8> {
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"title\"\r\n\r\n");
    body.extend_from_slice(title.as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"text\"\r\n\r\n");
    body.extend_from_slice(text.as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"category\"\r\n\r\n");
    body.extend_from_slice(category.to_string().as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    body
}
