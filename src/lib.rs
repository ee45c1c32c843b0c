use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};

pub mod auth;
pub mod config;
pub mod digest;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod notifications;
pub mod permissions;
pub mod repositories;
pub mod seeder;
pub mod serializers;
pub mod storage;
pub mod utils;

use config::Config;
use handlers::{
    comment_handlers::{
        create_comment_handler, delete_comment_handler, get_comment_handler,
        list_comments_handler, update_comment_handler,
    },
    post_handlers::{
        create_post_handler, delete_post_handler, get_post_handler, list_posts_handler,
        patch_post_handler, update_post_handler,
    },
    private_handlers::{
        delete_private_handler, get_private_handler, list_private_handler, update_private_handler,
    },
};
use mailer::MailTransport;
use storage::LocalUploadStorage;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn MailTransport>,
    pub upload_storage: LocalUploadStorage,
}

/// Wires every resource route once. The three resource groups mirror the
/// public surface: open post reads, login-only comment writes, and the
/// owner's moderation view.
pub fn create_router(
    db_pool: PgPool,
    config: Arc<Config>,
    mailer: Arc<dyn MailTransport>,
) -> Router {
    let upload_storage = LocalUploadStorage::new(&config.upload_dir);
    let uploads_dir = upload_storage.root().join("uploads");
    let max_body_size = config.max_upload_bytes;

    let state = AppState {
        db_pool,
        config,
        mailer,
        upload_storage,
    };

    Router::new()
        .route(
            "/posts",
            get(list_posts_handler).post(create_post_handler),
        )
        .route(
            "/posts/:post_id",
            get(get_post_handler)
                .put(update_post_handler)
                .patch(patch_post_handler)
                .delete(delete_post_handler),
        )
        .route(
            "/comment",
            post(create_comment_handler).get(list_comments_handler),
        )
        .route(
            "/comment/:comment_id",
            get(get_comment_handler)
                .put(update_comment_handler)
                .patch(update_comment_handler)
                .delete(delete_comment_handler),
        )
        .route("/private", get(list_private_handler))
        .route(
            "/private/:comment_id",
            get(get_private_handler)
                .put(update_private_handler)
                .patch(update_private_handler)
                .delete(delete_private_handler),
        )
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_size))
}
