use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    notifications,
    permissions::{self, comment_policy, Action},
    repositories::{
        comment_repository::{self, CreateCommentData},
        post_repository,
    },
    serializers::{CommentInput, CommentRepr, ValidationErrors},
    utils::{Page, PaginationParams},
    AppState,
};

/// Handler to create a comment. The owner is the authenticated caller and
/// the comment starts unaccepted, which mails the thread owner. A failed
/// notification fails the request; the comment row is already committed.
pub async fn create_comment_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CommentInput>,
) -> Response {
    if let Err(e) = permissions::check(comment_policy(Action::Create), Some(&user.0), None) {
        return e.into_response();
    }

    let validated = match payload.validate() {
        Ok(validated) => validated,
        Err(errors) => return errors.into_response(),
    };

    match post_repository::get_post_by_id(&state.db_pool, validated.post_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ValidationErrors::single("post", "Post does not exist.").into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to check post existence during comment creation");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create comment")
                .into_response();
        }
    }

    let data = CreateCommentData {
        text: validated.text,
        post_id: validated.post_id,
    };

    let comment = match comment_repository::create_comment(&state.db_pool, user.0.id, data).await {
        Ok(comment) => comment,
        Err(e) => {
            error!(error = %e, "Failed to create comment in DB");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create comment")
                .into_response();
        }
    };

    info!(comment_id = %comment.id, post_id = %comment.post_id, "Successfully created comment");

    if let Err(e) = notifications::comment_saved(
        &state.db_pool,
        state.mailer.as_ref(),
        &state.config.default_from_email,
        &comment,
    )
    .await
    {
        error!(error = %e, comment_id = %comment.id, "Failed to send comment notification");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to send comment notification",
        )
            .into_response();
    }

    (StatusCode::CREATED, Json(CommentRepr::from(comment))).into_response()
}

/// Handler to list comments. Requires a login like every comment action.
pub async fn list_comments_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Response {
    if let Err(e) = permissions::check(comment_policy(Action::List), Some(&user.0), None) {
        return e.into_response();
    }

    let count = match comment_repository::count_comments(&state.db_pool).await {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, "Failed to count comments");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch comments")
                .into_response();
        }
    };

    match comment_repository::get_comments_page(&state.db_pool, &pagination, state.config.page_size)
        .await
    {
        Ok(comments) => {
            let results: Vec<CommentRepr> =
                comments.into_iter().map(CommentRepr::from).collect();
            (StatusCode::OK, Json(Page { count, results })).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch comments");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch comments").into_response()
        }
    }
}

pub async fn get_comment_handler(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> Response {
    if let Err(e) = permissions::check(comment_policy(Action::Retrieve), Some(&user.0), None) {
        return e.into_response();
    }

    match comment_repository::get_comment_by_id(&state.db_pool, comment_id).await {
        Ok(Some(comment)) => (StatusCode::OK, Json(CommentRepr::from(comment))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Comment not found").into_response(),
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to fetch comment");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch comment").into_response()
        }
    }
}

/// Handler to update a comment's text or target post. Saving re-fires the
/// notification matching the comment's acceptance state.
pub async fn update_comment_handler(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<CommentInput>,
) -> Response {
    if let Err(e) = permissions::check(comment_policy(Action::Update), Some(&user.0), None) {
        return e.into_response();
    }

    match comment_repository::get_comment_by_id(&state.db_pool, comment_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "Comment not found").into_response(),
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to fetch comment for update");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update comment")
                .into_response();
        }
    }

    let validated = match payload.validate() {
        Ok(validated) => validated,
        Err(errors) => return errors.into_response(),
    };

    match post_repository::get_post_by_id(&state.db_pool, validated.post_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ValidationErrors::single("post", "Post does not exist.").into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to check post existence during comment update");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update comment")
                .into_response();
        }
    }

    let comment = match comment_repository::update_comment(
        &state.db_pool,
        comment_id,
        validated.text,
        validated.post_id,
    )
    .await
    {
        Ok(Some(comment)) => comment,
        Ok(None) => return (StatusCode::NOT_FOUND, "Comment not found").into_response(),
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to update comment");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update comment")
                .into_response();
        }
    };

    info!(comment_id = %comment.id, "Successfully updated comment");

    if let Err(e) = notifications::comment_saved(
        &state.db_pool,
        state.mailer.as_ref(),
        &state.config.default_from_email,
        &comment,
    )
    .await
    {
        error!(error = %e, comment_id = %comment.id, "Failed to send comment notification");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to send comment notification",
        )
            .into_response();
    }

    (StatusCode::OK, Json(CommentRepr::from(comment))).into_response()
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> Response {
    if let Err(e) = permissions::check(comment_policy(Action::Destroy), Some(&user.0), None) {
        return e.into_response();
    }

    match comment_repository::delete_comment(&state.db_pool, comment_id).await {
        Ok(rows_affected) if rows_affected == 1 => {
            info!(comment_id = %comment_id, deleted_by = %user.0.id, "Successfully deleted comment");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(_) => (StatusCode::NOT_FOUND, "Comment not found").into_response(),
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to delete comment");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete comment").into_response()
        }
    }
}
