//! The private moderation view: a user sees the comments left on their own
//! posts and flips the acceptance flag. Single-item operations only demand a
//! login, but every lookup happens inside the owner-restricted set, so a
//! comment on someone else's thread resolves to not-found.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    notifications,
    permissions::{self, private_policy, Action},
    repositories::comment_repository::{self, CommentFilter},
    serializers::{CommentRepr, ModerationInput, ModerationRepr},
    utils::{Page, PaginationParams},
    AppState,
};

/// Query parameters for the moderation listing: pagination plus the two
/// supported filters.
#[derive(Debug, Deserialize)]
pub struct PrivateListParams {
    #[serde(default)]
    page: u64,
    post_id: Option<Uuid>,
    /// Comma-separated category names, matched exactly per value.
    category: Option<String>,
}

impl PrivateListParams {
    fn filter(&self) -> CommentFilter {
        let categories = self.category.as_ref().map(|raw| {
            raw.split(',')
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });
        CommentFilter {
            post_id: self.post_id,
            categories: categories.filter(|names| !names.is_empty()),
        }
    }
}

/// Handler to list the comments on the caller's own posts, full comment
/// shape, filterable by post and category names.
pub async fn list_private_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<PrivateListParams>,
) -> Response {
    if let Err(e) = permissions::check(private_policy(Action::List), Some(&user.0), Some(user.0.id))
    {
        return e.into_response();
    }

    let filter = params.filter();
    let pagination = PaginationParams::from_page(params.page);

    let count = match comment_repository::count_comments_for_post_owner(
        &state.db_pool,
        user.0.id,
        &filter,
    )
    .await
    {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, owner_id = %user.0.id, "Failed to count own-thread comments");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch comments")
                .into_response();
        }
    };

    match comment_repository::get_comments_for_post_owner(
        &state.db_pool,
        user.0.id,
        &filter,
        &pagination,
        state.config.page_size,
    )
    .await
    {
        Ok(comments) => {
            let results: Vec<CommentRepr> =
                comments.into_iter().map(CommentRepr::from).collect();
            (StatusCode::OK, Json(Page { count, results })).into_response()
        }
        Err(e) => {
            error!(error = %e, owner_id = %user.0.id, "Failed to fetch own-thread comments");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch comments").into_response()
        }
    }
}

/// Handler to retrieve a single comment in the moderation shape.
pub async fn get_private_handler(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> Response {
    if let Err(e) = permissions::check(private_policy(Action::Retrieve), Some(&user.0), None) {
        return e.into_response();
    }

    match comment_repository::get_comment_for_post_owner(&state.db_pool, comment_id, user.0.id)
        .await
    {
        Ok(Some(comment)) => (StatusCode::OK, Json(ModerationRepr::from(comment))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Comment not found").into_response(),
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to fetch comment for moderation");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch comment").into_response()
        }
    }
}

/// Handler to flip a comment's acceptance flag. Accepting mails the comment
/// author; a still-unaccepted save mails the thread owner again.
pub async fn update_private_handler(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<ModerationInput>,
) -> Response {
    if let Err(e) = permissions::check(private_policy(Action::Update), Some(&user.0), None) {
        return e.into_response();
    }

    match comment_repository::get_comment_for_post_owner(&state.db_pool, comment_id, user.0.id)
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "Comment not found").into_response(),
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to fetch comment for moderation");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update comment")
                .into_response();
        }
    }

    let accepted = match payload.validate() {
        Ok(accepted) => accepted,
        Err(errors) => return errors.into_response(),
    };

    let comment = match comment_repository::set_accepted(&state.db_pool, comment_id, accepted).await
    {
        Ok(Some(comment)) => comment,
        Ok(None) => return (StatusCode::NOT_FOUND, "Comment not found").into_response(),
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to update acceptance flag");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update comment")
                .into_response();
        }
    };

    info!(comment_id = %comment.id, accepted = comment.accepted, "Moderated comment");

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

    (StatusCode::OK, Json(ModerationRepr::from(comment))).into_response()
}

/// Handler to delete a comment from the moderation view.
pub async fn delete_private_handler(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> Response {
    if let Err(e) = permissions::check(private_policy(Action::Destroy), Some(&user.0), None) {
        return e.into_response();
    }

    let comment = match comment_repository::get_comment_for_post_owner(
        &state.db_pool,
        comment_id,
        user.0.id,
    )
    .await
    {
        Ok(Some(comment)) => comment,
        Ok(None) => return (StatusCode::NOT_FOUND, "Comment not found").into_response(),
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to fetch comment for moderation");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete comment")
                .into_response();
        }
    };

    match comment_repository::delete_comment(&state.db_pool, comment.id).await {
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
