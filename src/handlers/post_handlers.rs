use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    permissions::{self, post_policy, Action},
    repositories::{
        category_repository, comment_repository,
        post_repository::{self, CreatePostData, UpdatePostData},
    },
    serializers::{
        PostCreatedRepr, PostDetailRepr, PostInput, PostListRepr, PostPatch, ValidationErrors,
    },
    utils::{Page, PaginationParams},
    AppState,
};

/// Handler to list posts. Open to anonymous callers; owners appear by
/// username.
pub async fn list_posts_handler(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Response {
    let page_size = state.config.page_size;

    let count = match post_repository::count_posts(&state.db_pool).await {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, "Failed to count posts");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch posts").into_response();
        }
    };

    match post_repository::get_posts_page(&state.db_pool, &pagination, page_size).await {
        Ok(rows) => {
            let results: Vec<PostListRepr> = rows
                .into_iter()
                .map(|row| {
                    let (post, username) = row.into_parts();
                    PostListRepr::new(post, username)
                })
                .collect();
            (StatusCode::OK, Json(Page { count, results })).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch posts");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch posts").into_response()
        }
    }
}

/// Handler to retrieve a single post with its category and comments fully
/// expanded. The raw owner reference is not part of this shape.
pub async fn get_post_handler(State(state): State<AppState>, Path(post_id): Path<Uuid>) -> Response {
    let post = match post_repository::get_post_by_id(&state.db_pool, post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return (StatusCode::NOT_FOUND, "Post not found").into_response(),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to fetch post");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch post").into_response();
        }
    };

    let category = match category_repository::get_category_by_id(&state.db_pool, post.category_id)
        .await
    {
        Ok(Some(category)) => category,
        Ok(None) => {
            error!(post_id = %post_id, category_id = %post.category_id, "Post references missing category");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch post").into_response();
        }
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to fetch category for post");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch post").into_response();
        }
    };

    match comment_repository::get_comments_by_post(&state.db_pool, post_id).await {
        Ok(comments) => (
            StatusCode::OK,
            Json(PostDetailRepr::new(post, category, comments)),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to fetch comments for post");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch post").into_response()
        }
    }
}

/// Handler to create a post from a multipart form with an optional upload.
/// The payload is validated (category existence included) before the owner
/// is injected from the authenticated caller.
pub async fn create_post_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Response {
    if let Err(e) = permissions::check(post_policy(Action::Create), Some(&user.0), None) {
        return e.into_response();
    }

    let mut input = PostInput::default();
    let mut upload_bytes: Option<(axum::body::Bytes, Option<String>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let field_name = match field.name() {
                    Some(name) => name.to_string(),
                    None => continue,
                };

                match field_name.as_str() {
                    "title" => match field.text().await {
                        Ok(text) => input.title = Some(text),
                        Err(e) => {
                            return (
                                StatusCode::BAD_REQUEST,
                                format!("Failed to read title field: {}", e),
                            )
                                .into_response()
                        }
                    },
                    "text" => match field.text().await {
                        Ok(text) => input.text = Some(text),
                        Err(e) => {
                            return (
                                StatusCode::BAD_REQUEST,
                                format!("Failed to read text field: {}", e),
                            )
                                .into_response()
                        }
                    },
                    "category" => match field.text().await {
                        Ok(value) => match Uuid::parse_str(value.trim()) {
                            Ok(id) => input.category = Some(id),
                            Err(_) => {
                                return ValidationErrors::single(
                                    "category",
                                    "Invalid category identifier.",
                                )
                                .into_response()
                            }
                        },
                        Err(e) => {
                            return (
                                StatusCode::BAD_REQUEST,
                                format!("Failed to read category field: {}", e),
                            )
                                .into_response()
                        }
                    },
                    "upload" => {
                        let filename = field.file_name().map(|s| s.to_string());
                        match field.bytes().await {
                            Ok(data) => {
                                if data.len() > state.config.max_upload_bytes {
                                    return (
                                        StatusCode::PAYLOAD_TOO_LARGE,
                                        "Upload exceeds the size limit",
                                    )
                                        .into_response();
                                }
                                if !data.is_empty() {
                                    upload_bytes = Some((data, filename));
                                }
                            }
                            Err(e) => {
                                return (
                                    StatusCode::BAD_REQUEST,
                                    format!("Failed to read upload data: {}", e),
                                )
                                    .into_response()
                            }
                        }
                    }
                    _ => { /* Ignore */ }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Multipart processing error");
                return (
                    StatusCode::BAD_REQUEST,
                    format!("Multipart processing error: {}", e),
                )
                    .into_response();
            }
        }
    }

    let validated = match input.validate() {
        Ok(validated) => validated,
        Err(errors) => return errors.into_response(),
    };

    match category_repository::get_category_by_id(&state.db_pool, validated.category_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ValidationErrors::single("category", "Category does not exist.").into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to check category existence during post creation");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create post").into_response();
        }
    }

    let upload = match upload_bytes {
        Some((data, filename)) => match state.upload_storage.save(data, filename).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!(error = %e, "Failed to store upload during post creation");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save upload").into_response();
            }
        },
        None => None,
    };

    let data = CreatePostData {
        title: validated.title,
        text: validated.text,
        category_id: validated.category_id,
        upload,
    };

    match post_repository::create_post(&state.db_pool, user.0.id, data).await {
        Ok(post) => {
            info!(post_id = %post.id, owner_id = %user.0.id, "Successfully created post");
            (StatusCode::CREATED, Json(PostCreatedRepr::from(post))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to create post in DB");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create post").into_response()
        }
    }
}

/// Handler for full updates. Only the owner or staff may write.
pub async fn update_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<PostInput>,
) -> Response {
    let existing = match post_repository::get_post_by_id(&state.db_pool, post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return (StatusCode::NOT_FOUND, "Post not found").into_response(),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to fetch post for update");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post").into_response();
        }
    };

    if let Err(e) = permissions::check(
        post_policy(Action::Update),
        Some(&user.0),
        Some(existing.owner_id),
    ) {
        warn!(post_id = %post_id, user_id = %user.0.id, "Rejected post update");
        return e.into_response();
    }

    let validated = match payload.validate() {
        Ok(validated) => validated,
        Err(errors) => return errors.into_response(),
    };

    match category_repository::get_category_by_id(&state.db_pool, validated.category_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ValidationErrors::single("category", "Category does not exist.").into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to check category existence during post update");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post").into_response();
        }
    }

    let data = UpdatePostData {
        title: validated.title,
        text: validated.text,
        category_id: validated.category_id,
    };

    match post_repository::update_post(&state.db_pool, post_id, data).await {
        Ok(Some(post)) => {
            info!(post_id = %post.id, "Successfully updated post");
            list_repr_response(&state, post).await
        }
        Ok(None) => (StatusCode::NOT_FOUND, "Post not found").into_response(),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to update post");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post").into_response()
        }
    }
}

/// Handler for partial updates: absent fields keep their value.
pub async fn patch_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<PostPatch>,
) -> Response {
    let existing = match post_repository::get_post_by_id(&state.db_pool, post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return (StatusCode::NOT_FOUND, "Post not found").into_response(),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to fetch post for update");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post").into_response();
        }
    };

    if let Err(e) = permissions::check(
        post_policy(Action::PartialUpdate),
        Some(&user.0),
        Some(existing.owner_id),
    ) {
        warn!(post_id = %post_id, user_id = %user.0.id, "Rejected post update");
        return e.into_response();
    }

    if let Err(errors) = payload.validate() {
        return errors.into_response();
    }

    if let Some(category_id) = payload.category {
        match category_repository::get_category_by_id(&state.db_pool, category_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return ValidationErrors::single("category", "Category does not exist.")
                    .into_response()
            }
            Err(e) => {
                error!(error = %e, "Failed to check category existence during post update");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post")
                    .into_response();
            }
        }
    }

    match post_repository::patch_post(
        &state.db_pool,
        post_id,
        payload.title,
        payload.text,
        payload.category,
    )
    .await
    {
        Ok(Some(post)) => {
            info!(post_id = %post.id, "Successfully updated post");
            list_repr_response(&state, post).await
        }
        Ok(None) => (StatusCode::NOT_FOUND, "Post not found").into_response(),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to update post");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post").into_response()
        }
    }
}

/// Handler to delete a post. Comments go with it through the cascade.
pub async fn delete_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> Response {
    let existing = match post_repository::get_post_by_id(&state.db_pool, post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return (StatusCode::NOT_FOUND, "Post not found").into_response(),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to fetch post for deletion");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete post").into_response();
        }
    };

    if let Err(e) = permissions::check(
        post_policy(Action::Destroy),
        Some(&user.0),
        Some(existing.owner_id),
    ) {
        warn!(post_id = %post_id, user_id = %user.0.id, "Rejected post deletion");
        return e.into_response();
    }

    match post_repository::delete_post(&state.db_pool, post_id).await {
        Ok(rows_affected) if rows_affected == 1 => {
            info!(post_id = %post_id, deleted_by = %user.0.id, "Successfully deleted post");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(_) => (StatusCode::NOT_FOUND, "Post not found").into_response(),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to delete post");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete post").into_response()
        }
    }
}

/// Renders a post in the list shape, which needs the owner's username.
async fn list_repr_response(state: &AppState, post: crate::models::Post) -> Response {
    match crate::repositories::user_repository::get_user_by_id(&state.db_pool, post.owner_id).await
    {
        Ok(Some(owner)) => {
            (StatusCode::OK, Json(PostListRepr::new(post, owner.username))).into_response()
        }
        Ok(None) => {
            error!(post_id = %post.id, "Post owner vanished while rendering response");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render post").into_response()
        }
        Err(e) => {
            error!(error = %e, post_id = %post.id, "Failed to load post owner");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render post").into_response()
        }
    }
}
