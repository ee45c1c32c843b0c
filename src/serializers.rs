//! The representation layer: per-action wire shapes for each entity, plus
//! field validation for inbound payloads. Handlers pick the shape matching
//! the action they serve; validation failures surface as a per-field error
//! report and nothing is persisted.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, Comment, Post};

pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_TEXT_LENGTH: usize = 5000;

/// Per-field validation report, rendered as `{"field": ["message", ...]}`
/// with a 400 status.
#[derive(Debug, Default, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl IntoResponse for ValidationErrors {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self.0)).into_response()
    }
}

fn required(errors: &mut ValidationErrors, field: &str) {
    errors.add(field, "This field is required.");
}

fn too_long(errors: &mut ValidationErrors, field: &str, max: usize) {
    errors.add(
        field,
        format!("Ensure this field has no more than {} characters.", max),
    );
}

// --- Output representations ---

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryRepr {
    pub id: Uuid,
    pub name: String,
}

impl From<Category> for CategoryRepr {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

/// Full comment shape with raw owner and post identifiers.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentRepr {
    pub id: Uuid,
    pub text: String,
    pub created: DateTime<Utc>,
    pub accepted: bool,
    pub owner: Uuid,
    pub post: Uuid,
}

impl From<Comment> for CommentRepr {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            created: comment.created,
            accepted: comment.accepted,
            owner: comment.owner_id,
            post: comment.post_id,
        }
    }
}

/// List shape for posts: the raw owner reference is replaced by the owner's
/// username.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostListRepr {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub upload: Option<String>,
    pub created: DateTime<Utc>,
    pub category: Uuid,
    pub owner: String,
}

impl PostListRepr {
    pub fn new(post: Post, owner_username: String) -> Self {
        Self {
            id: post.id,
            title: post.title,
            text: post.text,
            upload: post.upload,
            created: post.created,
            category: post.category_id,
            owner: owner_username,
        }
    }
}

/// Creation response shape: every post field except the owner reference.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostCreatedRepr {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub upload: Option<String>,
    pub created: DateTime<Utc>,
    pub category: Uuid,
}

impl From<Post> for PostCreatedRepr {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            text: post.text,
            upload: post.upload,
            created: post.created,
            category: post.category_id,
        }
    }
}

/// Detail shape: category and comments fully expanded, owner omitted.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostDetailRepr {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub upload: Option<String>,
    pub created: DateTime<Utc>,
    pub category: CategoryRepr,
    pub comments: Vec<CommentRepr>,
}

impl PostDetailRepr {
    pub fn new(post: Post, category: Category, comments: Vec<Comment>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            text: post.text,
            upload: post.upload,
            created: post.created,
            category: category.into(),
            comments: comments.into_iter().map(CommentRepr::from).collect(),
        }
    }
}

/// Moderation shape: only the acceptance flag is exposed.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModerationRepr {
    pub accepted: bool,
}

impl From<Comment> for ModerationRepr {
    fn from(comment: Comment) -> Self {
        Self {
            accepted: comment.accepted,
        }
    }
}

// --- Input representations ---

/// Inbound post payload. Used for creation and full updates; the owner is
/// never accepted from the wire.
#[derive(Debug, Default, Deserialize)]
pub struct PostInput {
    pub title: Option<String>,
    pub text: Option<String>,
    pub category: Option<Uuid>,
}

#[derive(Debug)]
pub struct ValidatedPost {
    pub title: String,
    pub text: String,
    pub category_id: Uuid,
}

impl PostInput {
    pub fn validate(self) -> Result<ValidatedPost, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = match self.title {
            Some(title) if !title.trim().is_empty() => {
                if title.chars().count() > MAX_TITLE_LENGTH {
                    too_long(&mut errors, "title", MAX_TITLE_LENGTH);
                }
                Some(title)
            }
            _ => {
                required(&mut errors, "title");
                None
            }
        };

        let text = match self.text {
            Some(text) if !text.trim().is_empty() => {
                if text.chars().count() > MAX_TEXT_LENGTH {
                    too_long(&mut errors, "text", MAX_TEXT_LENGTH);
                }
                Some(text)
            }
            _ => {
                required(&mut errors, "text");
                None
            }
        };

        let category_id = match self.category {
            Some(id) => Some(id),
            None => {
                required(&mut errors, "category");
                None
            }
        };

        errors.into_result()?;

        Ok(ValidatedPost {
            title: title.unwrap(),
            text: text.unwrap(),
            category_id: category_id.unwrap(),
        })
    }
}

/// Partial update payload: absent fields are left untouched, present fields
/// are bound-checked.
#[derive(Debug, Default, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub text: Option<String>,
    pub category: Option<Uuid>,
}

impl PostPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                errors.add("title", "This field may not be blank.");
            } else if title.chars().count() > MAX_TITLE_LENGTH {
                too_long(&mut errors, "title", MAX_TITLE_LENGTH);
            }
        }

        if let Some(text) = &self.text {
            if text.trim().is_empty() {
                errors.add("text", "This field may not be blank.");
            } else if text.chars().count() > MAX_TEXT_LENGTH {
                too_long(&mut errors, "text", MAX_TEXT_LENGTH);
            }
        }

        errors.into_result()
    }
}

/// Inbound comment payload: only the text and the target post are accepted.
#[derive(Debug, Default, Deserialize)]
pub struct CommentInput {
    pub text: Option<String>,
    pub post: Option<Uuid>,
}

#[derive(Debug)]
pub struct ValidatedComment {
    pub text: String,
    pub post_id: Uuid,
}

impl CommentInput {
    pub fn validate(self) -> Result<ValidatedComment, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let text = match self.text {
            Some(text) if !text.trim().is_empty() => {
                if text.chars().count() > MAX_TEXT_LENGTH {
                    too_long(&mut errors, "text", MAX_TEXT_LENGTH);
                }
                Some(text)
            }
            _ => {
                required(&mut errors, "text");
                None
            }
        };

        let post_id = match self.post {
            Some(id) => Some(id),
            None => {
                required(&mut errors, "post");
                None
            }
        };

        errors.into_result()?;

        Ok(ValidatedComment {
            text: text.unwrap(),
            post_id: post_id.unwrap(),
        })
    }
}

/// Moderation payload for the private view.
#[derive(Debug, Deserialize)]
pub struct ModerationInput {
    pub accepted: Option<bool>,
}

impl ModerationInput {
    pub fn validate(self) -> Result<bool, ValidationErrors> {
        self.accepted
            .ok_or_else(|| ValidationErrors::single("accepted", "This field is required."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_input_requires_all_fields() {
        let err = PostInput::default().validate().unwrap_err();
        let report = serde_json::to_value(&err).unwrap();
        assert!(report.get("title").is_some());
        assert!(report.get("text").is_some());
        assert!(report.get("category").is_some());
    }

    #[test]
    fn over_long_text_is_rejected() {
        let input = PostInput {
            title: Some("A lamp".to_string()),
            text: Some("x".repeat(MAX_TEXT_LENGTH + 1)),
            category: Some(Uuid::new_v4()),
        };
        let err = input.validate().unwrap_err();
        let report = serde_json::to_value(&err).unwrap();
        assert!(report.get("text").is_some());
        assert!(report.get("title").is_none());
    }

    #[test]
    fn text_at_the_bound_is_accepted() {
        let input = PostInput {
            title: Some("A lamp".to_string()),
            text: Some("x".repeat(MAX_TEXT_LENGTH)),
            category: Some(Uuid::new_v4()),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn over_long_title_is_rejected() {
        let input = PostInput {
            title: Some("t".repeat(MAX_TITLE_LENGTH + 1)),
            text: Some("fine".to_string()),
            category: Some(Uuid::new_v4()),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn comment_input_requires_text_and_post() {
        let err = CommentInput::default().validate().unwrap_err();
        let report = serde_json::to_value(&err).unwrap();
        assert!(report.get("text").is_some());
        assert!(report.get("post").is_some());
    }

    #[test]
    fn patch_allows_absent_fields() {
        assert!(PostPatch::default().validate().is_ok());
    }

    #[test]
    fn patch_rejects_blank_title() {
        let patch = PostPatch {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }
}
