//! Email side effects fired whenever a comment is saved. The comment row is
//! already committed by the time these run; a transport failure propagates
//! and fails the triggering request rather than being swallowed.

use sqlx::PgPool;

use crate::mailer::{MailTransport, OutgoingEmail};
use crate::models::Comment;
use crate::repositories::{post_repository, user_repository};

/// Dispatches the notification matching the comment's acceptance state:
/// a pending comment mails the thread owner, an accepted one mails the
/// comment's own author.
pub async fn comment_saved(
    pool: &PgPool,
    mailer: &dyn MailTransport,
    from_email: &str,
    comment: &Comment,
) -> anyhow::Result<()> {
    if comment.accepted {
        notify_comment_accepted(pool, mailer, from_email, comment).await
    } else {
        notify_new_comment(pool, mailer, from_email, comment).await
    }
}

/// Tells the post owner a new (not yet accepted) comment arrived.
async fn notify_new_comment(
    pool: &PgPool,
    mailer: &dyn MailTransport,
    from_email: &str,
    comment: &Comment,
) -> anyhow::Result<()> {
    let post = post_repository::get_post_by_id(pool, comment.post_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("post {} vanished before notification", comment.post_id))?;

    let post_owner = user_repository::get_user_by_id(pool, post.owner_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("owner of post {} vanished before notification", post.id))?;

    mailer
        .send(&OutgoingEmail {
            to: post_owner.email.clone(),
            from: from_email.to_string(),
            subject: format!("{} you have new comment", post_owner.username),
            body: comment.text.clone(),
            html_body: None,
        })
        .await
}

/// Tells the comment's author their comment was accepted. The message
/// references this specific comment, not whichever comment of theirs
/// happens to match first.
async fn notify_comment_accepted(
    pool: &PgPool,
    mailer: &dyn MailTransport,
    from_email: &str,
    comment: &Comment,
) -> anyhow::Result<()> {
    let comment_owner = user_repository::get_user_by_id(pool, comment.owner_id)
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!("owner of comment {} vanished before notification", comment.id)
        })?;

    let post = post_repository::get_post_by_id(pool, comment.post_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("post {} vanished before notification", comment.post_id))?;

    mailer
        .send(&OutgoingEmail {
            to: comment_owner.email.clone(),
            from: from_email.to_string(),
            subject: format!("{} your comment accepted", comment_owner.username),
            body: format!(
                "Your comment:{} to post: {} was accepted",
                comment.text, post.text
            ),
            html_body: None,
        })
        .await
}
