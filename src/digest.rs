//! The weekly digest: one HTML email per user listing every post from the
//! trailing seven days. Invoked by an external scheduler through
//! `bin/digest.rs`, never from request handling.

use askama::Template;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{error, info};

use crate::mailer::{MailTransport, OutgoingEmail};
use crate::models::Post;
use crate::repositories::{post_repository, user_repository};

const DIGEST_WINDOW_DAYS: i64 = 7;

#[derive(Template)]
#[template(path = "weekly_email.html")]
struct WeeklyEmailTemplate<'a> {
    username: &'a str,
    posts: &'a [Post],
}

/// Sends the digest to every user. A failed recipient is logged and skipped
/// so the remaining sends still go out; the job reports an error if any
/// recipient failed.
pub async fn send_weekly_digest(
    pool: &PgPool,
    mailer: &dyn MailTransport,
    from_email: &str,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let posts =
        post_repository::get_posts_created_between(pool, now - Duration::days(DIGEST_WINDOW_DAYS), now)
            .await?;
    let users = user_repository::get_all_users(pool).await?;

    info!(
        post_count = posts.len(),
        user_count = users.len(),
        "Sending weekly digest"
    );

    let mut failed = 0usize;

    for user in &users {
        let html_body = WeeklyEmailTemplate {
            username: &user.username,
            posts: &posts,
        }
        .render()?;

        let message = OutgoingEmail {
            to: user.email.clone(),
            from: from_email.to_string(),
            subject: format!("[Bulletin Board]{} take a look on a new posts", user.username),
            body: format!("{} new posts this week", posts.len()),
            html_body: Some(html_body),
        };

        if let Err(err) = mailer.send(&message).await {
            error!(error = %err, recipient = %user.email, "Failed to send digest email");
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} digest emails failed", failed, users.len());
    }

    Ok(())
}
