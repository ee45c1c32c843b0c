//! One-shot weekly digest job. An external scheduler (cron or similar) runs
//! this binary; it shares nothing with the live server beyond the database.

use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bulletin_server::{
    config::Config,
    digest,
    mailer::{HttpMailer, MailTransport, NoopMailer},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;

    let mailer: Arc<dyn MailTransport> = match &config.mail_api_url {
        Some(url) => Arc::new(HttpMailer::new(url.clone(), config.mail_api_key.clone())),
        None => Arc::new(NoopMailer),
    };

    digest::send_weekly_digest(&pool, mailer.as_ref(), &config.default_from_email).await?;

    info!("Weekly digest sent");
    Ok(())
}
