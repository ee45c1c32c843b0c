use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bulletin_server::{
    config::Config,
    create_router,
    mailer::{HttpMailer, MailTransport, NoopMailer},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database");

    sqlx::migrate!("./migrations").run(&db_pool).await?;
    info!("Database migrations completed");

    let mailer: Arc<dyn MailTransport> = match &config.mail_api_url {
        Some(url) => Arc::new(HttpMailer::new(url.clone(), config.mail_api_key.clone())),
        None => {
            info!("MAIL_API_URL not set, mail delivery disabled");
            Arc::new(NoopMailer)
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let app = create_router(db_pool, config, mailer);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
