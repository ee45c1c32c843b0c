//! Outbound mail. Delivery itself is an external service; this module only
//! defines the transport interface and the two shipped providers: an HTTP
//! JSON API client and a no-op for environments without a transport.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    /// Optional HTML alternative, used by the weekly digest.
    pub html_body: Option<String>,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutgoingEmail) -> anyhow::Result<()>;
}

/// Delivers mail through an HTTP JSON API.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    async fn send(&self, message: &OutgoingEmail) -> anyhow::Result<()> {
        let mut request = self.client.post(&self.endpoint).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            anyhow::bail!(
                "mail API returned {} for message to {}",
                response.status(),
                message.to
            );
        }
        Ok(())
    }
}

/// Swallows every message. Used when no mail endpoint is configured.
pub struct NoopMailer;

#[async_trait]
impl MailTransport for NoopMailer {
    async fn send(&self, message: &OutgoingEmail) -> anyhow::Result<()> {
        tracing::debug!(to = %message.to, subject = %message.subject, "Mail transport disabled, dropping message");
        Ok(())
    }
}
