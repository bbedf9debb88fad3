use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
pub struct SendEmailRequest<'a> {
    pub from: &'a str,
    pub to: Vec<&'a str>,
    pub subject: &'a str,
    pub html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

/// Minimal client for the Resend transactional email API.
#[derive(Clone)]
pub struct ResendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ResendClient {
    pub fn new(base_url: &str, api_key: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(1)))
            .user_agent(concat!("JobSeek/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Sends one email. Any 2xx counts as delivered; the provider's message
    /// id is returned when the body carries one.
    pub async fn send(&self, request: &SendEmailRequest<'_>) -> Result<Option<String>> {
        let url = format!("{}/emails", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to reach Resend")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Resend rejected email: status={status}, body={body}");
        }

        let body = response.text().await.unwrap_or_default();
        let id = message_id(&body);
        match &id {
            Some(id) => debug!("Resend accepted email {}", id),
            None => warn!(%status, "Resend accepted email but returned no message id: {body}"),
        }
        Ok(id)
    }
}

fn message_id(body: &str) -> Option<String> {
    serde_json::from_str::<SendEmailResponse>(body)
        .ok()
        .map(|sent| sent.id)
}
