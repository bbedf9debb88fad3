use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::clients::resend::{ResendClient, SendEmailRequest};
use crate::config::EmailConfig;
use crate::constants::email::LOG_PREVIEW_POSTINGS;
use crate::models::posting::Posting;
use crate::services::email::render_alert;

/// One alert for one recipient: the unseen postings of a single saved search.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub recipient_email: String,
    pub recipient_name: String,
    pub user_id: i32,
    pub search_id: i32,
    pub postings: Vec<Posting>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Email provider error: {0}")]
    Provider(String),
}

impl From<anyhow::Error> for DeliveryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Provider(format!("{err:#}"))
    }
}

/// Delivers an alert to its recipient. Returning `Ok` means the provider
/// accepted it; nothing is retried inside a cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, alert: &AlertMessage) -> Result<(), DeliveryError>;

    fn name(&self) -> &'static str;
}

pub struct EmailNotifier {
    client: ResendClient,
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let client = ResendClient::new(
            &config.api_url,
            &config.api_key,
            config.request_timeout_seconds,
        )?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn deliver(&self, alert: &AlertMessage) -> Result<(), DeliveryError> {
        let to = alert.recipient_email.trim();
        if to.is_empty() || !to.contains('@') {
            return Err(DeliveryError::InvalidRecipient(to.to_string()));
        }

        let rendered = render_alert(alert, &self.config);
        let from = self.config.sender();

        let id = self
            .client
            .send(&SendEmailRequest {
                from: &from,
                to: vec![to],
                subject: &rendered.subject,
                html: &rendered.html,
            })
            .await?;

        info!(
            search_id = alert.search_id,
            user_id = alert.user_id,
            message_id = id.as_deref().unwrap_or("unknown"),
            "Sent {} postings to {}",
            alert.postings.len(),
            to
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "resend"
    }
}

/// Writes alerts to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, alert: &AlertMessage) -> Result<(), DeliveryError> {
        info!(
            search_id = alert.search_id,
            user_id = alert.user_id,
            "Alert for {} <{}>: {} new jobs",
            alert.recipient_name,
            alert.recipient_email,
            alert.postings.len()
        );

        for posting in alert.postings.iter().take(LOG_PREVIEW_POSTINGS) {
            info!("  - {} at {}: {}", posting.title, posting.company, posting.url);
        }
        if alert.postings.len() > LOG_PREVIEW_POSTINGS {
            info!(
                "  ... and {} more.",
                alert.postings.len() - LOG_PREVIEW_POSTINGS
            );
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Resend when an API key is configured, otherwise the log notifier.
pub fn build_notifier(config: &EmailConfig) -> Result<Arc<dyn Notifier>> {
    if config.api_key.trim().is_empty() {
        warn!("No Resend API key configured, alerts will only be logged");
        return Ok(Arc::new(LogNotifier));
    }

    Ok(Arc::new(EmailNotifier::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(to: &str) -> AlertMessage {
        AlertMessage {
            recipient_email: to.to_string(),
            recipient_name: "Ada".to_string(),
            user_id: 1,
            search_id: 2,
            postings: (0..8)
                .map(|i| Posting::new(format!("Job {i}"), "Acme", format!("https://j/{i}")))
                .collect(),
        }
    }

    #[test]
    fn test_build_notifier_without_key_logs() {
        let notifier = build_notifier(&EmailConfig::default()).unwrap();
        assert_eq!(notifier.name(), "log");
    }

    #[test]
    fn test_build_notifier_with_key_uses_resend() {
        let config = EmailConfig {
            api_key: "re_test".to_string(),
            ..EmailConfig::default()
        };
        let notifier = build_notifier(&config).unwrap();
        assert_eq!(notifier.name(), "resend");
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.deliver(&alert("ada@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_email_notifier_rejects_bad_recipient() {
        let config = EmailConfig {
            api_key: "re_test".to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
            ..EmailConfig::default()
        };
        let notifier = EmailNotifier::new(&config).unwrap();

        let err = notifier.deliver(&alert("not-an-address")).await.unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidRecipient(_)));
    }

    #[test]
    fn test_anyhow_maps_to_provider_error() {
        let err: DeliveryError = anyhow::anyhow!("status=422").into();
        assert!(err.to_string().contains("status=422"));
    }
}
