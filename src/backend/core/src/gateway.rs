//! Notification-gateway client: templated feedback messages and receipts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::auth::TokenCache;
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::model::{TicketId, UpdateId};

/// Receipt proving a feedback request went out for one closure event,
/// independent of whether the customer ever responds.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackReceipt {
    pub destination: String,
    pub customer_id: Option<i64>,
    pub ticket_id: TicketId,
    pub update_id: UpdateId,
    pub assigned_seq: i32,
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Sends the templated feedback-score message.
    async fn send_feedback_template(&self, destination: &str, title_param: &str) -> Result<()>;

    /// Persists the send receipt with the feedback service.
    async fn persist_feedback_receipt(&self, receipt: &FeedbackReceipt) -> Result<()>;
}

/// HTTP implementation against the messaging gateway.
pub struct HttpNotificationGateway {
    client: reqwest::Client,
    config: GatewayConfig,
    tokens: Arc<TokenCache>,
}

impl HttpNotificationGateway {
    pub fn new(config: GatewayConfig, tokens: Arc<TokenCache>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            tokens,
        }
    }
}

#[async_trait]
impl NotificationGateway for HttpNotificationGateway {
    /// A 429 is retried with linear backoff (attempt number times the base
    /// delay) up to the configured ceiling; any other error propagates.
    async fn send_feedback_template(&self, destination: &str, title_param: &str) -> Result<()> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": destination,
            "type": "template",
            "template": {
                "namespace": self.config.template_namespace,
                "name": self.config.template_name,
                "language": { "code": self.config.template_language },
                "components": [
                    {
                        "type": "body",
                        "parameters": [{ "type": "text", "text": title_param }],
                    },
                ],
            },
        });

        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            let response = self
                .client
                .post(&self.config.template_api_url)
                .header("X-Api-Key", &self.config.template_api_key)
                .json(&payload)
                .send()
                .await?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if attempt < attempts {
                    let delay =
                        Duration::from_millis(self.config.retry_base_delay_ms * u64::from(attempt));
                    warn!(%destination, attempt, "rate limited by template endpoint, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Err(Error::RateLimited {
                    service: "feedback template",
                    attempts,
                });
            }

            response.error_for_status()?;
            return Ok(());
        }
    }

    async fn persist_feedback_receipt(&self, receipt: &FeedbackReceipt) -> Result<()> {
        let token = self.tokens.bearer_token().await?;
        let payload = json!({
            "destination": receipt.destination,
            "question": self.config.feedback_question,
            "customer_id": receipt.customer_id,
            "ticket_id": receipt.ticket_id,
            "update_id": receipt.update_id,
            "assigned_no": receipt.assigned_seq,
        });

        let response = self
            .client
            .post(&self.config.receipt_api_url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }

        response.error_for_status()?;
        Ok(())
    }
}
