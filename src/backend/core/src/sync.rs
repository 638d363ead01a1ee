//! Third-party ticket-to-ticket synchronization.

use async_trait::async_trait;
use serde_json::json;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::{TicketId, UpdateId};

#[async_trait]
pub trait TicketSync: Send + Sync {
    /// Notifies the external system that a ticket was closed. The external
    /// contact identifier may be absent on the local side.
    async fn sync_ticket(
        &self,
        ticket_id: TicketId,
        update_id: UpdateId,
        external_contact_id: Option<&str>,
    ) -> Result<()>;
}

/// HTTP implementation against the T2T sync endpoint.
pub struct HttpTicketSync {
    client: reqwest::Client,
    config: SyncConfig,
}

impl HttpTicketSync {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl TicketSync for HttpTicketSync {
    async fn sync_ticket(
        &self,
        ticket_id: TicketId,
        update_id: UpdateId,
        external_contact_id: Option<&str>,
    ) -> Result<()> {
        let payload = json!({
            "ticket_id": ticket_id,
            "update_id": update_id,
            "contact_id": external_contact_id,
        });

        self.client
            .post(&self.config.endpoint_url)
            .header("X-Api-Key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
