//! Refresh sink publishing on NATS

use async_nats::Client;
use async_trait::async_trait;

use crate::services::notifier::RefreshSink;
use crate::types::EmptyPayload;

pub const REFRESH_SUBJECT: &str = "crm.orgs.refresh";

/// Publishes `{}` on `crm.orgs.refresh` so list views re-fetch
pub struct NatsRefreshSink {
    client: Client,
}

impl NatsRefreshSink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RefreshSink for NatsRefreshSink {
    async fn refresh(&self) -> anyhow::Result<()> {
        let body = serde_json::to_vec(&EmptyPayload {})?;
        self.client.publish(REFRESH_SUBJECT, body.into()).await?;
        Ok(())
    }
}
