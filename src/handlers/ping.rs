//! Liveness check

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct PingRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PongResponse {
    message: String,
    service: &'static str,
    version: &'static str,
    timestamp: String,
}

fn pong(payload: &[u8]) -> PongResponse {
    // an empty or malformed body is still a ping
    let request: PingRequest = serde_json::from_slice(payload).unwrap_or_default();
    PongResponse {
        message: match request.message {
            Some(m) => format!("Pong: {}", m),
            None => "Pong".to_string(),
        },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Handle crm.ping requests
pub async fn handle_ping(client: Client, mut subscriber: Subscriber) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let Some(reply) = msg.reply.clone() else {
            continue;
        };
        client
            .publish(reply, serde_json::to_vec(&pong(&msg.payload))?.into())
            .await?;
        debug!("Sent pong");
    }

    Ok(())
}
