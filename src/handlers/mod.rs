//! NATS message handlers

pub mod import;
pub mod ping;
pub mod refresh;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use sqlx::PgPool;
use tokio::select;
use tracing::{error, info};

use crate::config::Config;
use crate::db::PgContactStore;
use crate::services::bulk_import::BulkImporter;
use crate::services::notifier::{DebouncedRefresh, RefreshNotifier};
use crate::services::store::ContactStore;

/// Start all message handlers
pub async fn start_handlers(client: Client, pool: PgPool, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let store: Arc<dyn ContactStore> = Arc::new(PgContactStore::new(pool));
    let notifier: Arc<dyn RefreshNotifier> = Arc::new(DebouncedRefresh::new(
        Arc::new(refresh::NatsRefreshSink::new(client.clone())),
        config.refresh_debounce,
    ));
    let importer = Arc::new(BulkImporter::new(store.clone(), notifier, config.import_settings()));
    info!(
        "Import pipeline ready: store {}, {} contacts / {} organizations per batch",
        store.name(),
        config.contact_batch_size,
        config.org_batch_size
    );

    let ping_sub = client.subscribe("crm.ping").await?;
    let preview_sub = client.subscribe("crm.import.preview").await?;
    let run_sub = client.subscribe("crm.import.run").await?;

    info!("Subscribed to NATS subjects");

    let client_ping = client.clone();
    let ping_handle = tokio::spawn(async move { ping::handle_ping(client_ping, ping_sub).await });

    let client_preview = client.clone();
    let max_upload = config.max_upload_bytes;
    let preview_handle = tokio::spawn(async move {
        import::handle_preview(client_preview, preview_sub, max_upload).await
    });

    let client_run = client.clone();
    let run_handle = tokio::spawn(async move {
        import::handle_run(client_run, run_sub, importer, max_upload).await
    });

    info!("All handlers started, waiting for messages...");

    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = preview_handle => {
            error!("Import preview handler finished: {:?}", result);
        }
        result = run_handle => {
            error!("Import run handler finished: {:?}", result);
        }
    }

    Ok(())
}
