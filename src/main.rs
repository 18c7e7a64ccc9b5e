//! CRM Import Worker - bulk spreadsheet import for organizations and contacts
//!
//! Serves import previews and runs over NATS, and offers the same pipeline
//! from the command line.

mod cli;
mod config;
mod db;
mod error;
mod handlers;
mod services;
mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, ImportArgs};
use crate::config::Config;
use crate::services::bulk_import::{self, BulkImporter};
use crate::services::classifier::classify;
use crate::services::notifier::NoopNotifier;
use crate::services::store::{ContactStore, MemoryStore};
use crate::services::tabular;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    std::fs::create_dir_all(&config.logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.logs_dir, "import-worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,crm_import_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)) // console
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Migrate => {
            let pool = db::create_pool(config.require_database_url()?).await?;
            db::run_migrations(&pool).await
        }
        Command::Preview { file } => {
            let bytes = read_file(&file)?;
            let preview = bulk_import::preview(&bytes, &file_name(&file))?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
            Ok(())
        }
        Command::Import(args) => import(&config, args).await,
        Command::Normalize { file, out } => {
            let bytes = read_file(&file)?;
            let table = tabular::parse(&bytes, &file_name(&file))?;
            let writer = std::fs::File::create(&out)
                .with_context(|| format!("creating {}", out.display()))?;
            table.write_csv(writer)?;
            info!(
                "Wrote {} rows from {} to {}",
                table.row_count(),
                file.display(),
                out.display()
            );
            Ok(())
        }
    }
}

async fn serve(config: &Config) -> Result<()> {
    info!("Starting CRM import worker...");

    let pool = db::create_pool(config.require_database_url()?).await?;
    info!("Connected to PostgreSQL");
    db::run_migrations(&pool).await?;

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    if let Err(e) = handlers::start_handlers(nats_client, pool, config).await {
        error!("Handler error: {}", e);
        return Err(e);
    }
    Ok(())
}

async fn import(config: &Config, args: ImportArgs) -> Result<()> {
    let bytes = read_file(&args.file)?;
    let name = file_name(&args.file);
    let table = tabular::parse(&bytes, &name)?;

    let mut mapping = classify(&table.headers);
    args.apply(&mut mapping)?;
    info!("Column mapping: {}", serde_json::to_string(&mapping.to_spec())?);

    let store: Arc<dyn ContactStore> = if args.dry_run {
        Arc::new(MemoryStore::new())
    } else {
        let pool = db::create_pool(config.require_database_url()?).await?;
        Arc::new(db::PgContactStore::new(pool))
    };
    let importer = BulkImporter::new(store, Arc::new(NoopNotifier), config.import_settings());

    let report = importer.run(&table, &mapping, &args.rows).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
