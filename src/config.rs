//! Configuration management

use std::time::Duration;

use anyhow::{self, Context, Result};

use crate::services::bulk_import::ImportSettings;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string (not needed for previews and dry runs)
    pub database_url: Option<String>,

    /// Contacts per insert statement
    pub contact_batch_size: usize,

    /// Organizations per create/patch statement
    pub org_batch_size: usize,

    /// Quiet period before a refresh signal is published
    pub refresh_debounce: Duration,

    /// Largest accepted upload, after base64 decoding
    pub max_upload_bytes: usize,

    pub logs_dir: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let nats_url = lookup("NATS_URL").unwrap_or_else(|| "nats://localhost:4222".to_string());
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let contact_batch_size = parse_number(&lookup, "IMPORT_CONTACT_BATCH_SIZE", 1000)?;
        let org_batch_size = parse_number(&lookup, "IMPORT_ORG_BATCH_SIZE", 500)?;
        if contact_batch_size == 0 || org_batch_size == 0 {
            anyhow::bail!("IMPORT_CONTACT_BATCH_SIZE and IMPORT_ORG_BATCH_SIZE must be greater than 0");
        }

        let refresh_debounce =
            Duration::from_millis(parse_number(&lookup, "REFRESH_DEBOUNCE_MS", 400)? as u64);
        let max_upload_bytes = parse_number(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let logs_dir = lookup("LOGS_DIR").unwrap_or_else(|| "./logs".to_string());

        Ok(Self {
            nats_url,
            database_url,
            contact_batch_size,
            org_batch_size,
            refresh_debounce,
            max_upload_bytes,
            logs_dir,
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set")
    }

    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            contact_batch_size: self.contact_batch_size,
            org_batch_size: self.org_batch_size,
        }
    }
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> Result<usize> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a non-negative integer, got {:?}", key, raw)),
        _ => Ok(default),
    }
}
