//! Bulk import handlers
//!
//! `crm.import.preview` parses an uploaded file and suggests a column mapping.
//! `crm.import.run` imports it with the mapping the user confirmed.

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::StreamExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ImportError;
use crate::services::bulk_import::{self, BulkImporter};
use crate::services::locks::{import_key, IMPORT_LOCKS};
use crate::types::{ErrorResponse, ImportFileRequest, Request, RunImportRequest, SuccessResponse};

/// Decode a base64 upload, rejecting anything larger than `max_bytes`
pub fn decode_upload(content_base64: &str, max_bytes: usize) -> Result<Vec<u8>, String> {
    // base64 expands by 4/3; reject obviously oversized payloads before decoding
    if content_base64.len() / 4 * 3 > max_bytes + 3 {
        return Err(format!("file exceeds the {} byte upload limit", max_bytes));
    }
    let bytes = STANDARD
        .decode(content_base64.trim())
        .map_err(|e| format!("invalid base64 content: {}", e))?;
    if bytes.len() > max_bytes {
        return Err(format!("file exceeds the {} byte upload limit", max_bytes));
    }
    Ok(bytes)
}

fn import_error_response(request_id: Uuid, err: &ImportError) -> ErrorResponse {
    ErrorResponse::new(request_id, err.code(), err.to_string())
}

async fn reply_json<T: serde::Serialize>(client: &Client, reply: async_nats::Subject, body: &T) -> Result<()> {
    client.publish(reply, serde_json::to_vec(body)?.into()).await?;
    Ok(())
}

/// Handle crm.import.preview requests
pub async fn handle_preview(client: Client, mut subscriber: Subscriber, max_upload_bytes: usize) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        let request: Request<ImportFileRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse import preview request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = reply_json(&client, reply, &error).await;
                continue;
            }
        };

        let bytes = match decode_upload(&request.payload.content_base64, max_upload_bytes) {
            Ok(bytes) => bytes,
            Err(message) => {
                warn!("Rejected upload {}: {}", request.payload.file_name, message);
                let error = ErrorResponse::new(request.id, "INVALID_REQUEST", message);
                let _ = reply_json(&client, reply, &error).await;
                continue;
            }
        };

        match bulk_import::preview(&bytes, &request.payload.file_name) {
            Ok(preview) => {
                let _ = reply_json(&client, reply, &SuccessResponse::new(request.id, preview)).await;
            }
            Err(e) => {
                warn!("Preview of {} failed: {}", request.payload.file_name, e);
                let _ = reply_json(&client, reply, &import_error_response(request.id, &e)).await;
            }
        }
    }

    Ok(())
}

/// Handle crm.import.run requests.
///
/// Each request runs in its own task; runs of the same user are serialized.
pub async fn handle_run(
    client: Client,
    mut subscriber: Subscriber,
    importer: Arc<BulkImporter>,
    max_upload_bytes: usize,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        let request: Request<RunImportRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse import run request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = reply_json(&client, reply, &error).await;
                continue;
            }
        };

        let bytes = match decode_upload(&request.payload.content_base64, max_upload_bytes) {
            Ok(bytes) => bytes,
            Err(message) => {
                warn!("Rejected upload {}: {}", request.payload.file_name, message);
                let error = ErrorResponse::new(request.id, "INVALID_REQUEST", message);
                let _ = reply_json(&client, reply, &error).await;
                continue;
            }
        };

        let client = client.clone();
        let importer = importer.clone();
        tokio::spawn(async move {
            let key = import_key(request.user_id);
            debug!("Waiting for import lock {}", key);
            let payload = &request.payload;
            let result = IMPORT_LOCKS
                .with_lock(
                    &key,
                    importer.run_file(&bytes, &payload.file_name, &payload.mapping, &payload.rows),
                )
                .await;

            let sent = match result {
                Ok(report) => {
                    info!(
                        "Import of {} finished: {} contacts imported, {} failed",
                        payload.file_name, report.contacts_imported, report.contacts_failed
                    );
                    reply_json(&client, reply, &SuccessResponse::new(request.id, report)).await
                }
                Err(e) => {
                    warn!("Import of {} failed: {}", payload.file_name, e);
                    reply_json(&client, reply, &import_error_response(request.id, &e)).await
                }
            };
            if let Err(e) = sent {
                error!("Failed to send import reply: {:#}", e);
            }
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MappingError;

    #[test]
    fn test_decode_upload() {
        let encoded = STANDARD.encode("Company,Email\nAcme,a@x.com\n");
        let bytes = decode_upload(&encoded, 1024).unwrap();
        assert!(bytes.starts_with(b"Company"));
    }

    #[test]
    fn test_decode_upload_rejects_bad_base64() {
        let err = decode_upload("not base64!!", 1024).unwrap_err();
        assert!(err.contains("base64"));
    }

    #[test]
    fn test_decode_upload_enforces_limit() {
        let encoded = STANDARD.encode(vec![b'x'; 100]);
        assert!(decode_upload(&encoded, 100).is_ok());
        assert!(decode_upload(&encoded, 99).unwrap_err().contains("limit"));
        let big = STANDARD.encode(vec![b'x'; 10_000]);
        assert!(decode_upload(&big, 100).is_err());
    }

    #[test]
    fn test_import_error_response_carries_code() {
        let id = Uuid::new_v4();
        let response = import_error_response(id, &ImportError::from(MappingError::MissingOrgName));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["error"]["code"], "MAPPING_ERROR");
        assert_eq!(json["error"]["message"], "organization name column must be mapped");
    }
}
