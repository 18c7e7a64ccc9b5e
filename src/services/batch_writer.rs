//! Contact batch writer

use tracing::{debug, error};

use crate::services::store::ContactStore;
use crate::types::{StagedContact, WriteReport};

/// Insert `staged` in batches of `batch_size`.
///
/// Stops at the first failing batch. Batches written before it stay
/// committed; the failing batch and everything after it count as failed.
pub async fn write_batches(
    store: &dyn ContactStore,
    staged: &[StagedContact],
    batch_size: usize,
) -> WriteReport {
    let mut report = WriteReport::default();
    let batch_size = batch_size.max(1);
    let total_batches = staged.len().div_ceil(batch_size);

    for (index, batch) in staged.chunks(batch_size).enumerate() {
        match store.insert_contacts(batch).await {
            Ok(()) => {
                report.succeeded += batch.len();
                debug!(
                    "Inserted contact batch {}/{} ({} contacts)",
                    index + 1,
                    total_batches,
                    batch.len()
                );
            }
            Err(e) => {
                error!(
                    "Contact batch {}/{} failed, {} remaining contacts not written: {:#}",
                    index + 1,
                    total_batches,
                    staged.len() - report.succeeded,
                    e
                );
                report.first_error = Some(format!("{:#}", e));
                break;
            }
        }
    }

    report.failed = staged.len() - report.succeeded;
    report
}
