//! Bulk import pipeline
//!
//! parse → classify → select rows → aggregate → reconcile organizations →
//! pair and de-duplicate contacts → batch insert → refresh signal.
//!
//! One run is strictly sequential. Callers that may trigger overlapping runs
//! serialize them outside (see `services::locks`).

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ImportError;
use crate::services::aggregator::aggregate;
use crate::services::batch_writer::write_batches;
use crate::services::classifier::classify;
use crate::services::dedup::DedupState;
use crate::services::notifier::RefreshNotifier;
use crate::services::reconciler::reconcile;
use crate::services::row_selector::select_rows;
use crate::services::store::ContactStore;
use crate::services::tabular;
use crate::types::{
    ColumnMapping, ImportPreview, ImportReport, MappingSpec, OrgId, ParsedTable, StagedContact,
};

/// Batch sizes used by the write phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    pub contact_batch_size: usize,
    pub org_batch_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            contact_batch_size: 1000,
            org_batch_size: 500,
        }
    }
}

/// Parse and classify a file without touching storage
pub fn preview(bytes: &[u8], file_name: &str) -> Result<ImportPreview, ImportError> {
    let table = tabular::parse(bytes, file_name)?;
    let suggested = classify(&table.headers);
    info!(
        "Previewed {}: {} headers, {} rows",
        file_name,
        table.headers.len(),
        table.row_count()
    );
    Ok(ImportPreview {
        file_name: file_name.to_string(),
        headers: table.headers.clone(),
        row_count: table.row_count(),
        suggested_mapping: suggested.to_spec(),
    })
}

pub struct BulkImporter {
    store: Arc<dyn ContactStore>,
    notifier: Arc<dyn RefreshNotifier>,
    settings: ImportSettings,
}

impl BulkImporter {
    pub fn new(
        store: Arc<dyn ContactStore>,
        notifier: Arc<dyn RefreshNotifier>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            settings,
        }
    }

    /// Parse `bytes`, build the mapping from `spec` and run the import
    pub async fn run_file(
        &self,
        bytes: &[u8],
        file_name: &str,
        spec: &MappingSpec,
        rows: &str,
    ) -> Result<ImportReport, ImportError> {
        let table = tabular::parse(bytes, file_name)?;
        debug!(
            "Parsed {}: {} headers, {} rows",
            file_name,
            table.headers.len(),
            table.row_count()
        );
        let mapping = ColumnMapping::from_spec(table.column_count(), spec)?;
        self.run(&table, &mapping, rows).await
    }

    /// Import the rows of `table` selected by `rows`.
    ///
    /// Mapping problems and failed storage reads abort the run. Write
    /// failures do not: they are counted in the returned report and whatever
    /// was written before them stays written.
    pub async fn run(
        &self,
        table: &ParsedTable,
        mapping: &ColumnMapping,
        rows: &str,
    ) -> Result<ImportReport, ImportError> {
        mapping.validate()?;
        let store = self.store.as_ref();

        let selection = select_rows(rows, table.row_count());
        let aggregation = aggregate(table, &selection, mapping);
        let mut report = ImportReport {
            rows_selected: selection.len(),
            rows_valid: aggregation.rows_valid,
            ..Default::default()
        };
        info!(
            "Import into {}: {} rows selected, {} valid, {} organizations",
            store.name(),
            report.rows_selected,
            report.rows_valid,
            aggregation.len()
        );
        if aggregation.is_empty() {
            debug!("No rows with an organization name, nothing to import");
            return Ok(report);
        }

        let reconciliation = reconcile(store, &aggregation, self.settings.org_batch_size).await?;
        report.organizations_created = reconciliation.created;
        report.organizations_patched = reconciliation.patched;
        report.organization_failures = reconciliation.failures.clone();

        let org_ids: Vec<OrgId> = aggregation
            .iter()
            .filter_map(|agg| reconciliation.id_of(&agg.name))
            .collect();
        let per_org = store
            .find_contacts_by_org_ids(&org_ids)
            .await
            .map_err(ImportError::store)?;
        let global = store.find_all_contacts().await.map_err(ImportError::store)?;
        debug!(
            "Loaded {} contacts of matched organizations, {} contacts overall",
            per_org.len(),
            global.len()
        );

        let mut dedup = DedupState::new(&org_ids, per_org, global);
        let mut staged: Vec<StagedContact> = Vec::new();
        for agg in aggregation.iter() {
            match reconciliation.id_of(&agg.name) {
                Some(org_id) => {
                    let paired = dedup.pair(org_id, agg);
                    report.contacts_skipped += paired.skipped;
                    staged.extend(paired.staged);
                }
                None => {
                    report.contacts_skipped += agg.emails.len() + agg.phones.len();
                }
            }
        }
        report.contacts_staged = staged.len();
        debug!(
            "Staged {} contacts, skipped {} values",
            report.contacts_staged, report.contacts_skipped
        );

        let written = write_batches(store, &staged, self.settings.contact_batch_size).await;
        report.contacts_imported = written.succeeded;
        report.contacts_failed = written.failed;
        report.first_error = written.first_error.or_else(|| {
            report
                .organization_failures
                .first()
                .map(|f| format!("{}: {}", f.name, f.message))
        });

        if report.wrote_anything() {
            self.notifier.notify();
        }

        if report.is_partial() {
            warn!(
                "Import partially failed: {} contacts imported, {} failed, {} organizations failed",
                report.contacts_imported,
                report.contacts_failed,
                report.organization_failures.len()
            );
        } else {
            info!(
                "Import done: {} organizations created, {} patched, {} contacts imported",
                report.organizations_created, report.organizations_patched, report.contacts_imported
            );
        }
        Ok(report)
    }
}
