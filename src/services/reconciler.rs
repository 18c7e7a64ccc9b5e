//! Organization reconciliation
//!
//! Resolves every aggregated organization name to a stored id: existing
//! organizations are matched by exact name and patched with newly found
//! metadata, missing ones are created in chunks.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::ImportError;
use crate::services::aggregator::Aggregation;
use crate::services::store::ContactStore;
use crate::types::{NewOrganization, OrgFailure, OrgId, OrganizationPatch};

/// Outcome of resolving aggregates against storage
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub org_ids: HashMap<String, OrgId>,
    pub created: usize,
    pub patched: usize,
    pub failures: Vec<OrgFailure>,
}

impl Reconciliation {
    pub fn id_of(&self, name: &str) -> Option<OrgId> {
        self.org_ids.get(name).copied()
    }
}

/// Match, create and patch organizations for `aggregation`.
///
/// The name lookup is a blocking read. Create and patch failures are
/// recorded per organization and the remaining chunks still run.
///
/// A non-null aggregate field overwrites whatever the stored organization
/// holds, even when it already had a different value. Null fields never
/// clear stored data.
pub async fn reconcile(
    store: &dyn ContactStore,
    aggregation: &Aggregation,
    chunk_size: usize,
) -> Result<Reconciliation, ImportError> {
    let mut out = Reconciliation::default();
    if aggregation.is_empty() {
        return Ok(out);
    }
    let chunk_size = chunk_size.max(1);

    let names = aggregation.names();
    let existing = store
        .find_organizations_by_name(&names)
        .await
        .map_err(ImportError::store)?;
    for org in existing {
        out.org_ids.insert(org.name, org.id);
    }
    debug!("{} of {} organizations already exist", out.org_ids.len(), names.len());

    let patches: Vec<(String, OrganizationPatch)> = aggregation
        .iter()
        .filter(|agg| agg.meta.has_any())
        .filter_map(|agg| {
            out.id_of(&agg.name).map(|id| {
                (
                    agg.name.clone(),
                    OrganizationPatch {
                        id,
                        meta: agg.meta.clone(),
                    },
                )
            })
        })
        .collect();

    let to_create: Vec<NewOrganization> = aggregation
        .iter()
        .filter(|agg| !out.org_ids.contains_key(&agg.name))
        .map(|agg| NewOrganization {
            name: agg.name.clone(),
            meta: agg.meta.clone(),
        })
        .collect();

    for chunk in to_create.chunks(chunk_size) {
        match store.create_organizations(chunk).await {
            Ok(created) => {
                out.created += created.len();
                for org in created {
                    out.org_ids.insert(org.name, org.id);
                }
            }
            Err(e) => {
                warn!("Failed to create {} organizations: {:#}", chunk.len(), e);
                out.failures.extend(chunk.iter().map(|org| OrgFailure {
                    name: org.name.clone(),
                    message: format!("create failed: {:#}", e),
                }));
            }
        }
    }

    for chunk in patches.chunks(chunk_size) {
        let batch: Vec<OrganizationPatch> = chunk.iter().map(|(_, p)| p.clone()).collect();
        match store.upsert_organizations(&batch).await {
            Ok(()) => out.patched += batch.len(),
            Err(e) => {
                warn!("Failed to update {} organizations: {:#}", batch.len(), e);
                out.failures.extend(chunk.iter().map(|(name, _)| OrgFailure {
                    name: name.clone(),
                    message: format!("update failed: {:#}", e),
                }));
            }
        }
    }

    info!(
        "Organizations reconciled: {} created, {} patched, {} failed",
        out.created,
        out.patched,
        out.failures.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregator::aggregate;
    use crate::services::store::MemoryStore;
    use crate::types::{ColumnMapping, MappingSpec, OrgMeta, ParsedTable};

    fn aggregation(rows: &[&[&str]]) -> Aggregation {
        let table = ParsedTable::from_records(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        let mapping = ColumnMapping::from_spec(
            3,
            &MappingSpec {
                org_name: Some(0),
                city: Some(1),
                emails: vec![2],
                ..Default::default()
            },
        )
        .unwrap();
        let selection: Vec<usize> = (0..table.row_count()).collect();
        aggregate(&table, &selection, &mapping)
    }

    #[tokio::test]
    async fn test_creates_missing_organizations() {
        let store = MemoryStore::new();
        let agg = aggregation(&[&["Company", "City", "Email"], &["Acme", "NYC", ""], &["Globex", "", ""]]);

        let rec = reconcile(&store, &agg, 500).await.unwrap();

        assert_eq!(rec.created, 2);
        assert_eq!(rec.patched, 0);
        assert!(rec.id_of("Acme").is_some());
        assert_eq!(store.organization("Acme").unwrap().city.as_deref(), Some("NYC"));
    }

    #[tokio::test]
    async fn test_existing_organization_is_patched_not_created() {
        let store = MemoryStore::new();
        let id = store.seed_organization(
            "Acme",
            OrgMeta {
                city: Some("Boston".into()),
                country: Some("US".into()),
                ..Default::default()
            },
        );
        let agg = aggregation(&[&["Company", "City", "Email"], &["Acme", "NYC", ""]]);

        let rec = reconcile(&store, &agg, 500).await.unwrap();

        assert_eq!(rec.id_of("Acme"), Some(id));
        assert_eq!(rec.created, 0);
        assert_eq!(rec.patched, 1);
        let org = store.organization("Acme").unwrap();
        // the aggregate's value replaces the stored one; untouched fields stay
        assert_eq!(org.city.as_deref(), Some("NYC"));
        assert_eq!(org.country.as_deref(), Some("US"));
        assert_eq!(store.organizations().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_without_metadata_is_not_patched() {
        let store = MemoryStore::new();
        store.seed_organization("Acme", OrgMeta::default());
        let agg = aggregation(&[&["Company", "City", "Email"], &["Acme", "", ""]]);

        let rec = reconcile(&store, &agg, 500).await.unwrap();
        assert_eq!(rec.patched, 0);
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_block_others() {
        let store = MemoryStore::new();
        store.fail_create_call(1);
        let agg = aggregation(&[
            &["Company", "City", "Email"],
            &["A", "", ""],
            &["B", "", ""],
            &["C", "", ""],
        ]);

        let rec = reconcile(&store, &agg, 2).await.unwrap();

        assert_eq!(store.create_calls(), 2);
        assert_eq!(rec.created, 1);
        assert_eq!(rec.id_of("A"), None);
        assert_eq!(rec.id_of("B"), None);
        assert!(rec.id_of("C").is_some());
        let failed: Vec<&str> = rec.failures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_patch_failure_keeps_id() {
        let store = MemoryStore::new();
        let id = store.seed_organization("Acme", OrgMeta::default());
        store.fail_upsert_call(1);
        let agg = aggregation(&[&["Company", "City", "Email"], &["Acme", "NYC", ""]]);

        let rec = reconcile(&store, &agg, 500).await.unwrap();

        assert_eq!(rec.id_of("Acme"), Some(id));
        assert_eq!(rec.patched, 0);
        assert_eq!(rec.failures.len(), 1);
        assert!(rec.failures[0].message.starts_with("update failed"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_blocking() {
        let store = MemoryStore::new();
        store.fail_reads();
        let agg = aggregation(&[&["Company", "City", "Email"], &["Acme", "", ""]]);

        let err = reconcile(&store, &agg, 500).await.unwrap_err();
        assert!(matches!(err, ImportError::Store(_)));
        assert_eq!(store.create_calls(), 0);
    }
}
