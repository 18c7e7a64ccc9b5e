//! Storage abstraction consumed by the import pipeline.
//!
//! `ContactStore` is the seam between the import core and persistence:
//! `PgContactStore` (in `db`) in production, `MemoryStore` for dry runs and
//! tests.
//!
//! The trait is object-safe so callers can hold `Arc<dyn ContactStore>`.

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::{
    ContactKey, NewOrganization, OrgContactKey, OrgId, OrgRef, Organization, OrganizationPatch,
    StagedContact,
};

// =============================================================================
// Core trait
// =============================================================================

/// Batched organization/contact persistence.
///
/// Every write call is atomic: it applies completely or not at all.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Organizations whose name exactly matches one of `names`
    async fn find_organizations_by_name(&self, names: &[String]) -> Result<Vec<OrgRef>>;

    /// Insert organizations, returning their assigned ids
    async fn create_organizations(&self, records: &[NewOrganization]) -> Result<Vec<OrgRef>>;

    /// Patch existing organizations; `None` fields keep their stored value
    async fn upsert_organizations(&self, patches: &[OrganizationPatch]) -> Result<()>;

    /// Email/phone of every contact belonging to one of `org_ids`
    async fn find_contacts_by_org_ids(&self, org_ids: &[OrgId]) -> Result<Vec<OrgContactKey>>;

    /// Email/phone of every contact in the store
    async fn find_all_contacts(&self) -> Result<Vec<ContactKey>>;

    /// Insert one batch of contacts
    async fn insert_contacts(&self, batch: &[StagedContact]) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

// =============================================================================
// MemoryStore: in-process store (dry runs, tests)
// =============================================================================

/// Which calls should fail, counted from 1 per operation
#[derive(Debug, Default, Clone)]
struct FailurePlan {
    create_calls: HashSet<usize>,
    upsert_calls: HashSet<usize>,
    insert_calls: HashSet<usize>,
    reads: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    organizations: Vec<Organization>,
    contacts: Vec<StagedContact>,
    next_org_id: OrgId,
    create_calls: usize,
    upsert_calls: usize,
    insert_batches: Vec<usize>,
    failures: FailurePlan,
}

/// In-memory store with the same uniqueness rules as the database: contact
/// emails are unique case-insensitively, phones exactly.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_reads(state: &MemoryState) -> Result<()> {
        if state.failures.reads {
            return Err(anyhow!("simulated read failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Seed an organization directly, bypassing call accounting
    pub fn seed_organization(&self, name: &str, meta: crate::types::OrgMeta) -> OrgId {
        let mut state = self.state.lock();
        state.next_org_id += 1;
        let id = state.next_org_id;
        state.organizations.push(Organization {
            id,
            name: name.to_string(),
            website: meta.website,
            sector: meta.sector,
            city: meta.city,
            country: meta.country,
        });
        id
    }

    /// Seed a contact directly, bypassing uniqueness checks
    pub fn seed_contact(&self, org_id: OrgId, email: Option<&str>, phone: Option<&str>) {
        self.state.lock().contacts.push(StagedContact {
            org_id,
            person_name: None,
            designation: None,
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
        });
    }

    pub fn fail_create_call(&self, call: usize) {
        self.state.lock().failures.create_calls.insert(call);
    }

    pub fn fail_upsert_call(&self, call: usize) {
        self.state.lock().failures.upsert_calls.insert(call);
    }

    pub fn fail_insert_call(&self, call: usize) {
        self.state.lock().failures.insert_calls.insert(call);
    }

    pub fn fail_reads(&self) {
        self.state.lock().failures.reads = true;
    }

    pub fn organizations(&self) -> Vec<Organization> {
        self.state.lock().organizations.clone()
    }

    pub fn organization(&self, name: &str) -> Option<Organization> {
        self.state
            .lock()
            .organizations
            .iter()
            .find(|o| o.name == name)
            .cloned()
    }

    pub fn contacts(&self) -> Vec<StagedContact> {
        self.state.lock().contacts.clone()
    }

    /// Size of every attempted insert batch, failed ones included
    pub fn insert_batches(&self) -> Vec<usize> {
        self.state.lock().insert_batches.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().create_calls
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn find_organizations_by_name(&self, names: &[String]) -> Result<Vec<OrgRef>> {
        let state = self.state.lock();
        Self::check_reads(&state)?;
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        Ok(state
            .organizations
            .iter()
            .filter(|o| wanted.contains(o.name.as_str()))
            .map(|o| OrgRef {
                id: o.id,
                name: o.name.clone(),
            })
            .collect())
    }

    async fn create_organizations(&self, records: &[NewOrganization]) -> Result<Vec<OrgRef>> {
        let mut state = self.state.lock();
        state.create_calls += 1;
        if state.failures.create_calls.contains(&state.create_calls) {
            return Err(anyhow!("simulated organization insert failure"));
        }
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            state.next_org_id += 1;
            let id = state.next_org_id;
            state.organizations.push(Organization {
                id,
                name: record.name.clone(),
                website: record.meta.website.clone(),
                sector: record.meta.sector.clone(),
                city: record.meta.city.clone(),
                country: record.meta.country.clone(),
            });
            created.push(OrgRef {
                id,
                name: record.name.clone(),
            });
        }
        Ok(created)
    }

    async fn upsert_organizations(&self, patches: &[OrganizationPatch]) -> Result<()> {
        let mut state = self.state.lock();
        state.upsert_calls += 1;
        if state.failures.upsert_calls.contains(&state.upsert_calls) {
            return Err(anyhow!("simulated organization update failure"));
        }
        for patch in patches {
            let Some(org) = state.organizations.iter_mut().find(|o| o.id == patch.id) else {
                continue;
            };
            let meta = patch.meta.clone();
            org.website = meta.website.or(org.website.take());
            org.sector = meta.sector.or(org.sector.take());
            org.city = meta.city.or(org.city.take());
            org.country = meta.country.or(org.country.take());
        }
        Ok(())
    }

    async fn find_contacts_by_org_ids(&self, org_ids: &[OrgId]) -> Result<Vec<OrgContactKey>> {
        let state = self.state.lock();
        Self::check_reads(&state)?;
        let wanted: HashSet<OrgId> = org_ids.iter().copied().collect();
        Ok(state
            .contacts
            .iter()
            .filter(|c| wanted.contains(&c.org_id))
            .map(|c| OrgContactKey {
                org_id: c.org_id,
                email: c.email.clone(),
                phone: c.phone.clone(),
            })
            .collect())
    }

    async fn find_all_contacts(&self) -> Result<Vec<ContactKey>> {
        let state = self.state.lock();
        Self::check_reads(&state)?;
        Ok(state
            .contacts
            .iter()
            .map(|c| ContactKey {
                email: c.email.clone(),
                phone: c.phone.clone(),
            })
            .collect())
    }

    async fn insert_contacts(&self, batch: &[StagedContact]) -> Result<()> {
        let mut state = self.state.lock();
        state.insert_batches.push(batch.len());
        let call = state.insert_batches.len();
        if state.failures.insert_calls.contains(&call) {
            return Err(anyhow!("simulated contact insert failure"));
        }

        let mut emails: HashSet<String> = state
            .contacts
            .iter()
            .filter_map(|c| c.email.as_ref().map(|e| e.to_lowercase()))
            .collect();
        let mut phones: HashSet<String> =
            state.contacts.iter().filter_map(|c| c.phone.clone()).collect();
        for contact in batch {
            if let Some(email) = &contact.email {
                if !emails.insert(email.to_lowercase()) {
                    return Err(anyhow!("duplicate key value violates unique constraint on email: {email}"));
                }
            }
            if let Some(phone) = &contact.phone {
                if !phones.insert(phone.clone()) {
                    return Err(anyhow!("duplicate key value violates unique constraint on phone: {phone}"));
                }
            }
        }

        state.contacts.extend(batch.iter().cloned());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrgMeta;

    fn contact(org_id: OrgId, email: Option<&str>, phone: Option<&str>) -> StagedContact {
        StagedContact {
            org_id,
            person_name: None,
            designation: None,
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_by_name() {
        let store = MemoryStore::new();
        let created = store
            .create_organizations(&[NewOrganization {
                name: "Acme".into(),
                meta: OrgMeta::default(),
            }])
            .await
            .unwrap();

        let found = store
            .find_organizations_by_name(&["Acme".into(), "acme".into()])
            .await
            .unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_upsert_keeps_fields_not_supplied() {
        let store = MemoryStore::new();
        let id = store.seed_organization(
            "Acme",
            OrgMeta {
                city: Some("NYC".into()),
                sector: Some("Retail".into()),
                ..Default::default()
            },
        );

        store
            .upsert_organizations(&[OrganizationPatch {
                id,
                meta: OrgMeta {
                    city: Some("Boston".into()),
                    ..Default::default()
                },
            }])
            .await
            .unwrap();

        let org = store.organization("Acme").unwrap();
        assert_eq!(org.city.as_deref(), Some("Boston"));
        assert_eq!(org.sector.as_deref(), Some("Retail"));
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates_atomically() {
        let store = MemoryStore::new();
        store.seed_contact(1, Some("A@x.com"), None);

        let err = store
            .insert_contacts(&[contact(1, Some("new@x.com"), None), contact(1, Some("a@X.com"), None)])
            .await;

        assert!(err.is_err());
        assert_eq!(store.contacts().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_count_per_call() {
        let store = MemoryStore::new();
        store.fail_insert_call(2);

        assert!(store.insert_contacts(&[contact(1, Some("a@x.com"), None)]).await.is_ok());
        assert!(store.insert_contacts(&[contact(1, Some("b@x.com"), None)]).await.is_err());
        assert!(store.insert_contacts(&[contact(1, Some("c@x.com"), None)]).await.is_ok());
        assert_eq!(store.insert_batches(), vec![1, 1, 1]);
        assert_eq!(store.contacts().len(), 2);
    }

    #[tokio::test]
    async fn test_read_failure() {
        let store = MemoryStore::new();
        store.fail_reads();
        assert!(store.find_all_contacts().await.is_err());
        assert!(store.find_organizations_by_name(&[]).await.is_err());
    }
}
