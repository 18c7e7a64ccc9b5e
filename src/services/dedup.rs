//! Contact de-duplication and pairing
//!
//! Turns each organization's raw email/phone buckets into staged contacts
//! without ever reusing a value that already exists, either on the same
//! organization, anywhere in the contact store, or earlier in this run.

use std::collections::{HashMap, HashSet};

use crate::services::aggregator::OrgAggregate;
use crate::types::{ContactKey, OrgContactKey, OrgId, StagedContact};

/// Email/phone values known for one organization
#[derive(Debug, Clone, Default)]
pub struct ValueSets {
    pub emails: HashSet<String>,
    pub phones: HashSet<String>,
}

/// Result of pairing one organization's bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paired {
    pub staged: Vec<StagedContact>,
    /// Raw bucket values that did not end up in a staged contact
    pub skipped: usize,
}

/// Running accounting for one import run.
///
/// Emails are compared lowercased, phones as exact strings.
#[derive(Debug, Clone, Default)]
pub struct DedupState {
    per_org: HashMap<OrgId, ValueSets>,
    global_emails: HashSet<String>,
    global_phones: HashSet<String>,
    seen_emails: HashSet<String>,
    seen_phones: HashSet<String>,
}

impl DedupState {
    /// Build the accounting sets from what storage already holds
    pub fn new(org_ids: &[OrgId], per_org: Vec<OrgContactKey>, global: Vec<ContactKey>) -> Self {
        let mut state = Self::default();
        for id in org_ids {
            state.per_org.entry(*id).or_default();
        }
        for key in per_org {
            let sets = state.per_org.entry(key.org_id).or_default();
            if let Some(email) = key.email.filter(|e| !e.is_empty()) {
                sets.emails.insert(email.to_lowercase());
            }
            if let Some(phone) = key.phone.filter(|p| !p.is_empty()) {
                sets.phones.insert(phone);
            }
        }
        for key in global {
            if let Some(email) = key.email.filter(|e| !e.is_empty()) {
                state.global_emails.insert(email.to_lowercase());
            }
            if let Some(phone) = key.phone.filter(|p| !p.is_empty()) {
                state.global_phones.insert(phone);
            }
        }
        state
    }

    /// Stage contacts for one organization.
    ///
    /// Emails and phones are de-duplicated independently, stripped of values
    /// the organization already has, then paired by position: the i-th email
    /// goes with the i-th phone and the longer list pairs with nothing. A
    /// value already in the store or claimed earlier in this run is dropped
    /// from its pair; a pair left with neither is not staged.
    ///
    /// Every staged contact carries the organization's first-seen person name
    /// and designation. Distinct people sharing one organization therefore
    /// all get the same name.
    pub fn pair(&mut self, org_id: OrgId, bucket: &OrgAggregate) -> Paired {
        let raw_total = bucket.emails.len() + bucket.phones.len();
        let org = self.per_org.entry(org_id).or_default();

        let emails: Vec<String> = unique(bucket.emails.iter().map(|e| e.to_lowercase()))
            .into_iter()
            .filter(|e| !org.emails.contains(e))
            .collect();
        let phones: Vec<String> = unique(bucket.phones.iter().cloned())
            .into_iter()
            .filter(|p| !org.phones.contains(p))
            .collect();

        let mut out = Paired::default();
        let mut used = 0;
        for i in 0..emails.len().max(phones.len()) {
            let email = emails
                .get(i)
                .filter(|e| !self.global_emails.contains(*e) && !self.seen_emails.contains(*e))
                .cloned();
            let phone = phones
                .get(i)
                .filter(|p| !self.global_phones.contains(*p) && !self.seen_phones.contains(*p))
                .cloned();
            if email.is_none() && phone.is_none() {
                continue;
            }

            let org = self.per_org.entry(org_id).or_default();
            if let Some(e) = &email {
                org.emails.insert(e.clone());
                self.global_emails.insert(e.clone());
                self.seen_emails.insert(e.clone());
                used += 1;
            }
            if let Some(p) = &phone {
                org.phones.insert(p.clone());
                self.global_phones.insert(p.clone());
                self.seen_phones.insert(p.clone());
                used += 1;
            }

            out.staged.push(StagedContact {
                org_id,
                person_name: bucket.person_name.clone(),
                designation: bucket.designation.clone(),
                email,
                phone,
            });
        }
        out.skipped = raw_total - used;
        out
    }
}

#[cfg(test)]
impl DedupState {
    pub fn org_values(&self, org_id: OrgId) -> Option<&ValueSets> {
        self.per_org.get(&org_id)
    }

    pub fn is_known_email(&self, email: &str) -> bool {
        self.global_emails.contains(&email.to_lowercase())
    }

    pub fn is_known_phone(&self, phone: &str) -> bool {
        self.global_phones.contains(phone)
    }
}

/// Order-preserving de-duplication
fn unique(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(v.clone())).collect()
}
