#![allow(dead_code)]
//! Column mapping types
//!
//! A `ColumnMapping` assigns spreadsheet columns to semantic fields. Every
//! column belongs to at most one slot: one of the seven single-valued fields,
//! the email set, or the phone set. The setters keep that invariant instead
//! of leaving it to the caller.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MappingError;

/// Single-valued semantic fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SingleField {
    OrgName,
    Website,
    Sector,
    City,
    Country,
    PersonName,
    Designation,
}

impl SingleField {
    /// All fields in classification priority order
    pub const ALL: [SingleField; 7] = [
        SingleField::OrgName,
        SingleField::Website,
        SingleField::Sector,
        SingleField::City,
        SingleField::Country,
        SingleField::PersonName,
        SingleField::Designation,
    ];

    /// Header keywords, most specific first
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            SingleField::OrgName => &["org name", "organization", "company", "name"],
            SingleField::Website => &["website", "url"],
            SingleField::Sector => &["sector", "industry"],
            SingleField::City => &["city", "town"],
            SingleField::Country => &["country", "nation"],
            SingleField::PersonName => &["person name", "contact name"],
            SingleField::Designation => &["designation", "title", "role"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SingleField::OrgName => "org name",
            SingleField::Website => "website",
            SingleField::Sector => "sector",
            SingleField::City => "city",
            SingleField::Country => "country",
            SingleField::PersonName => "person name",
            SingleField::Designation => "designation",
        }
    }

    fn slot(self) -> usize {
        match self {
            SingleField::OrgName => 0,
            SingleField::Website => 1,
            SingleField::Sector => 2,
            SingleField::City => 3,
            SingleField::Country => 4,
            SingleField::PersonName => 5,
            SingleField::Designation => 6,
        }
    }
}

impl fmt::Display for SingleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of a mapping, as sent by the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSpec {
    pub org_name: Option<usize>,
    #[serde(default)]
    pub website: Option<usize>,
    #[serde(default)]
    pub sector: Option<usize>,
    #[serde(default)]
    pub city: Option<usize>,
    #[serde(default)]
    pub country: Option<usize>,
    #[serde(default)]
    pub person_name: Option<usize>,
    #[serde(default)]
    pub designation: Option<usize>,
    #[serde(default)]
    pub emails: Vec<usize>,
    #[serde(default)]
    pub phones: Vec<usize>,
}

/// Validated column assignment for one parsed table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    column_count: usize,
    singles: [Option<usize>; 7],
    emails: BTreeSet<usize>,
    phones: BTreeSet<usize>,
}

impl ColumnMapping {
    /// Empty mapping for a table with `column_count` columns
    pub fn new(column_count: usize) -> Self {
        Self {
            column_count,
            singles: [None; 7],
            emails: BTreeSet::new(),
            phones: BTreeSet::new(),
        }
    }

    /// Build a mapping from its wire form, applying every setter rule.
    ///
    /// Single-valued slots are applied first so they win over the
    /// multi-valued sets; emails are applied before phones.
    pub fn from_spec(column_count: usize, spec: &MappingSpec) -> Result<Self, MappingError> {
        let mut mapping = Self::new(column_count);
        let singles = [
            (SingleField::OrgName, spec.org_name),
            (SingleField::Website, spec.website),
            (SingleField::Sector, spec.sector),
            (SingleField::City, spec.city),
            (SingleField::Country, spec.country),
            (SingleField::PersonName, spec.person_name),
            (SingleField::Designation, spec.designation),
        ];
        for (field, index) in singles {
            mapping.set_single(field, index)?;
        }
        for &index in spec.emails.iter().chain(spec.phones.iter()) {
            mapping.check_range(index)?;
        }
        mapping.set_emails(spec.emails.iter().copied());
        let phones: Vec<usize> = spec
            .phones
            .iter()
            .copied()
            .filter(|i| !mapping.emails.contains(i))
            .collect();
        mapping.set_phones(phones);
        Ok(mapping)
    }

    pub fn to_spec(&self) -> MappingSpec {
        MappingSpec {
            org_name: self.single(SingleField::OrgName),
            website: self.single(SingleField::Website),
            sector: self.single(SingleField::Sector),
            city: self.single(SingleField::City),
            country: self.single(SingleField::Country),
            person_name: self.single(SingleField::PersonName),
            designation: self.single(SingleField::Designation),
            emails: self.emails.iter().copied().collect(),
            phones: self.phones.iter().copied().collect(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn single(&self, field: SingleField) -> Option<usize> {
        self.singles[field.slot()]
    }

    pub fn emails(&self) -> &BTreeSet<usize> {
        &self.emails
    }

    pub fn phones(&self) -> &BTreeSet<usize> {
        &self.phones
    }

    /// Which single-valued field holds `index`, if any
    pub fn single_owner(&self, index: usize) -> Option<SingleField> {
        SingleField::ALL
            .into_iter()
            .find(|field| self.single(*field) == Some(index))
    }

    /// Every column claimed by any slot
    pub fn taken(&self) -> BTreeSet<usize> {
        self.singles
            .iter()
            .flatten()
            .copied()
            .chain(self.emails.iter().copied())
            .chain(self.phones.iter().copied())
            .collect()
    }

    /// Assign (or clear, with `None`) a single-valued slot.
    ///
    /// The column is removed from the email and phone sets if present there.
    pub fn set_single(
        &mut self,
        field: SingleField,
        index: Option<usize>,
    ) -> Result<(), MappingError> {
        if let Some(index) = index {
            self.check_range(index)?;
            if let Some(owner) = self.single_owner(index) {
                if owner != field {
                    return Err(MappingError::ColumnTaken { index, field: owner });
                }
            }
            self.emails.remove(&index);
            self.phones.remove(&index);
        }
        self.singles[field.slot()] = index;
        Ok(())
    }

    /// Replace the email column set. Columns held by a single-valued slot are
    /// dropped; accepted columns leave the phone set.
    pub fn set_emails(&mut self, indices: impl IntoIterator<Item = usize>) {
        let accepted = self.accept_multi(indices);
        self.phones.retain(|i| !accepted.contains(i));
        self.emails = accepted;
    }

    /// Replace the phone column set. Columns held by a single-valued slot are
    /// dropped; accepted columns leave the email set.
    pub fn set_phones(&mut self, indices: impl IntoIterator<Item = usize>) {
        let accepted = self.accept_multi(indices);
        self.emails.retain(|i| !accepted.contains(i));
        self.phones = accepted;
    }

    pub fn toggle_email(&mut self, index: usize) {
        let mut next = self.emails.clone();
        if !next.remove(&index) {
            next.insert(index);
        }
        self.set_emails(next);
    }

    pub fn toggle_phone(&mut self, index: usize) {
        let mut next = self.phones.clone();
        if !next.remove(&index) {
            next.insert(index);
        }
        self.set_phones(next);
    }

    /// Columns offered in the email checklist
    pub fn available_for_emails(&self) -> Vec<usize> {
        (0..self.column_count)
            .filter(|i| self.single_owner(*i).is_none() && !self.phones.contains(i))
            .collect()
    }

    /// Columns offered in the phone checklist
    pub fn available_for_phones(&self) -> Vec<usize> {
        (0..self.column_count)
            .filter(|i| self.single_owner(*i).is_none() && !self.emails.contains(i))
            .collect()
    }

    /// Ready to import: org name mapped and at least one contact column
    pub fn validate(&self) -> Result<(), MappingError> {
        if self.single(SingleField::OrgName).is_none() {
            return Err(MappingError::MissingOrgName);
        }
        if self.emails.is_empty() && self.phones.is_empty() {
            return Err(MappingError::NoContactColumns);
        }
        Ok(())
    }

    fn accept_multi(&self, indices: impl IntoIterator<Item = usize>) -> BTreeSet<usize> {
        indices
            .into_iter()
            .filter(|i| *i < self.column_count && self.single_owner(*i).is_none())
            .collect()
    }

    fn check_range(&self, index: usize) -> Result<(), MappingError> {
        if index >= self.column_count {
            return Err(MappingError::ColumnOutOfRange {
                index,
                count: self.column_count,
            });
        }
        Ok(())
    }
}
