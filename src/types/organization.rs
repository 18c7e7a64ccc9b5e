//! Organization types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database identifier of an organization
pub type OrgId = i64;

/// Optional organization metadata collected from a spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgMeta {
    pub website: Option<String>,
    pub sector: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl OrgMeta {
    /// True when at least one field carries a value
    pub fn has_any(&self) -> bool {
        self.website.is_some() || self.sector.is_some() || self.city.is_some() || self.country.is_some()
    }

    /// Fill every empty field from `other`; present fields are kept
    pub fn fill_from(&mut self, other: OrgMeta) {
        if self.website.is_none() {
            self.website = other.website;
        }
        if self.sector.is_none() {
            self.sector = other.sector;
        }
        if self.city.is_none() {
            self.city = other.city;
        }
        if self.country.is_none() {
            self.country = other.country;
        }
    }
}

/// Minimal `{id, name}` projection returned by lookups and inserts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrgRef {
    pub id: OrgId,
    pub name: String,
}

/// Organization to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    #[serde(flatten)]
    pub meta: OrgMeta,
}

/// Partial update of an existing organization; `None` fields are left alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationPatch {
    pub id: OrgId,
    #[serde(flatten)]
    pub meta: OrgMeta,
}

/// Stored organization row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    pub website: Option<String>,
    pub sector: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}
