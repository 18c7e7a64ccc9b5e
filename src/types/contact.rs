//! Contact types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::organization::OrgId;

/// Contact computed by the import and waiting to be written.
///
/// At least one of `email`/`phone` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedContact {
    pub org_id: OrgId,
    pub person_name: Option<String>,
    pub designation: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Email/phone of an existing contact, scoped to its organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrgContactKey {
    pub org_id: OrgId,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Email/phone of any existing contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactKey {
    pub email: Option<String>,
    pub phone: Option<String>,
}
