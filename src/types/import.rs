//! Bulk import request and report types

use serde::{Deserialize, Serialize};

use super::mapping::MappingSpec;

/// Uploaded file, as carried over NATS
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFileRequest {
    pub file_name: String,
    pub content_base64: String,
}

/// Request to run an import with a user-confirmed mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunImportRequest {
    pub file_name: String,
    pub content_base64: String,
    pub mapping: MappingSpec,
    /// Row range spec such as `1-100, 205, 310-`; empty means all rows
    #[serde(default)]
    pub rows: String,
}

/// What the file looks like before anything is written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub file_name: String,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub suggested_mapping: MappingSpec,
}

/// Organization that could not be created or patched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgFailure {
    pub name: String,
    pub message: String,
}

/// Outcome of the contact batch inserts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReport {
    pub succeeded: usize,
    pub failed: usize,
    pub first_error: Option<String>,
}

/// Final result of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub rows_selected: usize,
    pub rows_valid: usize,
    pub organizations_created: usize,
    pub organizations_patched: usize,
    pub organization_failures: Vec<OrgFailure>,
    pub contacts_staged: usize,
    pub contacts_imported: usize,
    pub contacts_failed: usize,
    pub contacts_skipped: usize,
    pub first_error: Option<String>,
}

impl ImportReport {
    /// True when some part of the run did not make it into storage
    pub fn is_partial(&self) -> bool {
        self.contacts_failed > 0 || !self.organization_failures.is_empty()
    }

    /// True when the run changed anything in storage
    pub fn wrote_anything(&self) -> bool {
        self.organizations_created > 0 || self.organizations_patched > 0 || self.contacts_imported > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_rows_default_to_empty() {
        let req: RunImportRequest = serde_json::from_str(
            r#"{"fileName":"a.csv","contentBase64":"","mapping":{"orgName":0,"emails":[1]}}"#,
        )
        .unwrap();
        assert_eq!(req.rows, "");
        assert_eq!(req.mapping.org_name, Some(0));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = ImportReport {
            contacts_imported: 3,
            first_error: Some("boom".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("contactsImported"));
        assert!(json.contains("firstError"));
    }

    #[test]
    fn test_report_partial_flags() {
        let mut report = ImportReport::default();
        assert!(!report.is_partial());
        assert!(!report.wrote_anything());

        report.contacts_imported = 1000;
        report.contacts_failed = 1500;
        assert!(report.is_partial());
        assert!(report.wrote_anything());
    }
}
