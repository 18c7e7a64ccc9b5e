//! Row aggregation by organization name
//!
//! Many spreadsheet rows may describe one organization. Rows are folded into
//! one `OrgAggregate` per trimmed, case-sensitive organization name, in
//! first-appearance order.

use std::collections::HashMap;

use crate::types::{ColumnMapping, OrgMeta, ParsedTable, SingleField};

/// Merged view of all selected rows sharing one organization name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgAggregate {
    pub name: String,
    pub meta: OrgMeta,
    /// Lowercased emails, duplicates kept
    pub emails: Vec<String>,
    /// Trimmed phones, duplicates kept
    pub phones: Vec<String>,
    pub person_name: Option<String>,
    pub designation: Option<String>,
}

/// Aggregates in first-appearance order
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    orgs: Vec<OrgAggregate>,
    by_name: HashMap<String, usize>,
    pub rows_valid: usize,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.orgs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orgs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrgAggregate> {
        self.orgs.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.orgs.iter().map(|o| o.name.clone()).collect()
    }

    fn entry(&mut self, name: &str) -> &mut OrgAggregate {
        let index = match self.by_name.get(name) {
            Some(&i) => i,
            None => {
                self.orgs.push(OrgAggregate {
                    name: name.to_string(),
                    ..Default::default()
                });
                self.by_name.insert(name.to_string(), self.orgs.len() - 1);
                self.orgs.len() - 1
            }
        };
        &mut self.orgs[index]
    }
}

#[cfg(test)]
impl Aggregation {
    pub fn get(&self, name: &str) -> Option<&OrgAggregate> {
        self.by_name.get(name).map(|&i| &self.orgs[i])
    }
}

/// Fold the selected rows of `table` into per-organization aggregates.
///
/// Rows without an organization name are skipped. The mapping must have an
/// org-name column; without one nothing is aggregated.
pub fn aggregate(table: &ParsedTable, selection: &[usize], mapping: &ColumnMapping) -> Aggregation {
    let mut out = Aggregation::default();
    let Some(org_col) = mapping.single(SingleField::OrgName) else {
        return out;
    };
    let value = |row: usize, field: SingleField| -> Option<String> {
        mapping
            .single(field)
            .and_then(|col| non_empty(table.cell(row, col)))
    };

    for &row in selection {
        if row >= table.row_count() {
            continue;
        }
        let Some(name) = non_empty(table.cell(row, org_col)) else {
            continue;
        };
        out.rows_valid += 1;

        let meta = OrgMeta {
            website: value(row, SingleField::Website).map(|w| normalize_url(&w)),
            sector: value(row, SingleField::Sector),
            city: value(row, SingleField::City),
            country: value(row, SingleField::Country),
        };
        let person_name = value(row, SingleField::PersonName);
        let designation = value(row, SingleField::Designation);
        let emails = mapping
            .emails()
            .iter()
            .filter_map(|&col| non_empty(table.cell(row, col)))
            .map(|e| e.to_lowercase());
        let phones = mapping
            .phones()
            .iter()
            .filter_map(|&col| non_empty(table.cell(row, col)));

        let agg = out.entry(&name);
        agg.meta.fill_from(meta);
        if agg.person_name.is_none() {
            agg.person_name = person_name;
        }
        if agg.designation.is_none() {
            agg.designation = designation;
        }
        agg.emails.extend(emails);
        agg.phones.extend(phones);
    }

    out
}

/// Prefix `https://` unless the value already names a scheme
pub fn normalize_url(value: &str) -> String {
    let s = value.trim();
    if s.starts_with("http://") || s.starts_with("https://") {
        s.to_string()
    } else {
        format!("https://{s}")
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let s = raw.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MappingSpec;

    fn table(rows: &[&[&str]]) -> ParsedTable {
        ParsedTable::from_records(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn mapping(cols: usize, spec: MappingSpec) -> ColumnMapping {
        ColumnMapping::from_spec(cols, &spec).unwrap()
    }

    #[test]
    fn test_first_non_empty_metadata_wins() {
        let t = table(&[
            &["Company", "City", "Website", "Email"],
            &["Acme", "NYC", "", "a@x.com"],
            &["Acme", "", "acme.com", "b@x.com"],
        ]);
        let m = mapping(
            4,
            MappingSpec {
                org_name: Some(0),
                city: Some(1),
                website: Some(2),
                emails: vec![3],
                ..Default::default()
            },
        );

        let agg = aggregate(&t, &[0, 1], &m);
        let acme = agg.get("Acme").unwrap();

        assert_eq!(agg.len(), 1);
        assert_eq!(acme.meta.city.as_deref(), Some("NYC"));
        assert_eq!(acme.meta.website.as_deref(), Some("https://acme.com"));
    }

    #[test]
    fn test_later_rows_do_not_overwrite() {
        let t = table(&[
            &["Company", "Sector", "Person", "Title", "Phone"],
            &["Acme", "Retail", "", "", "111"],
            &["Acme", "Finance", "Jane", "CTO", "222"],
            &["Acme", "", "John", "CEO", "333"],
        ]);
        let m = mapping(
            5,
            MappingSpec {
                org_name: Some(0),
                sector: Some(1),
                person_name: Some(2),
                designation: Some(3),
                phones: vec![4],
                ..Default::default()
            },
        );

        let agg = aggregate(&t, &[0, 1, 2], &m);
        let acme = agg.get("Acme").unwrap();

        assert_eq!(acme.meta.sector.as_deref(), Some("Retail"));
        assert_eq!(acme.person_name.as_deref(), Some("Jane"));
        assert_eq!(acme.designation.as_deref(), Some("CTO"));
        assert_eq!(acme.phones, vec!["111", "222", "333"]);
    }

    #[test]
    fn test_collects_all_contact_values_with_duplicates() {
        let t = table(&[
            &["Company", "Email", "Alt Email", "Mobile"],
            &["Acme", "A@X.com", "b@x.com", " 555 "],
            &["Acme", "a@x.com", "", ""],
        ]);
        let m = mapping(
            4,
            MappingSpec {
                org_name: Some(0),
                emails: vec![1, 2],
                phones: vec![3],
                ..Default::default()
            },
        );

        let agg = aggregate(&t, &[0, 1], &m);
        let acme = agg.get("Acme").unwrap();

        assert_eq!(acme.emails, vec!["a@x.com", "b@x.com", "a@x.com"]);
        assert_eq!(acme.phones, vec!["555"]);
    }

    #[test]
    fn test_rows_without_org_name_are_skipped() {
        let t = table(&[
            &["Company", "Email"],
            &["  ", "lost@x.com"],
            &["Globex", "g@x.com"],
        ]);
        let m = mapping(
            2,
            MappingSpec {
                org_name: Some(0),
                emails: vec![1],
                ..Default::default()
            },
        );

        let agg = aggregate(&t, &[0, 1], &m);
        assert_eq!(agg.rows_valid, 1);
        assert_eq!(agg.names(), vec!["Globex"]);
    }

    #[test]
    fn test_names_are_trimmed_and_case_sensitive_in_order() {
        let t = table(&[
            &["Company", "Email"],
            &[" beta ", "1@x.com"],
            &["Alpha", "2@x.com"],
            &["alpha", "3@x.com"],
            &["beta", "4@x.com"],
        ]);
        let m = mapping(
            2,
            MappingSpec {
                org_name: Some(0),
                emails: vec![1],
                ..Default::default()
            },
        );

        let agg = aggregate(&t, &[0, 1, 2, 3], &m);
        assert_eq!(agg.names(), vec!["beta", "Alpha", "alpha"]);
        assert_eq!(agg.get("beta").unwrap().emails, vec!["1@x.com", "4@x.com"]);
    }

    #[test]
    fn test_only_selected_rows_contribute() {
        let t = table(&[&["Company", "Email"], &["A", "a@x.com"], &["B", "b@x.com"]]);
        let m = mapping(
            2,
            MappingSpec {
                org_name: Some(0),
                emails: vec![1],
                ..Default::default()
            },
        );

        let agg = aggregate(&t, &[1, 9], &m);
        assert_eq!(agg.names(), vec!["B"]);
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let t = table(&[&["Company", "City", "Email"], &["Acme"]]);
        let m = mapping(
            3,
            MappingSpec {
                org_name: Some(0),
                city: Some(1),
                emails: vec![2],
                ..Default::default()
            },
        );

        let agg = aggregate(&t, &[0], &m);
        let acme = agg.get("Acme").unwrap();
        assert!(acme.meta.city.is_none());
        assert!(acme.emails.is_empty());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("acme.com"), "https://acme.com");
        assert_eq!(normalize_url(" http://acme.com "), "http://acme.com");
        assert_eq!(normalize_url("https://acme.com"), "https://acme.com");
    }
}
