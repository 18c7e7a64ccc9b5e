//! Column classification
//!
//! Suggests a `ColumnMapping` from header text alone. The suggestion is only a
//! starting point; every slot can be changed before the import runs.

use crate::types::{ColumnMapping, SingleField};

const EMAIL_KEYWORDS: &[&str] = &["email", "mail"];
const PHONE_KEYWORDS: &[&str] = &["phone", "mobile", "number"];

/// Guess the mapping for `headers`.
///
/// Single-valued fields are resolved in `SingleField::ALL` order and never
/// share a column. Email columns are every unclaimed header mentioning mail;
/// phone columns are every remaining header mentioning a phone keyword.
pub fn classify(headers: &[String]) -> ColumnMapping {
    let hay: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut mapping = ColumnMapping::new(headers.len());

    for field in SingleField::ALL {
        let taken = mapping.taken();
        let index = guess_index(&hay, field.keywords(), |i| !taken.contains(&i));
        if index.is_some() {
            // cannot conflict: the candidate was filtered against `taken`
            let _ = mapping.set_single(field, index);
        }
    }

    mapping.set_emails(matching_indices(&hay, EMAIL_KEYWORDS));
    let emails = mapping.emails().clone();
    let phones: Vec<usize> = matching_indices(&hay, PHONE_KEYWORDS)
        .into_iter()
        .filter(|i| !emails.contains(i))
        .collect();
    mapping.set_phones(phones);

    mapping
}

/// First free header equal to or containing a keyword, keywords tried in order
fn guess_index(hay: &[String], keywords: &[&str], free: impl Fn(usize) -> bool) -> Option<usize> {
    keywords.iter().find_map(|k| {
        hay.iter()
            .enumerate()
            .find(|(i, h)| free(*i) && (h.as_str() == *k || h.contains(k)))
            .map(|(i, _)| i)
    })
}

fn matching_indices(hay: &[String], keywords: &[&str]) -> Vec<usize> {
    hay.iter()
        .enumerate()
        .filter(|(_, h)| keywords.iter().any(|k| h.contains(k)))
        .map(|(i, _)| i)
        .collect()
}
