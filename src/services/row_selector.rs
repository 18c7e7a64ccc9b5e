//! Row range selection
//!
//! Parses specs like `1-100, 205, 310-` (1-based, inclusive) into sorted,
//! de-duplicated 0-based row indices.

use std::collections::BTreeSet;

/// Resolve `spec` against a table with `max_rows` data rows.
///
/// A blank spec selects everything. In a range `a-b`, a missing or
/// non-numeric `a` means 1 and a missing or non-numeric `b` means the last
/// row. Single numbers outside `1..=max_rows` and other junk are ignored.
pub fn select_rows(spec: &str, max_rows: usize) -> Vec<usize> {
    if spec.trim().is_empty() {
        return (0..max_rows).collect();
    }

    let mut selected = BTreeSet::new();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if let Some((a, b)) = split_range(token) {
            let start = parse_bound(a).unwrap_or(1).max(1);
            let end = parse_bound(b).map_or(max_rows, |b| b.min(max_rows));
            for row in start..=end {
                selected.insert(row - 1);
            }
        } else if let Some(n) = parse_bound(token) {
            if (1..=max_rows).contains(&n) {
                selected.insert(n - 1);
            }
        }
    }
    selected.into_iter().collect()
}

/// `a-b` into its two sides; anything after a second dash is ignored
fn split_range(token: &str) -> Option<(&str, &str)> {
    let mut parts = token.split('-');
    let a = parts.next()?;
    let b = parts.next()?;
    Some((a.trim(), b.trim()))
}

/// Positive row number; zero and junk count as absent.
///
/// Digits too large for `usize` still name a row past the end of any table.
fn parse_bound(s: &str) -> Option<usize> {
    let s = s.trim();
    let digits = s.strip_prefix('+').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n = digits.parse::<usize>().unwrap_or(usize::MAX);
    (n > 0).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_spec_selects_all() {
        assert_eq!(select_rows("", 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(select_rows("   ", 3), vec![0, 1, 2]);
    }

    #[test]
    fn test_ranges_and_singles() {
        assert_eq!(select_rows("1-3,5", 10), vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_open_ended_range() {
        assert_eq!(select_rows("8-", 10), vec![7, 8, 9]);
        assert_eq!(select_rows("-2", 10), vec![0, 1]);
    }

    #[test]
    fn test_mixed_spec_with_spaces_and_overlaps() {
        assert_eq!(select_rows(" 1-2 , 2-3, 3 ,10", 4), vec![0, 1, 2]);
    }

    #[test]
    fn test_range_end_clamped_to_row_count() {
        assert_eq!(select_rows("3-99", 4), vec![2, 3]);
    }

    #[test]
    fn test_out_of_range_and_junk_ignored() {
        assert_eq!(select_rows("0, 11, abc, 2.5, 4", 10), vec![3]);
    }

    #[test]
    fn test_oversized_numbers_select_nothing() {
        assert!(select_rows("99999999999999999999-", 5).is_empty());
        assert!(select_rows("99999999999999999999", 5).is_empty());
        assert_eq!(select_rows("4-99999999999999999999", 5), vec![3, 4]);
    }

    #[test]
    fn test_malformed_range_bounds_default() {
        assert_eq!(select_rows("x-2", 5), vec![0, 1]);
        assert_eq!(select_rows("4-y", 5), vec![3, 4]);
    }

    #[test]
    fn test_reversed_range_is_empty() {
        assert!(select_rows("5-2", 10).is_empty());
    }

    #[test]
    fn test_no_rows() {
        assert!(select_rows("1-5", 0).is_empty());
        assert!(select_rows("", 0).is_empty());
    }
}
