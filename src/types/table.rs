//! Parsed tabular data

use serde::{Deserialize, Serialize};

/// Uniform `{headers, rows}` view of an uploaded file.
///
/// Rows never hold more cells than there are headers; a shorter row reads
/// as empty trailing cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    /// Build a table from raw records; the first record becomes the header.
    pub fn from_records(mut records: Vec<Vec<String>>) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let headers: Vec<String> = records
            .remove(0)
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        let width = headers.len();
        let rows = records
            .into_iter()
            .map(|mut row| {
                row.truncate(width);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Raw cell value, empty when the row is short
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Write the table as RFC 4180 CSV
    pub fn write_csv<W: std::io::Write>(&self, out: W) -> csv::Result<()> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_from_records_trims_headers_only() {
        let table = ParsedTable::from_records(vec![
            rec(&["  Company ", "Email"]),
            rec(&[" Acme ", "a@x.com"]),
        ]);
        assert_eq!(table.headers, rec(&["Company", "Email"]));
        assert_eq!(table.rows[0][0], " Acme ");
    }

    #[test]
    fn test_from_records_truncates_wide_rows() {
        let table = ParsedTable::from_records(vec![rec(&["A", "B"]), rec(&["1", "2", "3"])]);
        assert_eq!(table.rows[0], rec(&["1", "2"]));
    }

    #[test]
    fn test_cell_reads_short_rows_as_empty() {
        let table = ParsedTable::from_records(vec![rec(&["A", "B", "C"]), rec(&["1"])]);
        assert_eq!(table.cell(0, 0), "1");
        assert_eq!(table.cell(0, 2), "");
        assert_eq!(table.cell(7, 0), "");
    }

    #[test]
    fn test_empty_input() {
        let table = ParsedTable::from_records(vec![]);
        assert_eq!(table.column_count(), 0);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_write_csv_quotes_when_needed() {
        let table = ParsedTable::from_records(vec![
            rec(&["Name", "Note"]),
            rec(&["Acme, Inc.", "says \"hi\""]),
        ]);
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Name,Note\n\"Acme, Inc.\",\"says \"\"hi\"\"\"\n"
        );
    }
}
