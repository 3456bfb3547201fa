//! Raw tabular input.
//!
//! A [`RawTable`] is the untyped result of reading a catalog export: a header
//! row and string cells. Rows shorter than the header are padded with empty
//! cells, so every row can be indexed by any header position.

use std::io::Read;

use crate::error::IngestError;

/// Header names plus string rows, exactly as read from the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table from in-memory rows. Short rows are padded; extra
    /// trailing cells are kept but never addressed by a header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Parse CSV from any reader. The first record is the header row.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Validation`] when the input is not valid CSV,
    /// is not UTF-8, or has no header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, IngestError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| IngestError::Validation(format!("failed to read CSV header: {}", e)))?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(IngestError::Validation(
                "CSV has no header row".to_string(),
            ));
        }

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| {
                IngestError::Validation(format!("failed to read CSV row {}: {}", line + 2, e))
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(headers, rows))
    }

    /// Parse CSV from an in-memory upload.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, IngestError> {
        Self::from_csv_reader(bytes)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Position of the first header equal to `name` (case-sensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_header_and_rows() {
        let csv = "Handle,Variant SKU,Variant Price\nh1,A,1.00\nh1,B,2.00\n";
        let table = RawTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.column_index("Variant Price"), Some(2));
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[1][1], "B");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "Handle,Variant SKU,Variant Price\nh1,A\n";
        let table = RawTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.rows()[0], vec!["h1", "A", ""]);
    }

    #[test]
    fn test_bom_is_stripped_from_first_header() {
        let csv = "\u{feff}Handle,Variant SKU\nh1,A\n";
        let table = RawTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.column_index("Handle"), Some(0));
    }

    #[test]
    fn test_quoted_fields_keep_commas() {
        let csv = "Title,Tags\n\"Shirt, red\",\"a, b\"\n";
        let table = RawTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.rows()[0][0], "Shirt, red");
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = RawTable::from_csv_bytes(b"").unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let bytes = b"Handle,Variant SKU\nh1,\xff\xfe\n";
        let err = RawTable::from_csv_bytes(bytes).unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let table = RawTable::from_csv_bytes(b"Variant SKU,Variant Price\n").unwrap();
        assert!(table.rows().is_empty());
        assert_eq!(table.column_index("Variant SKU"), Some(0));
    }
}
