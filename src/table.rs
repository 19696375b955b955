//! Delimited-text customer table.
//!
//! Rows are kept as raw `StringRecord`s so columns the deriver does not know
//! about (ids, names, category labels) pass through untouched.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{MetricsError, Result};
use crate::models::{CsvCustomerRow, CustomerRecord, DerivedMetrics, DERIVED_COLUMNS};

/// Raw columns the deriver reads
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "total_orders",
    "total_tips",
    "total_spent",
    "average_order_value",
    "front_total_spent",
    "central_total_spent",
    "favorite_category_spend_dollars",
    "favorite_item_spend_dollars",
    "first_order_date",
    "last_order_date",
];

/// Convert a CLI delimiter character to the single byte csv expects
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(MetricsError::Config(format!(
            "delimiter must be a single ASCII character, got {:?}",
            delimiter
        )))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl CustomerTable {
    pub fn new(headers: StringRecord, rows: Vec<StringRecord>) -> Self {
        Self { headers, rows }
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<csv::Result<Vec<_>>>()?;
        Ok(Self::new(headers, rows))
    }

    pub fn from_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file, delimiter)
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| MetricsError::MissingColumn(name.to_string()))
    }

    /// Every cell of one column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).unwrap_or_default())
            .collect())
    }

    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.column_index(name)?;
        }
        Ok(())
    }

    /// Parse the raw aggregates of every row.
    ///
    /// A missing required column fails the whole table; unreadable cells only
    /// blank that field and are logged.
    pub fn records(&self) -> Result<Vec<CustomerRecord>> {
        self.require_columns(&REQUIRED_COLUMNS)?;

        let mut records = Vec::with_capacity(self.rows.len());
        let mut issue_count = 0;

        for (i, row) in self.rows.iter().enumerate() {
            let raw: CsvCustomerRow = row.deserialize(Some(&self.headers))?;
            let (record, issues) = raw.to_record();
            for issue in issues {
                if issue_count < 5 {
                    warn!(
                        "Row {}: unreadable {} value {:?}, treating as missing",
                        i + 1,
                        issue.column,
                        issue.value
                    );
                }
                issue_count += 1;
            }
            records.push(record);
        }

        if issue_count > 0 {
            warn!("{} unreadable cells treated as missing", issue_count);
        }
        Ok(records)
    }

    /// Original columns followed by `DERIVED_COLUMNS`.
    ///
    /// Derived columns already present (from an earlier pass) are dropped
    /// first, so re-deriving an output file reproduces it.
    pub fn with_derived(&self, derived: &[DerivedMetrics]) -> Result<CustomerTable> {
        if derived.len() != self.rows.len() {
            return Err(MetricsError::RowCountMismatch {
                rows: self.rows.len(),
                derived: derived.len(),
            });
        }

        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|h| !DERIVED_COLUMNS.contains(&h))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped > 0 {
            info!("Replacing {} previously derived columns", dropped);
        }

        let mut headers = StringRecord::new();
        for (h, _) in self.headers.iter().zip(&keep).filter(|(_, k)| **k) {
            headers.push_field(h);
        }
        for h in DERIVED_COLUMNS {
            headers.push_field(h);
        }

        let rows = self
            .rows
            .iter()
            .zip(derived)
            .map(|(row, metrics)| {
                let mut out = StringRecord::with_capacity(row.as_slice().len(), headers.len());
                for (field, _) in row.iter().zip(&keep).filter(|(_, k)| **k) {
                    out.push_field(field);
                }
                for field in metrics.to_fields() {
                    out.push_field(&field);
                }
                out
            })
            .collect();

        Ok(CustomerTable::new(headers, rows))
    }

    pub fn to_writer<W: Write>(&self, writer: W, delimiter: u8) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .from_writer(writer);

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write to `path`, creating parent directories as needed
    pub fn write_path(&self, path: impl AsRef<Path>, delimiter: u8) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        self.to_writer(std::io::BufWriter::new(file), delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "customer_id,total_orders,total_tips,total_spent,average_order_value,front_total_spent,central_total_spent,favorite_category_spend_dollars,favorite_item_spend_dollars,first_order_date,last_order_date,favorite_item_category_name";

    fn table(rows: &[&str]) -> CustomerTable {
        let text = std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n");
        CustomerTable::from_reader(text.as_bytes(), b',').unwrap()
    }

    #[test]
    fn test_records_parse_all_rows() {
        let t = table(&[
            "c1,4,10,200,50,120,80,50,30,2019-03-01 10:00:00,2024-05-01 09:00:00,Coffee",
            "c2,0,0,0,0,0,0,0,0,,,Tea",
        ]);
        let records = t.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].total_orders, Some(4));
        assert_eq!(records[1].first_order_date, None);
    }

    #[test]
    fn test_missing_required_column_fails_whole_table() {
        let text = "customer_id,total_orders\nc1,3\n";
        let t = CustomerTable::from_reader(text.as_bytes(), b',').unwrap();
        match t.records() {
            Err(MetricsError::MissingColumn(col)) => assert_eq!(col, "total_tips"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_cells_do_not_drop_rows() {
        let t = table(&[
            "c1,abc,10,200,50,120,80,50,30,garbage,2024-05-01,Coffee",
            "c2,3,9,90,30,10,80,45,9,2019-01-01,2024-01-01,Tea",
        ]);
        let records = t.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].total_orders, None);
        assert_eq!(records[0].first_order_date, None);
        assert_eq!(records[1].total_orders, Some(3));
    }

    #[test]
    fn test_with_derived_appends_in_order() {
        let t = table(&["c1,4,10,200,50,120,80,50,30,2019-03-01,2024-05-01,Coffee"]);
        let out = t.with_derived(&[DerivedMetrics::default()]).unwrap();
        let headers: Vec<&str> = out.headers().iter().collect();
        assert_eq!(headers.len(), 12 + DERIVED_COLUMNS.len());
        assert_eq!(headers[11], "favorite_item_category_name");
        assert_eq!(&headers[12..], &DERIVED_COLUMNS[..]);
        assert_eq!(out.rows()[0].get(0), Some("c1"));
    }

    #[test]
    fn test_with_derived_replaces_existing_derived_columns() {
        let t = table(&["c1,4,10,200,50,120,80,50,30,2019-03-01,2024-05-01,Coffee"]);
        let once = t.with_derived(&[DerivedMetrics::default()]).unwrap();
        let twice = once.with_derived(&[DerivedMetrics::default()]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_row_count_mismatch() {
        let t = table(&["c1,4,10,200,50,120,80,50,30,2019-03-01,2024-05-01,Coffee"]);
        assert!(matches!(
            t.with_derived(&[]),
            Err(MetricsError::RowCountMismatch { rows: 1, derived: 0 })
        ));
    }

    #[test]
    fn test_writer_round_trip_preserves_cells() {
        let t = table(&["c1,4,10,200,50,120,80,50,30,2019-03-01,2024-05-01,\"Bagels, Sweet\""]);
        let mut buf = Vec::new();
        t.to_writer(&mut buf, b',').unwrap();
        let back = CustomerTable::from_reader(buf.as_slice(), b',').unwrap();
        assert_eq!(back, t);
        assert_eq!(back.column("favorite_item_category_name").unwrap(), vec!["Bagels, Sweet"]);
    }

    #[test]
    fn test_new_table_from_records() {
        let headers = StringRecord::from(vec!["customer_id", "customer_term"]);
        let rows = vec![
            StringRecord::from(vec!["c1", "short-term"]),
            StringRecord::from(vec!["c2", ""]),
        ];
        let t = CustomerTable::new(headers, rows);
        assert_eq!(t.len(), 2);
        assert_eq!(t.column("customer_term").unwrap(), vec!["short-term", ""]);
        assert!(matches!(t.records(), Err(MetricsError::MissingColumn(_))));
    }

    #[test]
    fn test_delimiter_byte() {
        assert_eq!(delimiter_byte(';').unwrap(), b';');
        assert!(delimiter_byte('→').is_err());
    }
}
