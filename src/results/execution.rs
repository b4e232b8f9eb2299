use std::collections::HashMap;
use std::sync::Arc;

use super::record::{Record, build_index_cache};
use crate::types::RowValues;

/// Buffered outcome of one statement executed on a cursor.
///
/// Holds the column names once, the row values in result order, the driver's row count
/// and a Postgres-style status message (`SELECT 1`, `INSERT 0 1`, `UPDATE 3`, ...).
#[derive(Debug, Clone)]
pub struct Execution {
    column_names: Arc<Vec<String>>,
    column_index_cache: Arc<HashMap<String, usize>>,
    rows: Vec<Vec<RowValues>>,
    rowcount: i64,
    status_message: String,
}

impl Default for Execution {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl Execution {
    /// Create an empty execution with room for `capacity` rows
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Execution {
        Execution {
            column_names: Arc::new(Vec::new()),
            column_index_cache: Arc::new(HashMap::new()),
            rows: Vec::with_capacity(capacity),
            rowcount: -1,
            status_message: String::new(),
        }
    }

    /// Set the column names for this execution (to be shared by all records)
    pub fn set_column_names(&mut self, column_names: Vec<String>) {
        self.column_index_cache = build_index_cache(&column_names);
        self.column_names = Arc::new(column_names);
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Add a row; values must follow the column order.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        self.rows.push(row_values);
    }

    /// Rows returned for row-producing statements, rows affected otherwise, -1 if unknown.
    #[must_use]
    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    pub fn set_rowcount(&mut self, rowcount: i64) {
        self.rowcount = rowcount;
    }

    #[must_use]
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn set_status_message(&mut self, status_message: impl Into<String>) {
        self.status_message = status_message.into();
    }

    #[must_use]
    pub fn row_len(&self) -> usize {
        self.rows.len()
    }

    fn record(&self, values: Vec<RowValues>) -> Record {
        Record::with_cache(
            Arc::clone(&self.column_names),
            values,
            Arc::clone(&self.column_index_cache),
        )
    }

    /// Map every row to a record, keeping result order.
    #[must_use]
    pub fn into_records(mut self) -> Vec<Record> {
        let rows = std::mem::take(&mut self.rows);
        rows.into_iter().map(|values| self.record(values)).collect()
    }

    /// Map only the first row.
    #[must_use]
    pub fn into_first_record(mut self) -> Option<Record> {
        if self.rows.is_empty() {
            return None;
        }
        let values = self.rows.swap_remove(0);
        Some(self.record(values))
    }

    /// First column of the first row.
    #[must_use]
    pub fn into_first_datum(mut self) -> Option<RowValues> {
        if self.rows.is_empty() {
            return None;
        }
        self.rows.swap_remove(0).into_iter().next()
    }
}
