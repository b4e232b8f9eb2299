use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::error::SqlMapError;
use crate::types::RowValues;

/// One result row keyed by column name.
///
/// Column order follows the originating row (or the key order passed to
/// [`Record::project`]). Records are built once during result mapping and never mutated.
#[derive(Debug, Clone)]
pub struct Record {
    /// The column names for this record (shared across all records of one execution)
    column_names: Arc<Vec<String>>,
    values: Vec<RowValues>,
    // Shared name -> index lookup so `get` avoids repeated string comparisons
    column_index_cache: Arc<HashMap<String, usize>>,
}

pub(crate) fn build_index_cache(column_names: &[String]) -> Arc<HashMap<String, usize>> {
    let mut cache = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        // first occurrence wins for duplicate column names
        cache.entry(name.clone()).or_insert(i);
    }
    Arc::new(cache)
}

impl Record {
    /// Create a new record
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `values` - The values for this record, in column order
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let cache = build_index_cache(&column_names);
        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    pub(crate) fn with_cache(
        column_names: Arc<Vec<String>>,
        values: Vec<RowValues>,
        column_index_cache: Arc<HashMap<String, usize>>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index_cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index_cache.get(column_name).copied()
    }

    /// Get a value from the record by column name
    ///
    /// # Returns
    ///
    /// The value at the column, or None if the column wasn't found
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the record by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Build a new record containing only `keys`, in the order given.
    ///
    /// # Errors
    /// Returns `SqlMapError::ExecutionError` if a key is not a column of this record.
    pub fn project<S: AsRef<str>>(&self, keys: &[S]) -> Result<Record, SqlMapError> {
        let mut names = Vec::with_capacity(keys.len());
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            let value = self.get(key).ok_or_else(|| {
                SqlMapError::ExecutionError(format!("column {key} not present in record"))
            })?;
            names.push(key.to_owned());
            values.push(value.clone());
        }
        Ok(Record::new(Arc::new(names), values))
    }

    /// Convert into a JSON object, preserving column order where the map allows.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.column_names == other.column_names && self.values == other.values
    }
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new(
            Arc::new(vec!["id".into(), "name".into(), "email".into()]),
            vec![
                RowValues::Int(7),
                RowValues::Text("Ada".into()),
                RowValues::Null,
            ],
        )
    }

    #[test]
    fn lookups_by_name_and_index() {
        let rec = sample();
        assert_eq!(rec.get("name"), Some(&RowValues::Text("Ada".into())));
        assert_eq!(rec.get_by_index(0), Some(&RowValues::Int(7)));
        assert!(rec.get("missing").is_none());
        assert_eq!(rec.columns(), ["id", "name", "email"]);
    }

    #[test]
    fn project_reorders_and_subsets() {
        let rec = sample().project(&["name", "id"]).unwrap();
        let keys: Vec<&str> = rec.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["name", "id"]);
        assert!(sample().project(&["nope"]).is_err());
    }

    #[test]
    fn serializes_as_object() {
        let json = sample().to_json();
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "Ada");
        assert!(json["email"].is_null());
    }
}
