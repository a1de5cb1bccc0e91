//! In-memory tabular backend.
//!
//! A [`Table`] is an ordered list of named columns and an ordered list of
//! rows. Cells are JSON values: strings and numbers as loaded or transformed,
//! `Null` for a blank cell. Operations only talk to this type, so there is a
//! single backend behind every transformer, validator and exporter.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{TableError, TableResult};

/// Rows x named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new<I, S>(columns: I) -> TableResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for column in columns {
            table.add_column(column, Value::Null)?;
        }
        Ok(table)
    }

    /// Build a table from JSON objects (one object per row).
    ///
    /// Columns are taken in first-seen order; keys missing from a row become
    /// blank cells. Non-object records are ignored.
    pub fn from_records(records: &[Value]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            if let Some(obj) = record.as_object() {
                for key in obj.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
        }

        let rows = records
            .iter()
            .filter_map(|r| r.as_object())
            .map(|obj| {
                columns
                    .iter()
                    .map(|c| obj.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require_index(&self, name: &str) -> TableResult<usize> {
        self.column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    /// Append a row; its length must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> TableResult<()> {
        if row.len() != self.columns.len() {
            return Err(TableError::LengthMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Cell at (row, column).
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> TableResult<Vec<&Value>> {
        let idx = self.require_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Replace a column's values, or append a new column.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> TableResult<()> {
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                expected: self.rows.len(),
                actual: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Append a column filled with one value.
    pub fn add_column(&mut self, name: impl Into<String>, fill: Value) -> TableResult<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(TableError::DuplicateColumn(name));
        }
        self.columns.push(name);
        for row in &mut self.rows {
            row.push(fill.clone());
        }
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> TableResult<()> {
        if self.has_column(to) {
            return Err(TableError::DuplicateColumn(to.to_string()));
        }
        let idx = self.require_index(from)?;
        self.columns[idx] = to.to_string();
        Ok(())
    }

    /// Apply `f` to every cell of a column in place.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> TableResult<()>
    where
        F: FnMut(usize, &Value) -> Value,
    {
        let idx = self.require_index(name)?;
        for (i, row) in self.rows.iter_mut().enumerate() {
            row[idx] = f(i, &row[idx]);
        }
        Ok(())
    }

    /// Apply `f` to every cell in place.
    pub fn map_cells<F>(&mut self, mut f: F)
    where
        F: FnMut(&Value) -> Value,
    {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                *cell = f(cell);
            }
        }
    }

    /// Keep only rows for which the predicate holds. Returns the number removed.
    pub fn filter_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(usize, &[Value]) -> bool,
    {
        let before = self.rows.len();
        let mut idx = 0;
        self.rows.retain(|row| {
            let kept = keep(idx, row);
            idx += 1;
            kept
        });
        before - self.rows.len()
    }

    /// Group row indices by the values of `keys`.
    ///
    /// Groups come back in order of first appearance.
    pub fn group_by(&self, keys: &[String]) -> TableResult<Vec<(Vec<Value>, Vec<usize>)>> {
        let idxs = keys
            .iter()
            .map(|k| self.require_index(k))
            .collect::<TableResult<Vec<_>>>()?;

        let mut order: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();
        let mut lookup: HashMap<String, usize> = HashMap::new();

        for (row_idx, row) in self.rows.iter().enumerate() {
            let key: Vec<Value> = idxs.iter().map(|&i| row[i].clone()).collect();
            let fingerprint = Value::Array(key.clone()).to_string();
            match lookup.get(&fingerprint) {
                Some(&pos) => order[pos].1.push(row_idx),
                None => {
                    lookup.insert(fingerprint, order.len());
                    order.push((key, vec![row_idx]));
                }
            }
        }

        Ok(order)
    }

    /// Rows as JSON objects.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}

/// Render a cell as text; blank cells become an empty string.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Check if a cell is blank (null or whitespace-only string).
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::from_records(&[
            json!({"station": "A", "depth": "1"}),
            json!({"station": "B", "depth": "5"}),
            json!({"station": "A", "depth": "10"}),
        ])
    }

    #[test]
    fn test_from_records_keeps_column_order() {
        let table = Table::from_records(&[json!({"a": 1}), json!({"a": 2, "b": 3})]);
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.cell(0, "b"), Some(&Value::Null));
        assert_eq!(table.cell(1, "b"), Some(&json!(3)));
    }

    #[test]
    fn test_set_column_length_mismatch() {
        let mut table = sample();
        let err = table.set_column("depth", vec![json!(1)]).unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { expected: 3, actual: 1 }));
    }

    #[test]
    fn test_set_column_appends_new() {
        let mut table = sample();
        table
            .set_column("flag", vec![json!("x"), json!("y"), json!("z")])
            .unwrap();
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.cell(2, "flag"), Some(&json!("z")));
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let table = sample();
        let groups = table.group_by(&["station".to_string()]).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, vec![json!("A")]);
        assert_eq!(groups[0].1, vec![0, 2]);
        assert_eq!(groups[1].1, vec![1]);
    }

    #[test]
    fn test_filter_rows() {
        let mut table = sample();
        assert_eq!(table.columns(), &["station".to_string(), "depth".to_string()]);
        let station = table.column_index("station").unwrap();
        let removed = table.filter_rows(|_, row| row[station] == json!("A"));
        assert_eq!(removed, 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_unknown_column() {
        let table = sample();
        assert!(matches!(
            table.column("salinity"),
            Err(TableError::UnknownColumn(_))
        ));
    }
}
