//! In-memory tables of loosely typed cells.

use crate::error::{ForecastError, Result};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single table cell.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell; `None` for nulls and text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Null | Value::Text(_) => None,
        }
    }

    /// Bit pattern used for equality; folds `-0.0` into `0.0` and every NaN into one.
    fn float_key(f: f64) -> u64 {
        if f.is_nan() {
            f64::NAN.to_bits()
        } else if f == 0.0 {
            0.0f64.to_bits()
        } else {
            f.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => Value::float_key(*a) == Value::float_key(*b),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(i) => i.hash(state),
            Value::Float(f) => Value::float_key(*f).hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Rows of cells under a fixed header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking that every row matches the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(ForecastError::InvalidParameter(format!(
                "row {i} has {} cells, header has {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

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

    /// Position of `name` in the header.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| ForecastError::MissingColumn {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// New table holding only `names`, in that order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Table {
            columns: names.iter().map(|s| s.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    pub(crate) fn with_rows(&self, rows: Vec<Vec<Value>>) -> Table {
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample() -> Table {
        Table::new(
            vec!["id".into(), "price".into(), "name".into()],
            vec![
                vec![Value::Int(1), Value::Float(9.5), Value::Text("tv".into())],
                vec![Value::Int(2), Value::Null, Value::Text("radio".into())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn select_reorders_columns() {
        let table = sample().select(&["name", "id"]).unwrap();
        assert_eq!(table.columns(), &["name".to_string(), "id".to_string()]);
        assert_eq!(table.rows()[1], vec![Value::Text("radio".into()), Value::Int(2)]);
    }

    #[test]
    fn missing_column_lists_available() {
        let err = sample().select(&["dateUpdated"]).unwrap_err();
        match err {
            ForecastError::MissingColumn { column, available } => {
                assert_eq!(column, "dateUpdated");
                assert_eq!(available, vec!["id", "price", "name"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let result = Table::new(vec!["a".into()], vec![vec![Value::Null, Value::Null]]);
        assert!(result.is_err());
    }

    #[test]
    fn float_equality_is_total() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
        assert_ne!(Value::Float(1.0), Value::Int(1));

        let set: HashSet<Value> = [Value::Float(f64::NAN), Value::Float(f64::NAN), Value::Null]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn column_view_and_numeric_access() {
        let table = sample();
        let prices: Vec<Option<f64>> = table.column("price").unwrap().map(Value::as_f64).collect();
        assert_eq!(prices, vec![Some(9.5), None]);
        assert_eq!(Value::Int(3).to_string(), "3");
    }
}
