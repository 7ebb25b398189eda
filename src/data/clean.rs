//! Row-level cleaning.

use crate::data::table::Table;
use std::collections::HashSet;

/// Copy of `table` without exact duplicate rows.
///
/// The first occurrence of each row is kept and relative order is preserved,
/// so applying this twice gives the same table as applying it once.
pub fn drop_duplicates(table: &Table) -> Table {
    let mut seen = HashSet::with_capacity(table.len());
    let rows = table
        .rows()
        .iter()
        .filter(|row| seen.insert(row.as_slice()))
        .cloned()
        .collect();
    table.with_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::Value;

    fn table(rows: Vec<Vec<Value>>) -> Table {
        Table::new(vec!["a".into(), "b".into()], rows).unwrap()
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let t = table(vec![
            vec![Value::Int(2), Value::Null],
            vec![Value::Int(1), Value::Text("x".into())],
            vec![Value::Int(2), Value::Null],
            vec![Value::Int(1), Value::Text("y".into())],
        ]);
        let cleaned = drop_duplicates(&t);
        assert_eq!(cleaned.len(), 3);
        assert_eq!(cleaned.rows()[0], t.rows()[0]);
        assert_eq!(cleaned.rows()[2], t.rows()[3]);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn idempotent_and_empty_safe() {
        let t = table(vec![
            vec![Value::Float(1.0), Value::Float(f64::NAN)],
            vec![Value::Float(1.0), Value::Float(f64::NAN)],
        ]);
        let once = drop_duplicates(&t);
        assert_eq!(once.len(), 1);
        assert_eq!(drop_duplicates(&once), once);

        let empty = table(vec![]);
        assert!(drop_duplicates(&empty).is_empty());
    }
}
