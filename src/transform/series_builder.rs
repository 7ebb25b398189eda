//! Derive the timestamped average-price series from a cleaned table.

use crate::data::{Table, Value};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Names of the columns the price series is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceColumns {
    pub date: String,
    pub amount_min: String,
    pub amount_max: String,
}

impl Default for PriceColumns {
    fn default() -> Self {
        Self {
            date: "dateUpdated".to_string(),
            amount_min: "prices.amountMin".to_string(),
            amount_max: "prices.amountMax".to_string(),
        }
    }
}

/// What to do with a date cell that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateErrorPolicy {
    /// Abort on the first unparseable date.
    #[default]
    Fail,
    /// Skip the row and count it.
    Drop,
}

/// One row of the derived series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
}

impl PricePoint {
    /// Midpoint of the price range; `NaN` unless both bounds are present.
    pub fn avg_price(&self) -> f64 {
        match (self.amount_min, self.amount_max) {
            (Some(lo), Some(hi)) => (lo + hi) / 2.0,
            _ => f64::NAN,
        }
    }
}

/// Timestamped price rows in table order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
    missing_dates: usize,
    unparseable_dates: usize,
}

impl PriceSeries {
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Rows skipped because the date cell was empty.
    pub fn missing_dates(&self) -> usize {
        self.missing_dates
    }

    /// Rows skipped under [`DateErrorPolicy::Drop`].
    pub fn unparseable_dates(&self) -> usize {
        self.unparseable_dates
    }

    /// `(timestamp, avg_price)` pairs.
    pub fn avg_prices(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.points.iter().map(|p| (p.timestamp, p.avg_price()))
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse the timestamp spellings found in price exports.
///
/// Offsets are honoured; timestamps without one are taken as UTC. A bare
/// date means midnight.
///
/// # Example
/// ```
/// use pricecast::transform::parse_timestamp;
///
/// let ts = parse_timestamp("2018-06-13T19:39:02Z").unwrap();
/// assert_eq!(ts.to_rfc3339(), "2018-06-13T19:39:02+00:00");
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    let s = s.strip_suffix(" UTC").unwrap_or(s);

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn amount(value: &Value, column: &str, row: usize) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Int(_) | Value::Float(_) => Ok(value.as_f64().filter(|v| !v.is_nan())),
        Value::Text(s) => Err(ForecastError::ParseValue {
            column: column.to_string(),
            row,
            value: s.clone(),
            expected: "number",
        }),
    }
}

/// Select the date and price columns and derive one [`PricePoint`] per row.
///
/// Rows are numbered from 1 (the first row after the header) in errors.
/// Empty date cells are skipped; unparseable ones follow `policy`. Text in a
/// price column is always an error.
pub fn build_price_series(
    table: &Table,
    columns: &PriceColumns,
    policy: DateErrorPolicy,
) -> Result<PriceSeries> {
    let selected = table.select(&[
        columns.date.as_str(),
        columns.amount_min.as_str(),
        columns.amount_max.as_str(),
    ])?;

    let mut series = PriceSeries::default();
    for (i, cells) in selected.rows().iter().enumerate() {
        let row = i + 1;
        let amount_min = amount(&cells[1], &columns.amount_min, row)?;
        let amount_max = amount(&cells[2], &columns.amount_max, row)?;

        let raw = match &cells[0] {
            Value::Null => {
                series.missing_dates += 1;
                continue;
            }
            other => other.to_string(),
        };

        let timestamp = match parse_timestamp(&raw) {
            Some(ts) => ts,
            None => match policy {
                DateErrorPolicy::Fail => {
                    return Err(ForecastError::ParseValue {
                        column: columns.date.clone(),
                        row,
                        value: raw,
                        expected: "timestamp",
                    })
                }
                DateErrorPolicy::Drop => {
                    debug!(row, value = %raw, "dropping row with unparseable date");
                    series.unparseable_dates += 1;
                    continue;
                }
            },
        };

        series.points.push(PricePoint {
            timestamp,
            amount_min,
            amount_max,
        });
    }

    if series.missing_dates > 0 {
        warn!(rows = series.missing_dates, column = %columns.date, "skipped rows without a date");
    }
    if series.unparseable_dates > 0 {
        warn!(rows = series.unparseable_dates, column = %columns.date, "dropped rows with unparseable dates");
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn price_table(rows: Vec<(Value, Value, Value)>) -> Table {
        Table::new(
            vec![
                "id".into(),
                "dateUpdated".into(),
                "prices.amountMin".into(),
                "prices.amountMax".into(),
            ],
            rows.into_iter()
                .enumerate()
                .map(|(i, (d, lo, hi))| vec![Value::Int(i as i64), d, lo, hi])
                .collect(),
        )
        .unwrap()
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn parses_common_timestamp_spellings() {
        let expected = Utc.with_ymd_and_hms(2018, 6, 13, 19, 39, 2).unwrap();
        for raw in [
            "2018-06-13T19:39:02Z",
            "2018-06-13T21:39:02+02:00",
            "2018-06-13 19:39:02",
            "2018-06-13T19:39:02",
            "2018-06-13 19:39:02 UTC",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
        assert_eq!(
            parse_timestamp("2018-06-13"),
            Some(Utc.with_ymd_and_hms(2018, 6, 13, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("13/06/2018"), None);
    }

    #[test]
    fn average_is_midpoint_when_both_present() {
        let table = price_table(vec![
            (text("2018-01-01T00:00:00Z"), Value::Float(10.0), Value::Int(20)),
            (text("2018-01-02T00:00:00Z"), Value::Null, Value::Float(5.0)),
        ]);
        let series = build_price_series(&table, &PriceColumns::default(), DateErrorPolicy::Fail).unwrap();

        let avgs: Vec<f64> = series.avg_prices().map(|(_, v)| v).collect();
        assert_eq!(avgs[0], 15.0);
        assert!(avgs[1].is_nan());
    }

    #[test]
    fn missing_dates_are_skipped() {
        let table = price_table(vec![
            (Value::Null, Value::Float(1.0), Value::Float(1.0)),
            (text("2018-01-02"), Value::Float(2.0), Value::Float(4.0)),
        ]);
        let series = build_price_series(&table, &PriceColumns::default(), DateErrorPolicy::Fail).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.missing_dates(), 1);
    }

    #[test]
    fn unparseable_date_policy() {
        let table = price_table(vec![
            (text("2018-01-01"), Value::Float(1.0), Value::Float(3.0)),
            (text("yesterday"), Value::Float(1.0), Value::Float(3.0)),
        ]);

        let err = build_price_series(&table, &PriceColumns::default(), DateErrorPolicy::Fail).unwrap_err();
        assert_eq!(
            err.to_string(),
            "column 'dateUpdated', row 2: cannot parse 'yesterday' as timestamp"
        );

        let series = build_price_series(&table, &PriceColumns::default(), DateErrorPolicy::Drop).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.unparseable_dates(), 1);
    }

    #[test]
    fn text_amount_is_an_error() {
        let table = price_table(vec![(text("2018-01-01"), text("cheap"), Value::Float(3.0))]);
        let err = build_price_series(&table, &PriceColumns::default(), DateErrorPolicy::Drop).unwrap_err();
        assert!(matches!(err, ForecastError::ParseValue { expected: "number", row: 1, .. }));
    }

    #[test]
    fn custom_columns_must_exist() {
        let table = price_table(vec![]);
        let columns = PriceColumns {
            date: "event_time".to_string(),
            ..Default::default()
        };
        let err = build_price_series(&table, &columns, DateErrorPolicy::Fail).unwrap_err();
        assert!(matches!(err, ForecastError::MissingColumn { ref column, .. } if column == "event_time"));
    }
}
