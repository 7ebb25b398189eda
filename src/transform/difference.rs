//! Differencing of timestamped series.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::arima::difference;

/// First difference `x[i] - x[i-1]`, keeping the timestamp of `x[i]`.
///
/// The first observation has no predecessor and is dropped, so the result is
/// one point shorter than the input.
pub fn first_difference(series: &TimeSeries) -> Result<TimeSeries> {
    if series.len() < 2 {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            got: series.len(),
        });
    }

    let values = difference(series.values(), 1);
    let timestamps = series.timestamps()[1..].to_vec();
    Ok(series.with_points(timestamps, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::arima::undifference;
    use chrono::{Duration, TimeZone, Utc};

    fn weekly(values: Vec<f64>) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2018, 1, 7, 0, 0, 0).unwrap();
        let ts = (0..values.len()).map(|i| base + Duration::weeks(i as i64)).collect();
        TimeSeries::univariate(ts, values).unwrap().with_label("avg_price")
    }

    #[test]
    fn drops_first_point_and_keeps_later_timestamps() {
        let series = weekly(vec![100.0, 102.0, 104.0, 106.0]);
        let diff = first_difference(&series).unwrap();

        assert_eq!(diff.values(), &[2.0, 2.0, 2.0]);
        assert_eq!(diff.timestamps(), &series.timestamps()[1..]);
        assert_eq!(diff.label(), Some("avg_price"));
    }

    #[test]
    fn cumulative_sum_restores_input() {
        let series = weekly(vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0]);
        let diff = first_difference(&series).unwrap();
        assert_eq!(undifference(series.values()[0], diff.values()), series.values());
    }

    #[test]
    fn needs_two_points() {
        let err = first_difference(&weekly(vec![1.0])).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { needed: 2, got: 1 }));
    }
}
