//! TimeSeries data structure for regularly indexed observations.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};

/// A univariate time series with strictly increasing timestamps.
///
/// Missing observations are represented as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    label: Option<String>,
    frequency: Option<Duration>,
}

fn is_missing(v: f64) -> bool {
    v.is_nan() || v.is_infinite()
}

impl TimeSeries {
    /// Create a univariate series.
    ///
    /// Fails if the lengths differ or timestamps are not strictly increasing.
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }

        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(ForecastError::TimestampError(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }

        Ok(Self {
            timestamps,
            values,
            label: None,
            frequency: None,
        })
    }

    /// Attach a label (used as the series name in reports).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a known sampling frequency.
    pub fn with_frequency(mut self, frequency: Duration) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn frequency(&self) -> Option<Duration> {
        self.frequency
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Iterate over `(timestamp, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    pub fn has_missing_values(&self) -> bool {
        self.values.iter().any(|&v| is_missing(v))
    }

    /// Number of missing observations before the first valid one.
    pub fn leading_missing(&self) -> usize {
        self.values.iter().take_while(|&&v| is_missing(v)).count()
    }

    /// Copy without the leading run of missing observations.
    pub fn trim_leading_missing(&self) -> TimeSeries {
        let start = self.leading_missing();
        TimeSeries {
            timestamps: self.timestamps[start..].to_vec(),
            values: self.values[start..].to_vec(),
            label: self.label.clone(),
            frequency: self.frequency,
        }
    }

    /// Copy carrying the same metadata but new values on the given timestamps.
    pub(crate) fn with_points(&self, timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Self {
        TimeSeries {
            timestamps,
            values,
            label: self.label.clone(),
            frequency: self.frequency,
        }
    }

    /// Copy with each missing value replaced by the last valid one before it.
    /// A leading gap stays missing.
    pub fn forward_filled(&self) -> TimeSeries {
        let mut last_valid = None;
        let values = self
            .values
            .iter()
            .map(|&v| {
                if is_missing(v) {
                    last_valid.unwrap_or(v)
                } else {
                    last_valid = Some(v);
                    v
                }
            })
            .collect();
        self.with_points(self.timestamps.clone(), values)
    }
}
