//! Calendar-week aggregation of irregular observations.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Weekly bucketing anchored on the weekday that closes each week.
///
/// `W-SUN` (the default) puts Monday through Sunday into one bucket and labels
/// it with the Sunday at midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleRule {
    week_end: Weekday,
}

impl Default for ResampleRule {
    fn default() -> Self {
        Self::weekly(Weekday::Sun)
    }
}

impl ResampleRule {
    pub fn weekly(week_end: Weekday) -> Self {
        Self { week_end }
    }

    pub fn week_end(&self) -> Weekday {
        self.week_end
    }

    /// Spacing between consecutive bucket labels.
    pub fn period(&self) -> Duration {
        Duration::days(7)
    }

    fn label_date(&self, date: NaiveDate) -> NaiveDate {
        let ahead = (self.week_end.num_days_from_monday() + 7
            - date.weekday().num_days_from_monday())
            % 7;
        date + Duration::days(i64::from(ahead))
    }

    /// Label of the bucket containing `ts`.
    ///
    /// # Example
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use pricecast::transform::ResampleRule;
    ///
    /// let rule = ResampleRule::default();
    /// // Wednesday lands in the week ending Sunday 2018-01-07
    /// let wed = Utc.with_ymd_and_hms(2018, 1, 3, 15, 30, 0).unwrap();
    /// assert_eq!(rule.bucket_label(wed), Utc.with_ymd_and_hms(2018, 1, 7, 0, 0, 0).unwrap());
    /// ```
    pub fn bucket_label(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = self.label_date(ts.date_naive());
        date.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Mean of the non-missing values in each bucket.
    ///
    /// Every week between the first and last bucket is emitted; weeks without
    /// a usable value are `NaN`. The result is labelled `avg_price` and
    /// carries a 7-day frequency.
    pub fn resample_mean<I>(&self, points: I) -> Result<TimeSeries>
    where
        I: IntoIterator<Item = (DateTime<Utc>, f64)>,
    {
        let mut buckets: BTreeMap<DateTime<Utc>, (f64, usize)> = BTreeMap::new();
        for (ts, value) in points {
            let entry = buckets.entry(self.bucket_label(ts)).or_insert((0.0, 0));
            if value.is_finite() {
                entry.0 += value;
                entry.1 += 1;
            }
        }

        let (first, last) = match (buckets.keys().next(), buckets.keys().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(ForecastError::EmptyData),
        };

        let mut timestamps = Vec::new();
        let mut values = Vec::new();
        let mut label = first;
        while label <= last {
            let mean = match buckets.get(&label) {
                Some(&(sum, count)) if count > 0 => sum / count as f64,
                _ => f64::NAN,
            };
            timestamps.push(label);
            values.push(mean);
            label += self.period();
        }

        debug!(weeks = timestamps.len(), occupied = buckets.len(), rule = %self, "resampled");
        Ok(TimeSeries::univariate(timestamps, values)?
            .with_label("avg_price")
            .with_frequency(self.period()))
    }
}

impl fmt::Display for ResampleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = match self.week_end {
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
            Weekday::Sat => "SAT",
            Weekday::Sun => "SUN",
        };
        write!(f, "W-{day}")
    }
}

impl FromStr for ResampleRule {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let rule = s.trim();
        if rule.eq_ignore_ascii_case("weekly") || rule.eq_ignore_ascii_case("w") {
            return Ok(Self::default());
        }

        let day = rule
            .strip_prefix("W-")
            .or_else(|| rule.strip_prefix("w-"))
            .ok_or_else(|| ForecastError::InvalidParameter(format!("unknown resample rule '{s}'")))?;
        let week_end = match day.to_ascii_uppercase().as_str() {
            "MON" => Weekday::Mon,
            "TUE" => Weekday::Tue,
            "WED" => Weekday::Wed,
            "THU" => Weekday::Thu,
            "FRI" => Weekday::Fri,
            "SAT" => Weekday::Sat,
            "SUN" => Weekday::Sun,
            _ => {
                return Err(ForecastError::InvalidParameter(format!(
                    "unknown resample rule '{s}'"
                )))
            }
        };
        Ok(Self::weekly(week_end))
    }
}

/// Carry the last observed value into later gaps. A leading gap stays missing.
pub fn forward_fill(series: &TimeSeries) -> Result<TimeSeries> {
    Ok(series.forward_filled())
}
