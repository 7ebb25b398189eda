//! Forecast result structures.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};

/// Point predictions with optional prediction interval bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    point: Vec<f64>,
    lower: Option<Vec<f64>>,
    upper: Option<Vec<f64>>,
    level: Option<f64>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions only.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: values,
            ..Self::default()
        }
    }

    /// Create a forecast with prediction intervals at the given confidence level.
    pub fn from_values_with_intervals(
        values: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        level: f64,
    ) -> Self {
        Self {
            point: values,
            lower: Some(lower),
            upper: Some(upper),
            level: Some(level),
        }
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    pub fn point(&self) -> &[f64] {
        &self.point
    }

    pub fn lower(&self) -> Option<&[f64]> {
        self.lower.as_deref()
    }

    pub fn upper(&self) -> Option<&[f64]> {
        self.upper.as_deref()
    }

    /// Confidence level of the intervals, if any.
    pub fn level(&self) -> Option<f64> {
        self.level
    }

    pub fn has_intervals(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }

    /// Attach calendar timestamps: step `i` lands at `after + (i + 1) * step`.
    pub fn with_timestamps(&self, after: DateTime<Utc>, step: Duration) -> Result<ForecastSeries> {
        if step <= Duration::zero() {
            return Err(ForecastError::InvalidParameter(
                "forecast step must be positive".to_string(),
            ));
        }

        let (lower, upper) = match (self.lower(), self.upper()) {
            (Some(l), Some(u)) => (l, u),
            _ => {
                return Err(ForecastError::InvalidParameter(
                    "forecast has no prediction intervals".to_string(),
                ))
            }
        };

        let points = self
            .point
            .iter()
            .zip(lower.iter().zip(upper.iter()))
            .enumerate()
            .map(|(i, (&forecast, (&lower, &upper)))| ForecastPoint {
                timestamp: after + step * (i as i32 + 1),
                forecast,
                lower,
                upper,
            })
            .collect();

        Ok(ForecastSeries {
            points,
            level: self.level.unwrap_or(f64::NAN),
        })
    }
}

/// One dated forecast step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub forecast: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Dated forecast with its confidence band.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    points: Vec<ForecastPoint>,
    level: f64,
}

impl ForecastSeries {
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Confidence level of the band (e.g. 0.95).
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.points.iter().map(|p| p.timestamp)
    }

    /// Write `timestamp,forecast,lower,upper` rows.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> std::result::Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["timestamp", "forecast", "lower", "upper"])?;
        for p in &self.points {
            wtr.write_record([
                p.timestamp.format("%Y-%m-%d").to_string(),
                p.forecast.to_string(),
                p.lower.to_string(),
                p.upper.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}
