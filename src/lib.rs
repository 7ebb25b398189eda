//! # pricecast
//!
//! Weekly average-price forecasting.
//!
//! Loads two CSV datasets, removes duplicate rows, derives the average of the
//! minimum and maximum price, resamples it to calendar weeks, tests the result
//! for a unit root (ADF), differences it when needed and forecasts with a
//! stepwise AutoARIMA search.
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use pricecast::prelude::*;
//!
//! let start = Utc.with_ymd_and_hms(2018, 1, 7, 0, 0, 0).unwrap();
//! let timestamps = (0..30).map(|i| start + Duration::weeks(i)).collect();
//! let weekly = TimeSeries::univariate(timestamps, vec![100.0; 30])
//!     .unwrap()
//!     .with_frequency(Duration::days(7));
//!
//! let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
//! let output = pipeline.forecast_weekly(&weekly).unwrap();
//! assert_eq!(output.forecast.len(), 4);
//! assert!(!output.differenced);
//! ```

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::type_complexity)]

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::core::{Forecast, ForecastSeries, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::arima::{AutoARIMA, AutoARIMAConfig, ARIMA};
    pub use crate::models::Forecaster;
    pub use crate::pipeline::{Pipeline, PipelineOutput};
    pub use crate::validation::adf_test;
}
