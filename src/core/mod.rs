//! Core data structures for time series forecasting.

mod forecast;
mod time_series;

pub use forecast::{Forecast, ForecastPoint, ForecastSeries};
pub use time_series::TimeSeries;
