//! From a cleaned price table to a regular weekly series.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use pricecast::transform::{first_difference, forward_fill, ResampleRule};
//!
//! let start = Utc.with_ymd_and_hms(2018, 1, 1, 12, 0, 0).unwrap();
//! let points = vec![
//!     (start, 10.0),
//!     (start + Duration::days(2), 12.0),
//!     (start + Duration::days(15), 20.0),
//! ];
//!
//! let weekly = ResampleRule::default().resample_mean(points).unwrap();
//! assert_eq!(weekly.len(), 3);
//!
//! let filled = forward_fill(&weekly).unwrap();
//! assert_eq!(filled.values(), &[11.0, 11.0, 20.0]);
//!
//! let diff = first_difference(&filled).unwrap();
//! assert_eq!(diff.values(), &[0.0, 9.0]);
//! ```

mod difference;
mod resample;
mod series_builder;

pub use difference::first_difference;
pub use resample::{forward_fill, ResampleRule};
pub use series_builder::{
    build_price_series, parse_timestamp, DateErrorPolicy, PriceColumns, PricePoint, PriceSeries,
};
