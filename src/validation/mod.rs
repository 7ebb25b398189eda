//! Statistical tests used to decide how a series must be transformed before
//! modelling.
//!
//! # Example
//!
//! ```
//! use pricecast::validation::{adf_test, kpss_test, Stationarity};
//!
//! let series = vec![1.0, 1.2, 0.9, 1.1, 1.0, 0.95, 1.05, 1.0, 1.1, 0.9];
//! let adf = adf_test(&series, None).unwrap();
//! let kpss = kpss_test(&series, None).unwrap();
//! println!("ADF says {}, KPSS says {}", adf.verdict(0.05), kpss.verdict(0.05));
//! assert_eq!(kpss.verdict(0.05), Stationarity::Stationary);
//! ```

pub mod stationarity;

pub use stationarity::{
    adf_critical_values, adf_test, kpss_test, mackinnon_p_value, ndiffs, CriticalValues,
    NullHypothesis, Stationarity, StationarityResult,
};
