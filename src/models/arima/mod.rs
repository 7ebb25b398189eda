//! ARIMA (Autoregressive Integrated Moving Average) models.
//!
//! This module provides:
//! - ARIMA(p, d, q) with an optional constant, fitted by conditional sum of squares
//! - AutoARIMA for stepwise or exhaustive order selection

mod auto_arima;
mod diff;
mod model;

pub use auto_arima::{AutoARIMA, AutoARIMAConfig};
pub use diff::{difference, integrate, undifference};
pub use model::{ARIMASpec, InformationCriterion, ARIMA};
