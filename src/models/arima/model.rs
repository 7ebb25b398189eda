//! Non-seasonal ARIMA model fitted by conditional sum of squares.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{difference, integrate};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{mean, quantile_normal};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Criterion used to compare fitted models. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InformationCriterion {
    Aic,
    /// Small-sample corrected AIC.
    #[default]
    Aicc,
    Bic,
}

impl fmt::Display for InformationCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InformationCriterion::Aic => write!(f, "AIC"),
            InformationCriterion::Aicc => write!(f, "AICc"),
            InformationCriterion::Bic => write!(f, "BIC"),
        }
    }
}

/// ARIMA model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ARIMASpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
    /// Whether the differenced series has a non-zero mean.
    pub with_constant: bool,
}

impl ARIMASpec {
    /// Specification with a constant term.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            with_constant: true,
        }
    }

    pub fn with_constant(mut self, with_constant: bool) -> Self {
        self.with_constant = with_constant;
        self
    }

    /// Number of estimated mean parameters (AR + MA + constant).
    pub fn num_coefficients(&self) -> usize {
        self.p + self.q + usize::from(self.with_constant)
    }

    /// Number of parameters counted by the information criteria, including
    /// the innovation variance.
    pub fn num_params(&self) -> usize {
        self.num_coefficients() + 1
    }
}

impl Default for ARIMASpec {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl fmt::Display for ARIMASpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.with_constant {
            write!(f, " with constant")?;
        }
        Ok(())
    }
}

/// ARIMA forecasting model.
///
/// The `d`-times differenced series `x` follows
/// `x_t = mu + sum(phi_i * (x_{t-i} - mu)) + e_t + sum(theta_j * e_{t-j})`,
/// with `mu = 0` when the specification has no constant. Coefficients are
/// estimated by minimising the conditional sum of squares, conditioning on
/// the first `p` observations and zero pre-sample innovations.
#[derive(Debug, Clone)]
pub struct ARIMA {
    spec: ARIMASpec,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    mean: f64,
    original: Option<Vec<f64>>,
    differenced: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma2: Option<f64>,
    log_likelihood: Option<f64>,
    n_eff: usize,
}

impl ARIMA {
    /// ARIMA(p, d, q) with a constant term.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::from_spec(ARIMASpec::new(p, d, q))
    }

    pub fn from_spec(spec: ARIMASpec) -> Self {
        Self {
            spec,
            ar_coefficients: vec![],
            ma_coefficients: vec![],
            mean: 0.0,
            original: None,
            differenced: None,
            fitted: None,
            residuals: None,
            sigma2: None,
            log_likelihood: None,
            n_eff: 0,
        }
    }

    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Mean of the differenced series (zero without a constant).
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Innovation variance estimate.
    pub fn sigma2(&self) -> Option<f64> {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> Option<f64> {
        self.log_likelihood
    }

    pub fn aic(&self) -> Option<f64> {
        let k = self.spec.num_params() as f64;
        self.log_likelihood.map(|ll| -2.0 * ll + 2.0 * k)
    }

    /// AICc; infinite when there are too few observations for the correction.
    pub fn aicc(&self) -> Option<f64> {
        let k = self.spec.num_params() as f64;
        let denom = self.n_eff as f64 - k - 1.0;
        self.aic().map(|aic| {
            if denom > 0.0 {
                aic + 2.0 * k * (k + 1.0) / denom
            } else {
                f64::INFINITY
            }
        })
    }

    pub fn bic(&self) -> Option<f64> {
        let k = self.spec.num_params() as f64;
        let n = self.n_eff as f64;
        self.log_likelihood.map(|ll| -2.0 * ll + k * n.ln())
    }

    pub fn criterion(&self, ic: InformationCriterion) -> Option<f64> {
        match ic {
            InformationCriterion::Aic => self.aic(),
            InformationCriterion::Aicc => self.aicc(),
            InformationCriterion::Bic => self.bic(),
        }
    }

    /// Split a flat parameter vector into `(mean, ar, ma)`.
    fn unpack<'a>(&self, params: &'a [f64]) -> (f64, &'a [f64], &'a [f64]) {
        let offset = usize::from(self.spec.with_constant);
        let mean = if self.spec.with_constant { params[0] } else { 0.0 };
        let (ar, ma) = params[offset..].split_at(self.spec.p);
        (mean, ar, ma)
    }

    /// One-step prediction errors; entries before `p` are zero.
    fn innovations(x: &[f64], mean: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
        let p = ar.len();
        let mut residuals = vec![0.0; x.len()];
        for t in p..x.len() {
            let mut pred = mean;
            for (i, phi) in ar.iter().enumerate() {
                pred += phi * (x[t - 1 - i] - mean);
            }
            for (j, theta) in ma.iter().enumerate().take(t) {
                pred += theta * residuals[t - 1 - j];
            }
            residuals[t] = x[t] - pred;
        }
        residuals
    }

    fn css(x: &[f64], mean: f64, ar: &[f64], ma: &[f64]) -> f64 {
        let css: f64 = Self::innovations(x, mean, ar, ma)[ar.len()..]
            .iter()
            .map(|e| e * e)
            .sum();
        if css.is_finite() {
            css
        } else {
            f64::INFINITY
        }
    }

    fn estimate_parameters(&mut self, x: &[f64]) -> Result<()> {
        let p = self.spec.p;
        let q = self.spec.q;
        let x_mean = mean(x);

        let mut initial = Vec::with_capacity(self.spec.num_coefficients());
        let mut bounds = Vec::with_capacity(self.spec.num_coefficients());
        if self.spec.with_constant {
            initial.push(x_mean);
            bounds.push((f64::NEG_INFINITY, f64::INFINITY));
        }
        for i in 0..p + q {
            let lag = if i < p { i } else { i - p };
            initial.push(0.1 / (lag + 1) as f64);
            bounds.push((-0.99, 0.99));
        }

        if initial.is_empty() {
            self.mean = 0.0;
            return Ok(());
        }
        if p + q == 0 {
            self.mean = x_mean;
            return Ok(());
        }

        let config = NelderMeadConfig {
            max_iter: 1000 + 400 * initial.len(),
            ..Default::default()
        };
        let result = nelder_mead(
            |params| {
                let (mean, ar, ma) = self.unpack(params);
                Self::css(x, mean, ar, ma)
            },
            &initial,
            Some(&bounds),
            config,
        );

        if !result.converged {
            return Err(ForecastError::ComputationError(format!(
                "{} did not converge after {} iterations",
                self.spec, result.iterations
            )));
        }

        let (mean, ar, ma) = self.unpack(&result.optimal_point);
        self.mean = mean;
        self.ar_coefficients = ar.to_vec();
        self.ma_coefficients = ma.to_vec();
        Ok(())
    }

    /// Psi weights of the integrated model, `psi_0 = 1`.
    fn psi_weights(&self, horizon: usize) -> Vec<f64> {
        // phi(B) * (1 - B)^d as coefficients of B^0, B^1, ...
        let mut poly: Vec<f64> = std::iter::once(1.0)
            .chain(self.ar_coefficients.iter().map(|phi| -phi))
            .collect();
        for _ in 0..self.spec.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        let phi_star: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

        let mut psi = vec![0.0; horizon];
        if horizon == 0 {
            return psi;
        }
        psi[0] = 1.0;
        for j in 1..horizon {
            let mut value = self.ma_coefficients.get(j - 1).copied().unwrap_or(0.0);
            for (i, phi) in phi_star.iter().enumerate().take(j) {
                value += phi * psi[j - 1 - i];
            }
            psi[j] = value;
        }
        psi
    }
}

impl Default for ARIMA {
    fn default() -> Self {
        Self::from_spec(ARIMASpec::default())
    }
}

impl Forecaster for ARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        if series.has_missing_values() {
            return Err(ForecastError::MissingValues);
        }
        let values = series.values();
        let min_len = self.spec.d + self.spec.p + self.spec.q + 2;
        if values.len() < min_len {
            return Err(ForecastError::InsufficientData {
                needed: min_len,
                got: values.len(),
            });
        }

        let x = difference(values, self.spec.d);
        self.ar_coefficients.clear();
        self.ma_coefficients.clear();
        self.estimate_parameters(&x)?;

        let residuals = Self::innovations(&x, self.mean, &self.ar_coefficients, &self.ma_coefficients);
        let p = self.spec.p;
        let fitted = x
            .iter()
            .zip(&residuals)
            .enumerate()
            .map(|(t, (v, e))| if t < p { f64::NAN } else { v - e })
            .collect();

        let n_eff = x.len() - p;
        let css: f64 = residuals[p..].iter().map(|e| e * e).sum();
        let floor = 1e-10 * (1.0 + mean(&x).powi(2));
        let sigma2 = (css / n_eff as f64).max(floor);
        if !sigma2.is_finite() {
            return Err(ForecastError::ComputationError(format!(
                "{} produced a non-finite residual variance",
                self.spec
            )));
        }

        self.n_eff = n_eff;
        self.sigma2 = Some(sigma2);
        self.log_likelihood = Some(
            -0.5 * n_eff as f64 * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0),
        );
        self.original = Some(values.to_vec());
        self.differenced = Some(x);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let original = self.original.as_ref().ok_or(ForecastError::FitRequired)?;
        let x = self.differenced.as_ref().ok_or(ForecastError::FitRequired)?;
        let residuals = self.residuals.as_ref().ok_or(ForecastError::FitRequired)?;

        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "forecast horizon must be positive".to_string(),
            ));
        }

        let mut extended = x.clone();
        let mut innovations = residuals.clone();
        for _ in 0..horizon {
            let t = extended.len();
            let mut pred = self.mean;
            for (i, phi) in self.ar_coefficients.iter().enumerate().take(t) {
                pred += phi * (extended[t - 1 - i] - self.mean);
            }
            for (j, theta) in self.ma_coefficients.iter().enumerate().take(t) {
                pred += theta * innovations[t - 1 - j];
            }
            extended.push(pred);
            innovations.push(0.0);
        }

        let ahead = &extended[x.len()..];
        Ok(Forecast::from_values(integrate(ahead, original, self.spec.d)))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        if !(level > 0.0 && level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence level must lie in (0, 1), got {level}"
            )));
        }
        let forecast = self.predict(horizon)?;
        let sigma2 = self.sigma2.ok_or(ForecastError::FitRequired)?;
        let z = quantile_normal((1.0 + level) / 2.0);

        let mut cumulative = 0.0;
        let (lower, upper) = self
            .psi_weights(horizon)
            .iter()
            .zip(forecast.point())
            .map(|(psi, point)| {
                cumulative += psi * psi;
                let half_width = z * (sigma2 * cumulative).sqrt();
                (point - half_width, point + half_width)
            })
            .unzip();

        Ok(Forecast::from_values_with_intervals(
            forecast.point().to_vec(),
            lower,
            upper,
            level,
        ))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "ARIMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn weekly_series(values: Vec<f64>) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 7, 0, 0, 0).unwrap();
        let timestamps = (0..values.len())
            .map(|i| base + Duration::weeks(i as i64))
            .collect();
        TimeSeries::univariate(timestamps, values).unwrap()
    }

    #[test]
    fn constant_only_model_forecasts_the_mean() {
        let ts = weekly_series(vec![100.0; 52]);
        let mut model = ARIMA::new(0, 0, 0);
        model.fit(&ts).unwrap();

        assert_eq!(model.mean(), 100.0);
        let forecast = model.predict_with_intervals(4, 0.95).unwrap();
        for (i, point) in forecast.point().iter().enumerate() {
            assert_relative_eq!(*point, 100.0, epsilon = 1e-9);
            let width = forecast.upper().unwrap()[i] - forecast.lower().unwrap()[i];
            assert!(width > 0.0);
        }
    }

    #[test]
    fn ar1_coefficient_is_recovered() {
        let mut values = vec![0.0];
        let mut state: u64 = 42;
        for i in 1..300 {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let shock = (state >> 33) as f64 / 2f64.powi(31) - 0.5;
            values.push(0.7 * values[i - 1] + shock);
        }
        let mut model = ARIMA::from_spec(ARIMASpec::new(1, 0, 0).with_constant(false));
        model.fit(&weekly_series(values)).unwrap();

        assert_relative_eq!(model.ar_coefficients()[0], 0.7, epsilon = 0.1);
        assert!(model.ma_coefficients().is_empty());
    }

    #[test]
    fn ar1_without_constant_matches_least_squares() {
        let mut values = vec![0.0];
        let mut state: u64 = 42;
        for i in 1..300 {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let shock = (state >> 33) as f64 / 2f64.powi(31) - 0.5;
            values.push(0.7 * values[i - 1] + shock);
        }
        let cross: f64 = values.windows(2).map(|w| w[0] * w[1]).sum();
        let lagged: f64 = values[..values.len() - 1].iter().map(|x| x * x).sum();

        let mut model = ARIMA::from_spec(ARIMASpec::new(1, 0, 0).with_constant(false));
        model.fit(&weekly_series(values)).unwrap();

        assert_relative_eq!(model.ar_coefficients()[0], cross / lagged, epsilon = 1e-3);
    }

    #[test]
    fn drift_model_extends_trend() {
        let values: Vec<f64> = (0..40).map(|i| 10.0 + 2.0 * i as f64).collect();
        let mut model = ARIMA::new(0, 1, 0);
        model.fit(&weekly_series(values)).unwrap();

        let forecast = model.predict(3).unwrap();
        assert_relative_eq!(forecast.point()[0], 90.0, epsilon = 1e-9);
        assert_relative_eq!(forecast.point()[2], 94.0, epsilon = 1e-9);
    }

    #[test]
    fn random_walk_intervals_widen_with_sqrt_horizon() {
        let values: Vec<f64> = (0..30).map(|i| ((i * 7) % 5) as f64).collect();
        let mut model = ARIMA::from_spec(ARIMASpec::new(0, 1, 0).with_constant(false));
        model.fit(&weekly_series(values)).unwrap();

        let forecast = model.predict_with_intervals(4, 0.95).unwrap();
        let widths: Vec<f64> = forecast
            .upper()
            .unwrap()
            .iter()
            .zip(forecast.lower().unwrap())
            .map(|(u, l)| u - l)
            .collect();
        assert_relative_eq!(widths[3] / widths[0], 2.0, epsilon = 1e-9);
        assert_eq!(forecast.level(), Some(0.95));
    }

    #[test]
    fn psi_weights_match_closed_forms() {
        let mut model = ARIMA::from_spec(ARIMASpec::new(1, 0, 1));
        model.ar_coefficients = vec![0.5];
        model.ma_coefficients = vec![0.3];
        // ARMA(1,1): psi_1 = phi + theta, psi_j = phi * psi_{j-1}
        let psi = model.psi_weights(4);
        assert_relative_eq!(psi[0], 1.0);
        assert_relative_eq!(psi[1], 0.8, epsilon = 1e-12);
        assert_relative_eq!(psi[2], 0.4, epsilon = 1e-12);
        assert_relative_eq!(psi[3], 0.2, epsilon = 1e-12);

        let integrated = ARIMA::from_spec(ARIMASpec::new(0, 1, 0));
        assert_eq!(integrated.psi_weights(3), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn information_criteria_are_consistent() {
        let values: Vec<f64> = (0..50).map(|i| 10.0 + (i as f64 * 0.3).sin()).collect();
        let mut model = ARIMA::new(1, 0, 1);
        model.fit(&weekly_series(values)).unwrap();

        let aic = model.aic().unwrap();
        assert!(model.aicc().unwrap() > aic);
        assert_eq!(model.criterion(InformationCriterion::Aic), Some(aic));
        assert_eq!(model.criterion(InformationCriterion::Bic), model.bic());
    }

    #[test]
    fn rejects_short_or_gappy_input() {
        let mut model = ARIMA::new(2, 1, 1);
        assert!(matches!(
            model.fit(&weekly_series(vec![1.0, 2.0, 3.0])),
            Err(ForecastError::InsufficientData { needed: 6, got: 3 })
        ));

        let mut model = ARIMA::new(0, 0, 0);
        assert!(matches!(
            model.fit(&weekly_series(vec![1.0, f64::NAN, 3.0, 4.0])),
            Err(ForecastError::MissingValues)
        ));
    }

    #[test]
    fn prediction_preconditions() {
        let model = ARIMA::new(1, 1, 1);
        assert!(matches!(model.predict(5), Err(ForecastError::FitRequired)));
        assert!(!model.is_fitted());

        let mut model = ARIMA::new(0, 0, 0);
        model.fit(&weekly_series(vec![1.0, 2.0, 3.0, 2.0])).unwrap();
        assert!(matches!(
            model.predict(0),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(model.predict_with_intervals(2, 1.5).is_err());
    }

    #[test]
    fn spec_display_and_counts() {
        let spec = ARIMASpec::new(2, 1, 3);
        assert_eq!(spec.num_params(), 7);
        assert_eq!(spec.to_string(), "ARIMA(2,1,3) with constant");
        let bare = spec.with_constant(false);
        assert_eq!(bare.num_coefficients(), 5);
        assert_eq!(bare.to_string(), "ARIMA(2,1,3)");
        assert_eq!(InformationCriterion::default().to_string(), "AICc");
    }
}
