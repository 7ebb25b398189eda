//! Automatic ARIMA order selection.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::model::{ARIMASpec, InformationCriterion, ARIMA};
use crate::models::Forecaster;
use crate::validation::ndiffs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

/// Significance level of the KPSS tests that choose `d`.
const KPSS_ALPHA: f64 = 0.05;

/// Fewest observations the search accepts.
const MIN_OBSERVATIONS: usize = 4;

/// Configuration for AutoARIMA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoARIMAConfig {
    pub information_criterion: InformationCriterion,
    /// Use stepwise search (faster) vs exhaustive.
    pub stepwise: bool,
    /// AR order of the first stepwise candidate.
    pub start_p: usize,
    /// MA order of the first stepwise candidate.
    pub start_q: usize,
    pub max_p: usize,
    pub max_q: usize,
    /// Upper bound for the KPSS-chosen differencing order.
    pub max_d: usize,
    /// Upper bound for `p + q`.
    pub max_order: usize,
    /// Fixed differencing order; chosen by KPSS tests when absent.
    pub d: Option<usize>,
    /// Consider models with a constant term (only when `d <= 1`).
    pub allow_constant: bool,
    /// Maximum number of candidate fits in stepwise mode, starting models included.
    pub max_steps: usize,
}

impl Default for AutoARIMAConfig {
    fn default() -> Self {
        Self {
            information_criterion: InformationCriterion::Aicc,
            stepwise: true,
            start_p: 2,
            start_q: 2,
            max_p: 5,
            max_q: 5,
            max_d: 2,
            max_order: 5,
            d: None,
            allow_constant: true,
            max_steps: 100,
        }
    }
}

impl AutoARIMAConfig {
    /// Set maximum non-seasonal orders.
    pub fn with_max_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_d = max_d;
        self.max_q = max_q;
        self
    }

    pub fn with_criterion(mut self, criterion: InformationCriterion) -> Self {
        self.information_criterion = criterion;
        self
    }

    /// Fix the differencing order instead of testing for it.
    pub fn with_d(mut self, d: usize) -> Self {
        self.d = Some(d);
        self
    }

    /// Use exhaustive search instead of stepwise.
    pub fn exhaustive(mut self) -> Self {
        self.stepwise = false;
        self
    }

    /// Check the order bounds for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.start_p > self.max_p || self.start_q > self.max_q {
            return Err(ForecastError::InvalidParameter(format!(
                "start orders ({}, {}) exceed maximum orders ({}, {})",
                self.start_p, self.start_q, self.max_p, self.max_q
            )));
        }
        if let Some(d) = self.d {
            if d > self.max_d {
                return Err(ForecastError::InvalidParameter(format!(
                    "fixed d = {d} exceeds max_d = {}",
                    self.max_d
                )));
            }
        }
        if self.max_steps == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_steps must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn admits(&self, p: usize, q: usize) -> bool {
        p <= self.max_p && q <= self.max_q && p + q <= self.max_order
    }
}

/// Automatic ARIMA selection.
///
/// Chooses `d` with repeated KPSS tests, then searches `(p, q)` and the
/// constant term either stepwise (Hyndman-Khandakar) or exhaustively,
/// keeping the candidate with the lowest information criterion. Candidates
/// that fail to fit or converge are skipped.
#[derive(Debug, Clone)]
pub struct AutoARIMA {
    config: AutoARIMAConfig,
    selected_model: Option<ARIMA>,
    model_scores: Vec<(ARIMASpec, f64)>,
    candidates_tried: usize,
}

/// Cache of fitted candidates; `None` marks a failed fit.
type Fitted = HashMap<ARIMASpec, Option<f64>>;

impl AutoARIMA {
    pub fn new() -> Self {
        Self::with_config(AutoARIMAConfig::default())
    }

    pub fn with_config(config: AutoARIMAConfig) -> Self {
        Self {
            config,
            selected_model: None,
            model_scores: Vec::new(),
            candidates_tried: 0,
        }
    }

    pub fn config(&self) -> &AutoARIMAConfig {
        &self.config
    }

    /// Selected `(p, d, q)`.
    pub fn selected_order(&self) -> Option<(usize, usize, usize)> {
        self.selected_spec().map(|s| (s.p, s.d, s.q))
    }

    pub fn selected_spec(&self) -> Option<ARIMASpec> {
        self.selected_model.as_ref().map(ARIMA::spec)
    }

    pub fn selected_model(&self) -> Option<&ARIMA> {
        self.selected_model.as_ref()
    }

    /// Successful candidates sorted by criterion, best first.
    pub fn model_scores(&self) -> &[(ARIMASpec, f64)] {
        &self.model_scores
    }

    /// Number of distinct candidates fitted in the last search.
    pub fn candidates_tried(&self) -> usize {
        self.candidates_tried
    }

    /// Fit one candidate, logging the outcome.
    fn evaluate(&self, series: &TimeSeries, spec: ARIMASpec) -> Option<(ARIMA, f64)> {
        let started = Instant::now();
        let mut model = ARIMA::from_spec(spec);
        let ic = self.config.information_criterion;

        let outcome = model.fit(series).and_then(|()| {
            model
                .criterion(ic)
                .filter(|score| score.is_finite())
                .ok_or_else(|| {
                    ForecastError::ComputationError(format!("non-finite {ic}"))
                })
        });
        let elapsed_ms = started.elapsed().as_secs_f64() * 1e3;

        match outcome {
            Ok(score) => {
                info!(model = %spec, criterion = %ic, score, elapsed_ms, "fitted candidate");
                Some((model, score))
            }
            Err(e) => {
                debug!(model = %spec, error = %e, elapsed_ms, "skipped candidate");
                None
            }
        }
    }

    /// Fit `spec` unless it was already tried; returns its score on success.
    fn try_candidate(
        &self,
        series: &TimeSeries,
        spec: ARIMASpec,
        fitted: &mut Fitted,
        best: &mut Option<(ARIMA, f64)>,
    ) -> Option<f64> {
        if let Some(score) = fitted.get(&spec) {
            return *score;
        }
        let result = self.evaluate(series, spec);
        let score = result.as_ref().map(|(_, score)| *score);
        fitted.insert(spec, score);

        if let Some((model, score)) = result {
            if best.as_ref().map_or(true, |(_, best)| score < *best) {
                *best = Some((model, score));
            }
        }
        score
    }

    fn stepwise_search(&self, series: &TimeSeries, d: usize, constant: bool) -> (Fitted, Option<(ARIMA, f64)>) {
        let cfg = &self.config;
        let mut fitted = Fitted::new();
        let mut best: Option<(ARIMA, f64)> = None;

        let start_p = cfg.start_p.min(cfg.max_p);
        let start_q = cfg.start_q.min(cfg.max_q);
        let mut initial = vec![
            ARIMASpec::new(start_p, d, start_q).with_constant(constant),
            ARIMASpec::new(0, d, 0).with_constant(constant),
        ];
        if cfg.max_p >= 1 {
            initial.push(ARIMASpec::new(1, d, 0).with_constant(constant));
        }
        if cfg.max_q >= 1 {
            initial.push(ARIMASpec::new(0, d, 1).with_constant(constant));
        }
        if constant {
            initial.push(ARIMASpec::new(0, d, 0).with_constant(false));
        }
        for spec in initial {
            if fitted.len() >= cfg.max_steps {
                break;
            }
            if cfg.admits(spec.p, spec.q) {
                self.try_candidate(series, spec, &mut fitted, &mut best);
            }
        }

        'search: while fitted.len() < cfg.max_steps {
            let Some(current) = best.as_ref().map(|(m, score)| (m.spec(), *score)) else {
                break;
            };
            let (spec, score) = current;
            let (p, q) = (spec.p as isize, spec.q as isize);

            let moves = [
                (-1, 0),
                (1, 0),
                (0, -1),
                (0, 1),
                (-1, -1),
                (1, 1),
                (-1, 1),
                (1, -1),
            ];
            let mut neighbours: Vec<ARIMASpec> = moves
                .iter()
                .filter_map(|&(dp, dq)| {
                    let (np, nq) = (p + dp, q + dq);
                    (np >= 0 && nq >= 0 && cfg.admits(np as usize, nq as usize))
                        .then(|| ARIMASpec { p: np as usize, q: nq as usize, ..spec })
                })
                .collect();
            if constant {
                neighbours.push(spec.with_constant(!spec.with_constant));
            }

            for neighbour in neighbours {
                if fitted.len() >= cfg.max_steps {
                    break 'search;
                }
                if fitted.contains_key(&neighbour) {
                    continue;
                }
                if let Some(candidate) = self.try_candidate(series, neighbour, &mut fitted, &mut best) {
                    if candidate < score {
                        continue 'search;
                    }
                }
            }
            break;
        }

        (fitted, best)
    }

    fn exhaustive_search(&self, series: &TimeSeries, d: usize, constant: bool) -> (Fitted, Option<(ARIMA, f64)>) {
        let cfg = &self.config;
        let mut fitted = Fitted::new();
        let mut best = None;
        let constants: &[bool] = if constant { &[true, false] } else { &[false] };

        for p in 0..=cfg.max_p {
            for q in 0..=cfg.max_q {
                if !cfg.admits(p, q) {
                    continue;
                }
                for &with_constant in constants {
                    let spec = ARIMASpec::new(p, d, q).with_constant(with_constant);
                    self.try_candidate(series, spec, &mut fitted, &mut best);
                }
            }
        }
        (fitted, best)
    }
}

impl Default for AutoARIMA {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for AutoARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.config.validate()?;
        if series.has_missing_values() {
            return Err(ForecastError::MissingValues);
        }
        let values = series.values();
        if values.len() < MIN_OBSERVATIONS {
            return Err(ForecastError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                got: values.len(),
            });
        }

        let d = match self.config.d {
            Some(d) => d,
            None => ndiffs(values, KPSS_ALPHA, self.config.max_d)?,
        };
        let constant = self.config.allow_constant && d <= 1;
        info!(
            d,
            stepwise = self.config.stepwise,
            criterion = %self.config.information_criterion,
            "searching ARIMA orders"
        );

        let (fitted, best) = if self.config.stepwise {
            self.stepwise_search(series, d, constant)
        } else {
            self.exhaustive_search(series, d, constant)
        };

        self.candidates_tried = fitted.len();
        self.model_scores = fitted
            .into_iter()
            .filter_map(|(spec, score)| score.map(|s| (spec, s)))
            .collect();
        self.model_scores.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.num_params().cmp(&b.0.num_params()))
        });

        let (model, score) = best.ok_or(ForecastError::ModelSearchExhausted {
            candidates: self.candidates_tried,
        })?;
        info!(
            model = %model.spec(),
            criterion = %self.config.information_criterion,
            score,
            candidates = self.candidates_tried,
            "selected model"
        );
        self.selected_model = Some(model);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.selected_model
            .as_ref()
            .ok_or(ForecastError::FitRequired)?
            .predict(horizon)
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.selected_model
            .as_ref()
            .ok_or(ForecastError::FitRequired)?
            .predict_with_intervals(horizon, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.selected_model.as_ref()?.fitted_values()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.selected_model.as_ref()?.residuals()
    }

    fn name(&self) -> &str {
        "AutoARIMA"
    }
}
