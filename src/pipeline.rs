//! The end-to-end forecasting run.
//!
//! Stages run strictly in order and each returns a fresh value:
//! load, deduplicate, build the price series, resample weekly, forward-fill,
//! test for a unit root, difference when needed, select and fit an ARIMA
//! model, forecast.

use crate::config::PipelineConfig;
use crate::core::{ForecastSeries, TimeSeries};
use crate::data::{drop_duplicates, load_csv, Table};
use crate::error::{ForecastError, Result};
use crate::models::arima::{ARIMASpec, AutoARIMA};
use crate::models::Forecaster;
use crate::transform::{build_price_series, first_difference, forward_fill};
use crate::validation::{adf_test, Stationarity, StationarityResult};
use tracing::{info, warn};

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Forward-filled weekly averages.
    pub weekly: TimeSeries,
    /// ADF result on `weekly`.
    pub stationarity: StationarityResult,
    /// Verdict at the configured significance threshold.
    pub verdict: Stationarity,
    /// Whether `stationary` is the first difference of `weekly`.
    pub differenced: bool,
    /// The series the model was fitted on.
    pub stationary: TimeSeries,
    pub model: ARIMASpec,
    /// Successful candidates, best first.
    pub model_scores: Vec<(ARIMASpec, f64)>,
    pub forecast: ForecastSeries,
}

/// Runs the pipeline for one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validates `config` up front.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load both datasets and run every stage.
    pub fn run(&self) -> Result<PipelineOutput> {
        let primary = load_csv(&self.config.dataset1_path)?;
        let prices = load_csv(&self.config.dataset2_path)?;
        self.run_tables(&primary, &prices)
    }

    /// Run on tables that are already in memory.
    ///
    /// `primary` is only deduplicated; the forecast comes from `prices`.
    pub fn run_tables(&self, primary: &Table, prices: &Table) -> Result<PipelineOutput> {
        let primary = deduplicate("dataset1", primary);
        let prices = deduplicate("dataset2", prices);
        info!(
            dataset1_rows = primary.len(),
            dataset2_rows = prices.len(),
            "datasets cleaned"
        );

        let series = build_price_series(&prices, &self.config.columns, self.config.date_errors)?;
        info!(points = series.len(), "built avg_price series");

        let rule = self.config.rule()?;
        let resampled = rule.resample_mean(series.avg_prices())?;
        let weekly = fill_gaps(&resampled)?;
        info!(weeks = weekly.len(), rule = %rule, "weekly series ready");

        self.forecast_weekly(&weekly)
    }

    /// Test, difference if needed, and forecast an already regular series.
    pub fn forecast_weekly(&self, weekly: &TimeSeries) -> Result<PipelineOutput> {
        let weekly = trim_leading(weekly)?;
        let alpha = self.config.significance_threshold;

        let stationarity = adf_test(weekly.values(), None)?;
        let verdict = stationarity.verdict(alpha);
        info!(
            statistic = stationarity.statistic,
            p_value = stationarity.p_value,
            lags = stationarity.lags,
            verdict = %verdict,
            "ADF test"
        );

        let differenced = verdict == Stationarity::NonStationary;
        let stationary = if differenced {
            info!("applying first difference");
            first_difference(&weekly)?
        } else {
            weekly.clone()
        };

        let mut auto = AutoARIMA::with_config(self.config.search.clone());
        auto.fit(&stationary)?;
        let model = auto.selected_spec().ok_or(ForecastError::FitRequired)?;
        info!(model = %model, candidates = auto.candidates_tried(), "selected model");

        let raw = auto.predict_with_intervals(
            self.config.forecast_horizon,
            self.config.confidence_level,
        )?;
        let last = stationary
            .last_timestamp()
            .ok_or(ForecastError::EmptyData)?;
        let step = match stationary.frequency() {
            Some(step) => step,
            None => self.config.rule()?.period(),
        };
        let forecast = raw.with_timestamps(last, step)?;

        Ok(PipelineOutput {
            weekly,
            stationarity,
            verdict,
            differenced,
            model,
            model_scores: auto.model_scores().to_vec(),
            stationary,
            forecast,
        })
    }
}

fn deduplicate(name: &str, table: &Table) -> Table {
    let cleaned = drop_duplicates(table);
    info!(
        dataset = name,
        rows = cleaned.len(),
        removed = table.len() - cleaned.len(),
        "dropped duplicate rows"
    );
    cleaned
}

/// Forward-fill and report how many weeks were filled.
fn fill_gaps(weekly: &TimeSeries) -> Result<TimeSeries> {
    let leading = weekly.leading_missing();
    let gaps = weekly.values()[leading..]
        .iter()
        .filter(|v| !v.is_finite())
        .count();
    let filled = forward_fill(weekly)?;
    if gaps > 0 {
        info!(weeks = gaps, "forward-filled empty weeks");
    }
    Ok(filled)
}

fn trim_leading(weekly: &TimeSeries) -> Result<TimeSeries> {
    let leading = weekly.leading_missing();
    if leading == weekly.len() {
        return Err(ForecastError::EmptyData);
    }
    if leading > 0 {
        warn!(weeks = leading, "dropping leading weeks without an average price");
    }
    Ok(weekly.trim_leading_missing())
}
