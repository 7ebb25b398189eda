//! Pipeline configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! dataset2_path = "data/prices.csv"
//! forecast_horizon = 8
//!
//! [search]
//! information_criterion = "bic"
//! ```

use crate::error::{ForecastError, Result};
use crate::models::arima::AutoARIMAConfig;
use crate::transform::{DateErrorPolicy, PriceColumns, ResampleRule};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which series is drawn as history next to the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotSeries {
    /// The series the model was fitted on, on the same scale as the forecast.
    #[default]
    Stationary,
    /// The forward-filled weekly averages, even when the forecast is differenced.
    Weekly,
}

/// Chart output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub chart_path: PathBuf,
    pub plot: PlotSeries,
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            chart_path: PathBuf::from("forecast.svg"),
            plot: PlotSeries::default(),
            width: 1000,
            height: 600,
            title: "avg price forecast for next month".to_string(),
        }
    }
}

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Loaded and deduplicated only.
    pub dataset1_path: PathBuf,
    /// Source of the price series.
    pub dataset2_path: PathBuf,
    pub forecast_horizon: usize,
    /// `weekly`, `W` or `W-SUN` .. `W-SAT`.
    pub resample_rule: String,
    pub confidence_level: f64,
    /// ADF p-values above this mark the weekly series as non-stationary.
    pub significance_threshold: f64,
    pub date_errors: DateErrorPolicy,
    pub columns: PriceColumns,
    pub search: AutoARIMAConfig,
    pub report: ReportConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset1_path: PathBuf::from("./dataset/DataSet1.csv"),
            dataset2_path: PathBuf::from("./dataset/DataSet2.csv"),
            forecast_horizon: 4,
            resample_rule: "weekly".to_string(),
            confidence_level: 0.95,
            significance_threshold: 0.05,
            date_errors: DateErrorPolicy::default(),
            columns: PriceColumns::default(),
            search: AutoARIMAConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parsed form of `resample_rule`.
    pub fn rule(&self) -> Result<ResampleRule> {
        self.resample_rule
            .parse()
            .map_err(|_| ForecastError::Config(format!("unknown resample rule '{}'", self.resample_rule)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.forecast_horizon == 0 {
            return Err(ForecastError::Config(
                "forecast_horizon must be at least 1".to_string(),
            ));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::Config(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if !(self.significance_threshold > 0.0 && self.significance_threshold < 1.0) {
            return Err(ForecastError::Config(format!(
                "significance_threshold must be in (0, 1), got {}",
                self.significance_threshold
            )));
        }
        if self.report.width == 0 || self.report.height == 0 {
            return Err(ForecastError::Config(
                "chart dimensions must be positive".to_string(),
            ));
        }
        self.rule()?;
        self.search
            .validate()
            .map_err(|e| ForecastError::Config(format!("search: {e}")))
    }

    /// Write the configuration as pretty TOML.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = self.to_toml()?;
        fs::write(path, contents).map_err(|source| ForecastError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and validate a TOML configuration file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ForecastError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig = toml::from_str(&contents)
            .map_err(|e| ForecastError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ForecastError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::arima::InformationCriterion;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.forecast_horizon, 4);
        assert_eq!(config.rule().unwrap(), ResampleRule::default());
        assert_eq!(config.columns.date, "dateUpdated");
        assert_eq!(config.report.plot, PlotSeries::Stationary);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            forecast_horizon = 8
            date_errors = "drop"

            [search]
            information_criterion = "bic"
            stepwise = false

            [report]
            plot = "weekly"
            "#,
        )
        .unwrap();

        assert_eq!(config.forecast_horizon, 8);
        assert_eq!(config.date_errors, DateErrorPolicy::Drop);
        assert_eq!(config.search.information_criterion, InformationCriterion::Bic);
        assert!(!config.search.stepwise);
        assert_eq!(config.search.max_p, 5);
        assert_eq!(config.report.plot, PlotSeries::Weekly);
        assert_eq!(config.report.width, 1000);
        assert_eq!(config.confidence_level, 0.95);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = PipelineConfig {
            forecast_horizon: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ForecastError::Config(_))));

        config.forecast_horizon = 4;
        config.confidence_level = 1.0;
        assert!(config.validate().is_err());

        config.confidence_level = 0.9;
        config.significance_threshold = 0.0;
        assert!(config.validate().is_err());

        config.significance_threshold = 0.05;
        config.resample_rule = "monthly".to_string();
        assert!(config.validate().is_err());

        config.resample_rule = "W-MON".to_string();
        config.search.start_p = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pricecast.toml");

        let mut config = PipelineConfig::default();
        config.search.d = Some(1);
        config.report.title = "weekly prices".to_string();
        config.save_toml(&path).unwrap();

        assert_eq!(PipelineConfig::load_toml(&path).unwrap(), config);
    }

    #[test]
    fn load_reports_path_and_syntax_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            PipelineConfig::load_toml(&missing),
            Err(ForecastError::Io { .. })
        ));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "forecast_horizon = \"four\"").unwrap();
        let err = PipelineConfig::load_toml(&broken).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
