//! Unit-root and level-stationarity tests.
//!
//! The ADF test follows the usual regression with a constant term and AIC lag
//! selection; p-values come from MacKinnon's response-surface approximation.

use crate::error::{ForecastError, Result};
use crate::utils::ols::ols_fit;
use crate::utils::stats::{is_constant, normal_cdf};
use std::fmt;

/// Null hypothesis of a stationarity test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullHypothesis {
    /// The series has a unit root (ADF). Rejection implies stationarity.
    UnitRoot,
    /// The series is level stationary (KPSS). Rejection implies non-stationarity.
    LevelStationary,
}

/// Verdict reached at a given significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stationarity {
    Stationary,
    NonStationary,
}

impl fmt::Display for Stationarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stationarity::Stationary => write!(f, "stationary"),
            Stationarity::NonStationary => write!(f, "non-stationary"),
        }
    }
}

/// Result of a stationarity test.
#[derive(Debug, Clone)]
pub struct StationarityResult {
    /// Test statistic
    pub statistic: f64,
    /// Approximate p-value
    pub p_value: f64,
    /// Number of lags used
    pub lags: usize,
    /// Observations used in the final regression
    pub nobs: usize,
    /// Critical values at common significance levels
    pub critical_values: CriticalValues,
    pub null_hypothesis: NullHypothesis,
}

impl StationarityResult {
    /// Verdict at significance level `alpha`.
    ///
    /// For the ADF test a p-value above `alpha` means the unit root cannot be
    /// rejected; for KPSS a p-value below `alpha` rejects stationarity.
    pub fn verdict(&self, alpha: f64) -> Stationarity {
        let stationary = match self.null_hypothesis {
            NullHypothesis::UnitRoot => self.p_value <= alpha,
            NullHypothesis::LevelStationary => self.p_value >= alpha,
        };
        if stationary {
            Stationarity::Stationary
        } else {
            Stationarity::NonStationary
        }
    }

    pub fn is_stationary(&self, alpha: f64) -> bool {
        self.verdict(alpha) == Stationarity::Stationary
    }
}

/// Critical values for stationarity tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CriticalValues {
    /// Critical value at 1% significance
    pub cv_1pct: f64,
    /// Critical value at 5% significance
    pub cv_5pct: f64,
    /// Critical value at 10% significance
    pub cv_10pct: f64,
}

fn check_finite(series: &[f64]) -> Result<()> {
    if series.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::MissingValues);
    }
    Ok(())
}

/// Augmented Dickey-Fuller test with a constant term.
///
/// Regresses `Δy_t` on `[1, y_{t-1}, Δy_{t-1}, .., Δy_{t-k}]`. The lag order `k`
/// minimises AIC over `0..=max_lags` on a common sample, with ties resolved
/// towards fewer lags; the chosen regression is then refitted on every
/// available observation.
///
/// `max_lags` defaults to `ceil(12 * (n/100)^(1/4))` and is always capped at
/// `n/2 - 2`.
///
/// A constant series has no unit root to speak of and is reported as
/// stationary with a statistic of `-inf`.
///
/// # Example
/// ```
/// use pricecast::validation::adf_test;
///
/// let series: Vec<f64> = (0..120)
///     .map(|i| ((i * 17 + 13) % 97) as f64 / 50.0 - 1.0)
///     .collect();
/// let result = adf_test(&series, None).unwrap();
/// assert!(result.is_stationary(0.05));
/// ```
pub fn adf_test(series: &[f64], max_lags: Option<usize>) -> Result<StationarityResult> {
    let n = series.len();
    if n < 4 {
        return Err(ForecastError::InsufficientData { needed: 4, got: n });
    }
    check_finite(series)?;

    let cap = n / 2 - 2;
    let max_lags = max_lags
        .unwrap_or_else(|| (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize)
        .min(cap);

    if is_constant(series) {
        let nobs = n - 1 - max_lags;
        return Ok(StationarityResult {
            statistic: f64::NEG_INFINITY,
            p_value: 0.0,
            lags: 0,
            nobs,
            critical_values: adf_critical_values(nobs),
            null_hypothesis: NullHypothesis::UnitRoot,
        });
    }

    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best: Option<(f64, usize)> = None;
    for lags in 0..=max_lags {
        let (y, columns) = adf_design(series, &diff, lags, max_lags);
        let aic = ols_fit(&y, &columns)?.aic();
        if best.map_or(true, |(best_aic, _)| aic < best_aic) {
            best = Some((aic, lags));
        }
    }
    let lags = best.map(|(_, lags)| lags).unwrap_or(0);

    let (y, columns) = adf_design(series, &diff, lags, lags);
    let fit = ols_fit(&y, &columns)?;
    let statistic = fit.t_value(0);
    let nobs = fit.nobs;

    Ok(StationarityResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        lags,
        nobs,
        critical_values: adf_critical_values(nobs),
        null_hypothesis: NullHypothesis::UnitRoot,
    })
}

/// Response and regressors of the ADF regression with `lags` difference lags,
/// using the sample that starts after `start_lag` lags are available.
fn adf_design(series: &[f64], diff: &[f64], lags: usize, start_lag: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    let rows = start_lag..diff.len();
    let y = diff[rows.clone()].to_vec();

    let mut columns = Vec::with_capacity(lags + 1);
    columns.push(rows.clone().map(|t| series[t]).collect());
    for j in 1..=lags {
        columns.push(rows.clone().map(|t| diff[t - j]).collect());
    }
    (y, columns)
}

// MacKinnon (1994) response surface for the constant-only case with one
// integrated variable.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// MacKinnon approximate p-value of an ADF statistic (constant, no trend).
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return f64::NAN;
    }
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }

    let coefs: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let z = coefs.iter().rev().fold(0.0, |acc, c| acc * statistic + c);
    normal_cdf(z)
}

/// MacKinnon (2010) finite-sample critical values (constant, no trend).
pub fn adf_critical_values(nobs: usize) -> CriticalValues {
    let t = nobs as f64;
    let surface = |b: [f64; 4]| b[0] + b[1] / t + b[2] / t.powi(2) + b[3] / t.powi(3);
    CriticalValues {
        cv_1pct: surface([-3.43035, -6.5393, -16.786, -79.433]),
        cv_5pct: surface([-2.86154, -2.8903, -4.234, -40.040]),
        cv_10pct: surface([-2.56677, -1.5384, -2.809, 0.0]),
    }
}

const KPSS_CRITICAL: [f64; 4] = [0.347, 0.463, 0.574, 0.739];
const KPSS_P: [f64; 4] = [0.10, 0.05, 0.025, 0.01];

/// KPSS test for level stationarity.
///
/// `lags` defaults to `trunc(4 * (n/100)^(1/4))` (the short Newey-West
/// bandwidth). The p-value is interpolated from the published table and
/// therefore clipped to `[0.01, 0.10]`.
pub fn kpss_test(series: &[f64], lags: Option<usize>) -> Result<StationarityResult> {
    let n = series.len();
    if n < 4 {
        return Err(ForecastError::InsufficientData { needed: 4, got: n });
    }
    check_finite(series)?;

    let lags = lags
        .unwrap_or_else(|| (4.0 * (n as f64 / 100.0).powf(0.25)) as usize)
        .min(n - 1);

    let critical_values = CriticalValues {
        cv_1pct: KPSS_CRITICAL[3],
        cv_5pct: KPSS_CRITICAL[1],
        cv_10pct: KPSS_CRITICAL[0],
    };

    let mean = series.iter().sum::<f64>() / n as f64;
    let residuals: Vec<f64> = series.iter().map(|x| x - mean).collect();

    let mut long_run = residuals.iter().map(|r| r * r).sum::<f64>();
    for j in 1..=lags {
        let weight = 1.0 - j as f64 / (lags + 1) as f64;
        let autocov: f64 = residuals[j..]
            .iter()
            .zip(&residuals[..n - j])
            .map(|(a, b)| a * b)
            .sum();
        long_run += 2.0 * weight * autocov;
    }
    long_run /= n as f64;

    if long_run <= 0.0 || is_constant(series) {
        return Ok(StationarityResult {
            statistic: 0.0,
            p_value: KPSS_P[0],
            lags,
            nobs: n,
            critical_values,
            null_hypothesis: NullHypothesis::LevelStationary,
        });
    }

    let mut partial = 0.0;
    let eta = residuals
        .iter()
        .map(|r| {
            partial += r;
            partial * partial
        })
        .sum::<f64>()
        / (n * n) as f64;
    let statistic = eta / long_run;

    Ok(StationarityResult {
        statistic,
        p_value: kpss_p_value(statistic),
        lags,
        nobs: n,
        critical_values,
        null_hypothesis: NullHypothesis::LevelStationary,
    })
}

fn kpss_p_value(statistic: f64) -> f64 {
    if statistic <= KPSS_CRITICAL[0] {
        return KPSS_P[0];
    }
    if statistic >= KPSS_CRITICAL[3] {
        return KPSS_P[3];
    }
    let i = KPSS_CRITICAL
        .windows(2)
        .position(|w| statistic <= w[1])
        .unwrap_or(2);
    let (x0, x1) = (KPSS_CRITICAL[i], KPSS_CRITICAL[i + 1]);
    let (p0, p1) = (KPSS_P[i], KPSS_P[i + 1]);
    p0 + (p1 - p0) * (statistic - x0) / (x1 - x0)
}

/// Number of differences needed for level stationarity according to KPSS.
///
/// Differencing stops as soon as the series becomes constant, the KPSS test
/// no longer rejects at `alpha`, or `max_d` is reached.
pub fn ndiffs(series: &[f64], alpha: f64, max_d: usize) -> Result<usize> {
    if is_constant(series) {
        return Ok(0);
    }

    let mut x = series.to_vec();
    let mut d = 0;
    while d < max_d && !kpss_test(&x, None)?.is_stationary(alpha) {
        d += 1;
        x = x.windows(2).map(|w| w[1] - w[0]).collect();
        if is_constant(&x) || x.len() < 4 {
            break;
        }
    }
    Ok(d)
}
