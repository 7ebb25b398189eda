//! Ordinary Least Squares regression with an intercept.
//!
//! Used by the unit-root tests, which need coefficient standard errors and
//! information criteria in addition to the point estimates.

use crate::error::{ForecastError, Result};

/// Fitted OLS regression `y = intercept + X @ coefficients + e`.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Intercept term.
    pub intercept: f64,
    /// Regression coefficients, one per regressor column.
    pub coefficients: Vec<f64>,
    /// Standard errors of `coefficients`.
    pub standard_errors: Vec<f64>,
    /// Residual sum of squares (floored at a tiny positive value).
    pub ssr: f64,
    /// Number of observations.
    pub nobs: usize,
}

impl OlsFit {
    /// t-statistic of coefficient `j`.
    pub fn t_value(&self, j: usize) -> f64 {
        self.coefficients[j] / self.standard_errors[j]
    }

    /// Number of estimated mean parameters (regressors + intercept).
    pub fn num_params(&self) -> usize {
        self.coefficients.len() + 1
    }

    /// Gaussian log-likelihood at the OLS estimate.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.num_params() as f64
    }
}

/// Fit OLS with an intercept on the given regressor columns.
///
/// Columns are centred before forming the normal equations, which are then
/// solved with a Cholesky factorisation.
pub fn ols_fit(y: &[f64], columns: &[Vec<f64>]) -> Result<OlsFit> {
    let n = y.len();
    let k = columns.len();

    if n <= k + 1 {
        return Err(ForecastError::InsufficientData {
            needed: k + 2,
            got: n,
        });
    }
    for col in columns {
        if col.len() != n {
            return Err(ForecastError::InvalidParameter(format!(
                "regressor has {} rows, expected {n}",
                col.len()
            )));
        }
    }

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let yc: Vec<f64> = y.iter().map(|v| v - y_mean).collect();
    let x_means: Vec<f64> = columns
        .iter()
        .map(|c| c.iter().sum::<f64>() / n as f64)
        .collect();
    let xc: Vec<Vec<f64>> = columns
        .iter()
        .zip(&x_means)
        .map(|(c, m)| c.iter().map(|v| v - m).collect())
        .collect();

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in 0..=i {
            let s: f64 = xc[i].iter().zip(&xc[j]).map(|(a, b)| a * b).sum();
            xtx[i][j] = s;
            xtx[j][i] = s;
        }
        xty[i] = xc[i].iter().zip(&yc).map(|(a, b)| a * b).sum();
    }

    // Small ridge keeps collinear (e.g. constant) columns solvable; they get ~0 weight.
    let max_diag = (0..k).map(|i| xtx[i][i]).fold(0.0, f64::max);
    let ridge = max_diag * 1e-12 + f64::MIN_POSITIVE;
    for (i, row) in xtx.iter_mut().enumerate() {
        row[i] += ridge;
    }

    let chol = Cholesky::factor(&xtx).ok_or_else(|| {
        ForecastError::ComputationError("OLS design matrix is not positive definite".into())
    })?;
    let coefficients = chol.solve(&xty);

    let ssr: f64 = (0..n)
        .map(|t| {
            let fitted: f64 = (0..k).map(|j| coefficients[j] * xc[j][t]).sum();
            (yc[t] - fitted).powi(2)
        })
        .sum();

    let scale = y.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);
    let floor = (1e-12 * scale).powi(2);
    let df = (n - k - 1) as f64;
    let sigma2 = (ssr / df).max(floor);

    let standard_errors = (0..k)
        .map(|j| {
            let mut unit = vec![0.0; k];
            unit[j] = 1.0;
            (sigma2 * chol.solve(&unit)[j]).sqrt()
        })
        .collect();

    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&x_means)
            .map(|(b, m)| b * m)
            .sum::<f64>();

    Ok(OlsFit {
        intercept,
        coefficients,
        standard_errors,
        ssr: ssr.max(n as f64 * floor),
        nobs: n,
    })
}

/// Lower-triangular Cholesky factor of a symmetric positive definite matrix.
struct Cholesky {
    l: Vec<Vec<f64>>,
}

impl Cholesky {
    fn factor(a: &[Vec<f64>]) -> Option<Self> {
        let n = a.len();
        let mut l = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in 0..=i {
                let mut sum = a[i][j];
                for k in 0..j {
                    sum -= l[i][k] * l[j][k];
                }

                if i == j {
                    if sum <= 0.0 {
                        return None;
                    }
                    l[i][j] = sum.sqrt();
                } else {
                    l[i][j] = sum / l[j][j];
                }
            }
        }

        Some(Self { l })
    }

    /// Solve `L L' x = b`.
    fn solve(&self, b: &[f64]) -> Vec<f64> {
        let l = &self.l;
        let n = b.len();

        let mut y = vec![0.0; n];
        for i in 0..n {
            let sum: f64 = b[i] - (0..i).map(|j| l[i][j] * y[j]).sum::<f64>();
            y[i] = sum / l[i][i];
        }

        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let sum: f64 = y[i] - ((i + 1)..n).map(|j| l[j][i] * x[j]).sum::<f64>();
            x[i] = sum / l[i][i];
        }
        x
    }
}
