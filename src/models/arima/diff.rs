//! Differencing helpers shared by the ARIMA fit and forecast paths.

/// Difference `series` `d` times. Each pass drops the first element.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Undo `d` rounds of differencing for values that continue `history`.
///
/// `differenced` holds future values on the `d`-times differenced scale; the
/// result continues `history` on its original scale.
///
/// # Example
/// ```
/// use pricecast::models::arima::integrate;
///
/// let history = [10.0, 12.0, 15.0];
/// assert_eq!(integrate(&[1.0, 1.0], &history, 1), vec![16.0, 17.0]);
/// ```
pub fn integrate(differenced: &[f64], history: &[f64], d: usize) -> Vec<f64> {
    let mut result = differenced.to_vec();
    for level in (0..d).rev() {
        let anchor = difference(history, level).last().copied().unwrap_or(0.0);
        result = result
            .iter()
            .scan(anchor, |acc, step| {
                *acc += step;
                Some(*acc)
            })
            .collect();
    }
    result
}

/// Rebuild a series from its first value and its first difference.
pub fn undifference(first: f64, differenced: &[f64]) -> Vec<f64> {
    std::iter::once(first)
        .chain(differenced.iter().scan(first, |acc, step| {
            *acc += step;
            Some(*acc)
        }))
        .collect()
}
