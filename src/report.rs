//! Forecast chart and text summary.

use crate::config::{PlotSeries, ReportConfig};
use crate::core::{ForecastSeries, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::pipeline::PipelineOutput;
use chrono::{DateTime, Duration, Utc};
use plotters::prelude::*;
use std::fmt::Write as _;
use tracing::info;

const FORECAST_COLOR: RGBColor = RGBColor(255, 165, 0);
const BAND_COLOR: RGBColor = RGBColor(255, 192, 203);

fn render_error<E: std::fmt::Display>(e: E) -> ForecastError {
    ForecastError::Render(e.to_string())
}

/// The history series chosen by `plot`.
pub fn plotted_series(output: &PipelineOutput, plot: PlotSeries) -> &TimeSeries {
    match plot {
        PlotSeries::Stationary => &output.stationary,
        PlotSeries::Weekly => &output.weekly,
    }
}

/// Value range covering the history and the forecast band, padded by 5%.
fn value_range(history: &TimeSeries, forecast: &ForecastSeries) -> (f64, f64) {
    let values = history
        .values()
        .iter()
        .copied()
        .chain(forecast.points().iter().flat_map(|p| [p.lower, p.forecast, p.upper]))
        .filter(|v| v.is_finite());

    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.05 };
    (lo - pad, hi + pad)
}

fn time_range(history: &TimeSeries, forecast: &ForecastSeries) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = history
        .first_timestamp()
        .or_else(|| forecast.timestamps().next())
        .ok_or(ForecastError::EmptyData)?;
    let end = forecast
        .timestamps()
        .last()
        .or_else(|| history.last_timestamp())
        .ok_or(ForecastError::EmptyData)?;
    if end > start {
        Ok((start, end))
    } else {
        Ok((start, start + Duration::days(7)))
    }
}

/// Draw history, forecast and confidence band to an SVG file at `report.chart_path`.
pub fn render_chart(output: &PipelineOutput, report: &ReportConfig) -> Result<()> {
    let history = plotted_series(output, report.plot);
    let forecast = &output.forecast;
    let (x_start, x_end) = time_range(history, forecast)?;
    let (y_min, y_max) = value_range(history, forecast);

    let root = SVGBackend::new(&report.chart_path, (report.width, report.height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&report.title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_start..x_end, y_min..y_max)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_desc("date")
        .y_desc("avg price")
        .x_label_formatter(&|d: &DateTime<Utc>| d.format("%Y-%m-%d").to_string())
        .draw()
        .map_err(render_error)?;

    let points = forecast.points();
    let band: Vec<(DateTime<Utc>, f64)> = points
        .iter()
        .map(|p| (p.timestamp, p.upper))
        .chain(points.iter().rev().map(|p| (p.timestamp, p.lower)))
        .collect();
    chart
        .draw_series(std::iter::once(Polygon::new(band, BAND_COLOR.mix(0.3).filled())))
        .map_err(render_error)?
        .label(format!("{:.0}% interval", forecast.level() * 100.0))
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BAND_COLOR.mix(0.3).filled()));

    chart
        .draw_series(LineSeries::new(
            history.iter().filter(|(_, v)| v.is_finite()),
            &BLUE,
        ))
        .map_err(render_error)?
        .label("historical avg prices")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(
            points.iter().map(|p| (p.timestamp, p.forecast)),
            &FORECAST_COLOR,
        ))
        .map_err(render_error)?
        .label("forecasted prices")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], FORECAST_COLOR));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    info!(path = %report.chart_path.display(), "chart written");
    Ok(())
}

/// Plain-text table of the dated forecast.
pub fn forecast_table(forecast: &ForecastSeries) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>14} {:>14} {:>14}",
        "date", "forecast", "lower", "upper"
    );
    for p in forecast.points() {
        let _ = writeln!(
            out,
            "{:<12} {:>14.4} {:>14.4} {:>14.4}",
            p.timestamp.format("%Y-%m-%d"),
            p.forecast,
            p.lower,
            p.upper
        );
    }
    out
}

/// One-paragraph run summary for the terminal.
pub fn summary(output: &PipelineOutput) -> String {
    let adf = &output.stationarity;
    let mut out = String::new();
    let _ = writeln!(out, "weeks:          {}", output.weekly.len());
    let _ = writeln!(out, "ADF statistic:  {:.4}", adf.statistic);
    let _ = writeln!(out, "p-value:        {:.4}", adf.p_value);
    let _ = writeln!(out, "verdict:        {}", output.verdict);
    let _ = writeln!(out, "differenced:    {}", output.differenced);
    let _ = writeln!(out, "model:          {}", output.model);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::Pipeline;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn output() -> PipelineOutput {
        let base = Utc.with_ymd_and_hms(2018, 1, 7, 0, 0, 0).unwrap();
        let values: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let ts = (0..30).map(|i| base + Duration::weeks(i)).collect();
        let weekly = TimeSeries::univariate(ts, values)
            .unwrap()
            .with_label("avg_price")
            .with_frequency(Duration::days(7));
        Pipeline::new(PipelineConfig::default())
            .unwrap()
            .forecast_weekly(&weekly)
            .unwrap()
    }

    #[test]
    fn plot_choice_selects_series() {
        let out = output();
        assert!(out.differenced);
        assert_eq!(plotted_series(&out, PlotSeries::Weekly).len(), 30);
        assert_eq!(plotted_series(&out, PlotSeries::Stationary).len(), 29);
    }

    #[test]
    fn range_covers_band() {
        let out = output();
        let (lo, hi) = value_range(&out.weekly, &out.forecast);
        for p in out.forecast.points() {
            assert!(lo < p.lower && p.upper < hi);
        }
        assert!(lo < 100.0 && hi > 158.0);
    }

    #[test]
    fn writes_svg() {
        let dir = tempdir().unwrap();
        let report = ReportConfig {
            chart_path: dir.path().join("chart.svg"),
            plot: PlotSeries::Weekly,
            ..Default::default()
        };
        render_chart(&output(), &report).unwrap();

        let svg = std::fs::read_to_string(&report.chart_path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("forecasted prices"));
    }

    #[test]
    fn table_has_one_line_per_step() {
        let out = output();
        let table = forecast_table(&out.forecast);
        assert_eq!(table.lines().count(), 1 + out.forecast.len());
        assert!(table.starts_with("date"));
        assert!(summary(&out).contains("ARIMA("));
    }
}
