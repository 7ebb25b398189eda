//! End-to-end runs of the forecasting pipeline on CSV fixtures.

use approx::assert_relative_eq;
use chrono::{Duration, TimeZone, Utc};
use pricecast::config::{PipelineConfig, PlotSeries};
use pricecast::core::TimeSeries;
use pricecast::error::ForecastError;
use pricecast::pipeline::Pipeline;
use pricecast::report::render_chart;
use pricecast::transform::DateErrorPolicy;
use pricecast::validation::Stationarity;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const PRIMARY_CSV: &str = "\
id,name,brand
1,Speaker,Acme
2,Headphones,Sonic
1,Speaker,Acme
";

/// Price rows for `weeks` weeks, three observations per week.
///
/// `price(week)` is the midpoint of every observation in that week.
fn prices_csv(weeks: usize, price: impl Fn(usize) -> f64) -> String {
    let start = Utc.with_ymd_and_hms(2018, 1, 1, 10, 30, 0).unwrap();
    let mut csv = String::from("id,dateUpdated,prices.amountMin,prices.amountMax,prices.currency\n");
    for week in 0..weeks {
        let mid = price(week);
        for day in [0, 2, 5] {
            let ts = start + Duration::days((week * 7 + day) as i64);
            let _ = writeln!(
                csv,
                "{week}-{day},{},{},{},USD",
                ts.format("%Y-%m-%dT%H:%M:%SZ"),
                mid - 5.0,
                mid + 5.0
            );
        }
    }
    csv
}

fn write_datasets(prices: &str) -> (TempDir, PipelineConfig) {
    let dir = tempdir().unwrap();
    let dataset1 = dir.path().join("DataSet1.csv");
    let dataset2 = dir.path().join("DataSet2.csv");
    fs::write(&dataset1, PRIMARY_CSV).unwrap();
    fs::write(&dataset2, prices).unwrap();

    let mut config = PipelineConfig {
        dataset1_path: dataset1,
        dataset2_path: dataset2,
        ..Default::default()
    };
    config.report.chart_path = dir.path().join("forecast.svg");
    (dir, config)
}

fn weekly(values: Vec<f64>) -> TimeSeries {
    let start = Utc.with_ymd_and_hms(2018, 1, 7, 0, 0, 0).unwrap();
    let ts = (0..values.len()).map(|i| start + Duration::weeks(i as i64)).collect();
    TimeSeries::univariate(ts, values)
        .unwrap()
        .with_frequency(Duration::days(7))
}

#[test]
fn constant_price_year_is_stationary() {
    let (_dir, config) = write_datasets(&prices_csv(52, |_| 100.0));
    let output = Pipeline::new(config).unwrap().run().unwrap();

    assert_eq!(output.weekly.len(), 52);
    assert_eq!(output.verdict, Stationarity::Stationary);
    assert!(!output.differenced);
    assert_eq!(output.forecast.len(), 4);
    for p in output.forecast.points() {
        assert_relative_eq!(p.forecast, 100.0, epsilon = 1e-6);
        assert!(p.upper - p.lower > 0.0);
    }
}

#[test]
fn linear_trend_is_differenced_to_its_slope() {
    let (_dir, config) = write_datasets(&prices_csv(52, |w| 100.0 + 2.0 * w as f64));
    let output = Pipeline::new(config).unwrap().run().unwrap();

    assert!(output.stationarity.p_value > 0.05);
    assert_eq!(output.verdict, Stationarity::NonStationary);
    assert!(output.differenced);
    for &v in output.stationary.values() {
        assert_relative_eq!(v, 2.0, epsilon = 1e-9);
    }
    for p in output.forecast.points() {
        assert_relative_eq!(p.forecast, 2.0, epsilon = 1e-6);
        assert!(p.lower <= p.forecast && p.forecast <= p.upper);
    }
}

#[test]
fn forecast_dates_continue_weekly() {
    let (_dir, config) = write_datasets(&prices_csv(26, |w| 50.0 + (w % 5) as f64));
    let output = Pipeline::new(config).unwrap().run().unwrap();

    let last = *output.stationary.timestamps().last().unwrap();
    let dates: Vec<_> = output.forecast.timestamps().collect();
    assert_eq!(dates.len(), 4);
    for (i, ts) in dates.iter().enumerate() {
        assert_eq!(*ts, last + Duration::days(7 * (i as i64 + 1)));
    }
    // Sundays under the default rule
    assert_eq!(
        output.weekly.timestamps()[0],
        Utc.with_ymd_and_hms(2018, 1, 7, 0, 0, 0).unwrap()
    );
}

#[test]
fn gaps_are_forward_filled() {
    let csv = prices_csv(30, |w| if (10..13).contains(&w) { f64::NAN } else { 80.0 + w as f64 });
    // Drop the rows of the missing weeks entirely
    let csv: String = csv.lines().filter(|l| !l.contains("NaN")).map(|l| format!("{l}\n")).collect();
    let (_dir, config) = write_datasets(&csv);
    let output = Pipeline::new(config).unwrap().run().unwrap();

    assert_eq!(output.weekly.len(), 30);
    assert!(!output.weekly.has_missing_values());
    assert_eq!(&output.weekly.values()[10..13], &[89.0, 89.0, 89.0]);
}

#[test]
fn chart_and_csv_outputs() {
    let (dir, mut config) = write_datasets(&prices_csv(40, |w| 100.0 + ((w * 7) % 11) as f64));
    config.report.plot = PlotSeries::Weekly;
    let pipeline = Pipeline::new(config).unwrap();
    let output = pipeline.run().unwrap();

    render_chart(&output, &pipeline.config().report).unwrap();
    assert!(pipeline.config().report.chart_path.exists());

    let csv_path = dir.path().join("forecast.csv");
    output
        .forecast
        .write_csv(fs::File::create(&csv_path).unwrap())
        .unwrap();
    let written = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(written.lines().count(), 5);
    assert!(written.starts_with("timestamp,forecast,lower,upper"));
}

#[test]
fn missing_dataset_names_the_path() {
    let (_dir, mut config) = write_datasets(&prices_csv(10, |_| 1.0));
    config.dataset1_path = Path::new("/nonexistent/DataSet1.csv").to_path_buf();
    let err = Pipeline::new(config).unwrap().run().unwrap_err();

    assert!(matches!(err, ForecastError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/DataSet1.csv"));
}

#[test]
fn missing_price_column_lists_available_columns() {
    let (_dir, config) = write_datasets("id,dateUpdated,prices.amountMin\n1,2018-01-01,3.0\n");
    let err = Pipeline::new(config).unwrap().run().unwrap_err();

    match err {
        ForecastError::MissingColumn { column, available } => {
            assert_eq!(column, "prices.amountMax");
            assert!(available.contains(&"prices.amountMin".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unparseable_dates_follow_policy() {
    let mut csv = prices_csv(20, |_| 10.0);
    csv.push_str("bad,last tuesday,1.0,2.0,USD\n");

    let (_dir, config) = write_datasets(&csv);
    let err = Pipeline::new(config.clone()).unwrap().run().unwrap_err();
    assert!(matches!(err, ForecastError::ParseValue { row: 61, expected: "timestamp", .. }));

    let config = PipelineConfig {
        date_errors: DateErrorPolicy::Drop,
        ..config
    };
    let output = Pipeline::new(config).unwrap().run().unwrap();
    assert_eq!(output.weekly.len(), 20);
}

#[test]
fn horizon_zero_is_rejected_up_front() {
    let config = PipelineConfig {
        forecast_horizon: 0,
        ..Default::default()
    };
    assert!(matches!(Pipeline::new(config), Err(ForecastError::Config(_))));
}

#[test]
fn short_history_is_insufficient() {
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let err = pipeline.forecast_weekly(&weekly(vec![5.0, 6.0, 7.0])).unwrap_err();
    assert!(matches!(err, ForecastError::InsufficientData { needed: 4, got: 3 }));
}
