use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pricecast::config::PipelineConfig;
use pricecast::pipeline::Pipeline;
use pricecast::report;
use std::fs::File;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pricecast")]
#[command(about = "Forecast weekly average prices with AutoARIMA", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the datasets, test for stationarity and forecast
    Run {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the first dataset path
        #[arg(long)]
        dataset1: Option<PathBuf>,
        /// Override the price dataset path
        #[arg(long)]
        dataset2: Option<PathBuf>,
        /// Number of weeks to forecast
        #[arg(long)]
        horizon: Option<usize>,
        /// Where to write the SVG chart
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Skip chart rendering
        #[arg(long)]
        no_chart: bool,
        /// Also write the forecast as CSV
        #[arg(long)]
        forecast_csv: Option<PathBuf>,
        /// Debug logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print or write the default configuration
    DefaultConfig {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            dataset1,
            dataset2,
            horizon,
            chart,
            no_chart,
            forecast_csv,
            verbose,
        } => {
            init_tracing(verbose);

            let mut cfg = match &config {
                Some(path) => PipelineConfig::load_toml(path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            if let Some(path) = dataset1 {
                cfg.dataset1_path = path;
            }
            if let Some(path) = dataset2 {
                cfg.dataset2_path = path;
            }
            if let Some(h) = horizon {
                cfg.forecast_horizon = h;
            }
            if let Some(path) = chart {
                cfg.report.chart_path = path;
            }

            let pipeline = Pipeline::new(cfg).context("invalid configuration")?;
            let output = pipeline.run().context("forecast pipeline failed")?;

            print!("{}", report::summary(&output));
            println!();
            print!("{}", report::forecast_table(&output.forecast));

            if let Some(path) = forecast_csv {
                let file = File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                output
                    .forecast
                    .write_csv(file)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), "forecast written");
            }

            if !no_chart {
                // The forecast is already on stdout; a failed chart does not undo it.
                if let Err(e) = report::render_chart(&output, &pipeline.config().report) {
                    error!(error = %e, "chart rendering failed");
                    return Err(e).context("rendering chart");
                }
            }
        }
        Commands::DefaultConfig { output } => {
            let cfg = PipelineConfig::default();
            match output {
                Some(path) => {
                    cfg.save_toml(&path)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("wrote {}", path.display());
                }
                None => print!("{}", cfg.to_toml()?),
            }
        }
    }

    Ok(())
}
