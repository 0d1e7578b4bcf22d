use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};

use voter_demographics::config::Config;
use voter_demographics::constants::{DEFAULT_CSV_OUTPUT, DEFAULT_PARQUET_OUTPUT};
use voter_demographics::error::Result;
use voter_demographics::logging;
use voter_demographics::observability::metrics;
use voter_demographics::pipeline::{ExportPaths, Pipeline, PipelineInputs, PipelineSummary};

#[derive(Parser)]
#[command(name = "voter_demographics")]
#[command(about = "Geocode a voter roster and attach census demographic percentages")]
#[command(version)]
struct Cli {
    /// Path to the voter data CSV file
    #[arg(long, alias = "voter_data")]
    voter_data: PathBuf,

    /// Path to the Census data CSV file
    #[arg(long, alias = "census_data")]
    census_data: PathBuf,

    /// Output CSV file path
    #[arg(long, alias = "csv_output", default_value = DEFAULT_CSV_OUTPUT)]
    csv_output: PathBuf,

    /// Output Parquet file path
    #[arg(long, alias = "parquet_output", default_value = DEFAULT_PARQUET_OUTPUT)]
    parquet_output: PathBuf,
}

async fn run(cli: Cli, config: &Config) -> Result<PipelineSummary> {
    let pipeline = Pipeline::from_config(config)?;
    let inputs = PipelineInputs {
        voter_data: cli.voter_data,
        census_data: cli.census_data,
        exports: ExportPaths {
            csv: cli.csv_output,
            parquet: cli.parquet_output,
        },
    };
    pipeline.run(&inputs).await
}

fn print_summary(summary: &PipelineSummary) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(summary).context("rendering run summary")?;
    println!("\n📊 Pipeline Results:\n{}", rendered);
    if summary.no_match + summary.exhausted > 0 {
        println!(
            "⚠️  {} addresses could not be geocoded",
            summary.no_match + summary.exhausted
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Startup failed: {}", e);
            eprintln!("❌ {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    if let Err(e) = metrics::init() {
        warn!("Metrics disabled: {}", e);
    }

    let outcome = run(cli, &config).await;

    if let Some(url) = &config.metrics.pushgateway_url {
        metrics::push_to_gateway(url, "voter_demographics").await;
    }

    match outcome {
        Ok(summary) => {
            if let Err(e) = print_summary(&summary) {
                warn!("{:#}", e);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Pipeline failed: {}", e);
            eprintln!("❌ Pipeline failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
