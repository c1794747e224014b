#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the `MATCH_RECOGNIZE` benchmark driver.
//!
//! ```text
//! crime_bench_benchmark --host localhost --iterations 5
//! TRINO_HOST=trino crime_bench_benchmark --config bench.toml
//! ```

use std::path::PathBuf;

use clap::Parser;
use crime_bench_benchmark::config::{self, ConfigOverrides};
use crime_bench_benchmark::run_benchmark;
use crime_bench_benchmark::trino::TrinoEngine;
use crime_bench_cli_utils::IndicatifProgress;

#[derive(Parser)]
#[command(
    name = "crime_bench_benchmark",
    about = "Benchmarks MATCH_RECOGNIZE queries against Trino"
)]
struct Cli {
    /// TOML file with benchmark settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trino coordinator host [default: localhost]
    #[arg(long, env = "TRINO_HOST")]
    host: Option<String>,

    /// Trino coordinator port [default: 8080]
    #[arg(long, env = "TRINO_PORT")]
    port: Option<u16>,

    /// Trino user [default: admin]
    #[arg(long, env = "TRINO_USER")]
    user: Option<String>,

    /// Catalog holding the dataset [default: postgres]
    #[arg(long, env = "TRINO_CATALOG")]
    catalog: Option<String>,

    /// Schema holding the dataset [default: public]
    #[arg(long, env = "TRINO_SCHEMA")]
    schema: Option<String>,

    /// Table holding the dataset [default: crime_data]
    #[arg(long)]
    table: Option<String>,

    /// Unmeasured runs per query [default: 1]
    #[arg(long)]
    warmup: Option<u32>,

    /// Measured runs per query [default: 5]
    #[arg(long)]
    iterations: Option<u32>,

    /// Directory of *.sql query files [default: queries]
    #[arg(long)]
    query_dir: Option<PathBuf>,

    /// Directory for results, metadata and stats [default: output]
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            table: self.table.clone(),
            warmup_runs: self.warmup,
            iterations: self.iterations,
            query_dir: self.query_dir.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_bench_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = config::resolve(cli.config.as_deref(), cli.overrides())?;
    log::info!(
        "Benchmarking {}.{}.{} at {} ({} warmup, {} iterations)",
        config.catalog,
        config.schema,
        config.table,
        config.base_url(),
        config.warmup_runs,
        config.iterations
    );

    let engine = TrinoEngine::new(&config)?;
    let progress = IndicatifProgress::steps_bar(&multi, "Benchmarking", 0);

    let report = run_benchmark(&engine, &config, &progress).await?;

    println!();
    println!("{:<40} {:>12} {:>16}", "query", "median (s)", "rows/s");
    for (name, summary) in &report.summaries {
        println!(
            "{name:<40} {:>12} {:>16}",
            summary
                .runtime_median
                .map_or_else(|| "-".to_string(), |v| format!("{v:.3}")),
            summary
                .throughput_median
                .map_or_else(|| "-".to_string(), |v| format!("{v:.0}")),
        );
    }
    println!();
    println!("Results:  {}", report.results_path.display());
    println!("Metadata: {}", report.metadata_path.display());
    println!("Stats:    {}", report.stats_path.display());

    Ok(())
}
