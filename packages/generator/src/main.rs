#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the synthetic crime dataset generator.
//!
//! ```text
//! crime_bench_generator --type tiny --seed 42
//! crime_bench_generator --type large --scale 1 --partitions 12 --seed 42
//! crime_bench_generator --type tiny --custom_weights "ASSAULT:0.5,ROBBERY:0.2"
//! ```

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory as _, Parser, ValueEnum};
use crime_bench_cli_utils::IndicatifProgress;
use crime_bench_generator::generate;
use crime_bench_generator_models::{
    DEFAULT_COMPLEXITY, DEFAULT_OUTPUT_DIR, DEFAULT_SEED, DistrictAssignment, GenerationRequest,
    SizeClass,
};

#[derive(Clone, Copy, ValueEnum)]
enum SizeClassArg {
    /// 50 rows
    Tiny,
    /// 1,000,000 rows per scale unit
    Large,
}

impl From<SizeClassArg> for SizeClass {
    fn from(value: SizeClassArg) -> Self {
        match value {
            SizeClassArg::Tiny => Self::Tiny,
            SizeClassArg::Large => Self::Large,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AssignmentArg {
    /// Each district is one contiguous block of rows
    Blocked,
    /// Rows cycle through the districts
    RoundRobin,
}

impl From<AssignmentArg> for DistrictAssignment {
    fn from(value: AssignmentArg) -> Self {
        match value {
            AssignmentArg::Blocked => Self::Blocked,
            AssignmentArg::RoundRobin => Self::RoundRobin,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "crime_bench_generator",
    about = "Generates reproducible synthetic crime datasets (Berlin districts)"
)]
struct Cli {
    /// Type of dataset to generate
    #[arg(long = "type", value_enum)]
    size_class: SizeClassArg,

    /// Scale of a large dataset (1 = one million rows)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    scale: u32,

    /// Number of partitions (districts). Defaults to 2 for tiny and
    /// 10 x scale for large.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    partitions: Option<u32>,

    /// Complexity of the data: values >= 0.5 draw crime types uniformly,
    /// lower values use the realistic (or custom) weights. Clamped to [0, 1].
    #[arg(long, default_value_t = DEFAULT_COMPLEXITY, allow_negative_numbers = true)]
    complexity: f64,

    /// Seed for the random number generator
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Number of files to split the dataset into
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,

    /// Custom weights, e.g. "THEFT:0.5,ROBBERY:0.1". Unspecified types share
    /// the remaining probability in proportion to their realistic weights.
    #[arg(long = "custom_weights", value_name = "TYPE:PROBABILITY,...")]
    custom_weights: Option<String>,

    /// How rows are assigned to districts
    #[arg(long, value_enum, default_value = "blocked")]
    assignment: AssignmentArg,

    /// Root directory for generated datasets
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
}

impl From<Cli> for GenerationRequest {
    fn from(cli: Cli) -> Self {
        Self {
            size_class: cli.size_class.into(),
            scale: cli.scale,
            partitions: cli.partitions,
            complexity: cli.complexity,
            seed: cli.seed,
            file_count: cli.count,
            custom_weights: cli.custom_weights,
            assignment: cli.assignment.into(),
            output_root: cli.output_dir,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_bench_cli_utils::init_logger();
    let cli = Cli::parse();

    if matches!(cli.size_class, SizeClassArg::Tiny) && cli.scale != 1 {
        log::warn!("--scale is ignored for tiny datasets");
    }

    let request = GenerationRequest::from(cli);
    let progress = IndicatifProgress::rows_bar(&multi, "Generating crime data");

    match generate(&request, &progress) {
        Ok(summary) => {
            for shard in &summary.shards {
                println!("Saved: {} ({} rows)", shard.path.display(), shard.rows);
            }
            Ok(())
        }
        Err(e) if e.is_config() => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
        Err(e) => {
            log::error!("Generation failed: {e}");
            Err(e.into())
        }
    }
}
