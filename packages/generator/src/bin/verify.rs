#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Prints the row count, district count and crime type distribution of a
//! generated dataset. Handy for checking a `--custom_weights` run.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "crime_bench_verify", about = "Inspect a generated crime dataset")]
struct Cli {
    /// Dataset file to inspect
    #[arg(default_value = "datasets/tiny/crime_data.csv")]
    path: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _multi = crime_bench_cli_utils::init_logger();
    let cli = Cli::parse();

    let report = crime_bench_generator::verify::inspect(&cli.path).inspect_err(|e| {
        log::error!("{e}");
    })?;
    print!("{report}");

    Ok(())
}
