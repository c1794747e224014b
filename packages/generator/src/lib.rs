#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Synthetic crime dataset generator.
//!
//! Turns a [`GenerationRequest`] into one or more CSV files of
//! [`CrimeRecord`](crime_bench_crime_models::CrimeRecord)s for loading into
//! the benchmark database. A run is resolved into a [`GenerationPlan`]
//! first, so every configuration problem is reported before anything is
//! written. Records are then produced lazily by
//! [`synth::RecordSynthesizer`] and streamed to disk by
//! [`writer::write_shards`].
//!
//! Output is fully determined by the request: the same seed and options
//! produce byte-identical files.

pub mod layout;
pub mod sampler;
pub mod synth;
pub mod verify;
pub mod weights;
pub mod writer;

use std::path::PathBuf;
use std::sync::Arc;

use crime_bench_generator_models::{
    DistrictAssignment, GenerationRequest, GenerationSummary, SamplingMode, SizeClass,
};
use crime_bench_progress::ProgressCallback;

use crate::sampler::WeightedSampler;
use crate::synth::RecordSynthesizer;
use crate::weights::{WeightError, WeightTable};

/// Errors that can occur while generating a dataset.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// An option is missing, out of range or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The custom weight string is invalid.
    #[error("Configuration error: {0}")]
    Weights(#[from] WeightError),

    /// A file or directory could not be read, created or written.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path of the file or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A CSV row could not be written or read.
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        /// Path of the file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// Internal consistency check failed.
    #[error("Internal error: {0}")]
    Invariant(String),
}

impl GenerateError {
    /// Returns `true` for errors caused by the request rather than the
    /// environment or a bug.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Weights(_))
    }
}

/// A request resolved into concrete generation parameters.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    /// Size class being generated.
    pub size_class: SizeClass,
    /// Directory the shards are written to.
    pub dir: PathBuf,
    /// Total data rows across all shards.
    pub total_rows: u64,
    /// Number of district partitions.
    pub partitions: u32,
    /// Partition assignment strategy.
    pub assignment: DistrictAssignment,
    /// Category sampling mode.
    pub sampling: SamplingMode,
    /// Resolved weight table; the flat table in uniform mode.
    pub weights: WeightTable,
    /// Rows per output shard, in shard order.
    pub shard_rows: Vec<u64>,
    /// Seed for the random source.
    pub seed: u64,
}

impl GenerationPlan {
    /// Validates `request` and resolves defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Config`] or [`GenerateError::Weights`] for
    /// a zero scale/partition/shard count, a NaN complexity, more
    /// partitions or shards than rows, or an invalid custom weight string.
    pub fn resolve(request: &GenerationRequest) -> Result<Self, GenerateError> {
        if request.scale == 0 {
            return Err(GenerateError::Config("--scale must be positive".to_string()));
        }
        if request.file_count == 0 {
            return Err(GenerateError::Config("--count must be positive".to_string()));
        }
        if request.partitions == Some(0) {
            return Err(GenerateError::Config(
                "--partitions must be positive".to_string(),
            ));
        }
        if request.complexity.is_nan() {
            return Err(GenerateError::Config(
                "--complexity must be a number".to_string(),
            ));
        }

        let size_class = request.size_class;
        let total_rows = size_class.total_rows(request.scale);
        let partitions = request
            .partitions
            .unwrap_or_else(|| size_class.default_partitions(request.scale));

        if u64::from(partitions) > total_rows {
            return Err(GenerateError::Config(format!(
                "--partitions {partitions} exceeds the {total_rows} rows of a {size_class} dataset"
            )));
        }
        if u64::from(request.file_count) > total_rows {
            return Err(GenerateError::Config(format!(
                "--count {} exceeds the {total_rows} rows of a {size_class} dataset",
                request.file_count
            )));
        }

        let complexity = request.complexity.clamp(0.0, 1.0);
        if (complexity - request.complexity).abs() > f64::EPSILON {
            log::warn!(
                "--complexity {} clamped to {complexity}",
                request.complexity
            );
        }

        let custom = weights::resolve(request.custom_weights.as_deref())?;
        custom
            .ensure_normalized()
            .map_err(|e| GenerateError::Invariant(e.to_string()))?;

        let sampling = SamplingMode::from_complexity(complexity);
        let weights = match sampling {
            SamplingMode::Weighted => custom,
            SamplingMode::Uniform => {
                if request.custom_weights.is_some() {
                    log::warn!(
                        "--custom_weights has no effect with --complexity {complexity} (uniform sampling)"
                    );
                }
                WeightTable::uniform()
            }
        };

        Ok(Self {
            size_class,
            dir: layout::dataset_dir(&request.output_root, size_class, request.scale),
            total_rows,
            partitions,
            assignment: request.assignment,
            sampling,
            weights,
            shard_rows: layout::split_evenly(total_rows, request.file_count),
            seed: request.seed,
        })
    }

    /// Builds the record iterator for this plan.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Invariant`] if the plan's weight table or
    /// partition count cannot drive a synthesizer.
    pub fn synthesizer(&self) -> Result<RecordSynthesizer, GenerateError> {
        let sampler = WeightedSampler::new(&self.weights, self.sampling)
            .map_err(|e| GenerateError::Invariant(e.to_string()))?;
        RecordSynthesizer::new(
            self.total_rows,
            self.partitions,
            self.assignment,
            self.seed,
            sampler,
        )
    }
}

/// Runs a complete generation pass: resolve, synthesize, write.
///
/// # Errors
///
/// Returns a [`GenerateError`] if the request is invalid (nothing is
/// written in that case) or if writing fails part way.
pub fn generate(
    request: &GenerationRequest,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<GenerationSummary, GenerateError> {
    let plan = GenerationPlan::resolve(request)?;
    run_plan(&plan, progress)
}

/// Writes the dataset described by an already resolved plan.
///
/// # Errors
///
/// Returns a [`GenerateError`] if synthesis setup or writing fails.
pub fn run_plan(
    plan: &GenerationPlan,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<GenerationSummary, GenerateError> {
    log::info!(
        "Generating {} crime records ({} dataset): {} districts, {} sampling, seed {}",
        plan.total_rows,
        plan.size_class,
        plan.partitions,
        plan.sampling,
        plan.seed,
    );
    if plan.sampling == SamplingMode::Weighted {
        log::info!("Crime type weights: {}", plan.weights);
    }

    progress.set_total(plan.total_rows);
    progress.set_message(format!("Writing {}", plan.dir.display()));

    let shards = writer::write_shards(&plan.dir, plan.synthesizer()?, &plan.shard_rows, progress)?;

    for shard in &shards {
        log::info!("Saved {} ({} rows)", shard.path.display(), shard.rows);
    }
    progress.finish(format!("{} rows written", plan.total_rows));

    Ok(GenerationSummary {
        total_rows: shards.iter().map(|s| s.rows).sum(),
        shards,
        partitions: plan.partitions,
        sampling: plan.sampling,
    })
}
