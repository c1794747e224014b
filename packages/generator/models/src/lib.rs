#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Generation request, sampling mode and output summary types for the
//! synthetic crime dataset generator.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Row count of the fixed-size `tiny` dataset.
pub const TINY_ROWS: u64 = 50;

/// Row count of a `large` dataset at scale 1.
pub const LARGE_BASE_ROWS: u64 = 1_000_000;

/// Partition count used for `tiny` when `--partitions` is not given.
pub const TINY_DEFAULT_PARTITIONS: u32 = 2;

/// Partitions per scale unit used for `large` when `--partitions` is not
/// given.
pub const LARGE_PARTITIONS_PER_SCALE: u32 = 10;

/// Complexity at or above which categories are drawn uniformly.
pub const UNIFORM_COMPLEXITY_THRESHOLD: f64 = 0.5;

/// Default complexity knob (weighted sampling).
pub const DEFAULT_COMPLEXITY: f64 = 0.3;

/// Default seed.
pub const DEFAULT_SEED: u64 = 42;

/// Default root directory for generated datasets.
pub const DEFAULT_OUTPUT_DIR: &str = "datasets";

/// Base file name of a generated dataset (`crime_data.csv`, or
/// `crime_data_<i>.csv` for shards).
pub const DATASET_FILE_STEM: &str = "crime_data";

/// Size class of a requested dataset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SizeClass {
    /// Fixed 50-row dataset for smoke tests.
    Tiny,
    /// One million rows per scale unit.
    Large,
}

impl SizeClass {
    /// Total rows generated for this size class at the given scale.
    ///
    /// Scale is ignored for [`SizeClass::Tiny`].
    #[must_use]
    pub fn total_rows(self, scale: u32) -> u64 {
        match self {
            Self::Tiny => TINY_ROWS,
            Self::Large => LARGE_BASE_ROWS * u64::from(scale),
        }
    }

    /// Partition count used when none is requested explicitly.
    #[must_use]
    pub const fn default_partitions(self, scale: u32) -> u32 {
        match self {
            Self::Tiny => TINY_DEFAULT_PARTITIONS,
            Self::Large => LARGE_PARTITIONS_PER_SCALE.saturating_mul(scale),
        }
    }
}

/// How rows are spread over district partitions.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DistrictAssignment {
    /// Each partition is one contiguous run of ids.
    #[default]
    Blocked,
    /// Row `i` belongs to partition `i % partitions`.
    RoundRobin,
}

/// How crime categories are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SamplingMode {
    /// Draw from the configured weight table.
    Weighted,
    /// Draw every category with equal probability.
    Uniform,
}

impl SamplingMode {
    /// Selects the mode for a complexity knob already clamped into [0, 1].
    #[must_use]
    pub fn from_complexity(complexity: f64) -> Self {
        if complexity >= UNIFORM_COMPLEXITY_THRESHOLD {
            Self::Uniform
        } else {
            Self::Weighted
        }
    }
}

/// A single generation run, as requested on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Requested size class.
    pub size_class: SizeClass,
    /// Scale factor (`large` only).
    pub scale: u32,
    /// Number of district partitions, or `None` for the size class
    /// default.
    pub partitions: Option<u32>,
    /// Complexity knob; clamped into [0, 1] during resolution.
    pub complexity: f64,
    /// Seed for the random source.
    pub seed: u64,
    /// Number of output shards.
    pub file_count: u32,
    /// Raw `LABEL:weight,...` override string.
    pub custom_weights: Option<String>,
    /// Partition assignment strategy.
    pub assignment: DistrictAssignment,
    /// Root directory the size-class directories are created under.
    pub output_root: PathBuf,
}

impl GenerationRequest {
    /// A request for `size_class` with every other field at its default.
    #[must_use]
    pub fn new(size_class: SizeClass) -> Self {
        Self {
            size_class,
            scale: 1,
            partitions: None,
            complexity: DEFAULT_COMPLEXITY,
            seed: DEFAULT_SEED,
            file_count: 1,
            custom_weights: None,
            assignment: DistrictAssignment::default(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// One file written by a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSummary {
    /// Path of the written file.
    pub path: PathBuf,
    /// Id of the first data row.
    pub first_id: u64,
    /// Number of data rows (excluding the header).
    pub rows: u64,
}

/// Outcome of a completed generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Files written, in shard order.
    pub shards: Vec<ShardSummary>,
    /// Total data rows across all shards.
    pub total_rows: u64,
    /// Number of distinct district labels.
    pub partitions: u32,
    /// Sampling mode that was used.
    pub sampling: SamplingMode,
}
