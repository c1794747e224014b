#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Benchmark driver for `MATCH_RECOGNIZE` queries over the crime dataset.
//!
//! Runs every query in the library against a [`QueryEngine`] (Trino in
//! production), measures each iteration and writes three files to the
//! output directory:
//!
//! * `results.csv` with one row per measured iteration
//! * `metadata.json` describing the engine, cluster and host
//! * `stats.json` with per-query medians
//!
//! Individual query failures are recorded in the results file and never
//! abort the run.

pub mod config;
pub mod engine;
#[cfg(test)]
mod fake;
pub mod metadata;
pub mod queries;
pub mod retry;
pub mod runner;
pub mod stats;
pub mod trino;
pub mod units;

use std::path::PathBuf;

pub use engine::{QueryEngine, QueryResult};
pub use runner::run_benchmark;

/// Errors that can occur while running a benchmark.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// Network or HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status or malformed engine response.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the problem.
        message: String,
    },

    /// The engine accepted the query but it failed.
    #[error("{message}")]
    Query {
        /// Engine query id, if one was assigned.
        query_id: Option<String>,
        /// Engine error message.
        message: String,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file is not valid TOML.
    #[error("Invalid config file {}: {source}", path.display())]
    ConfigFile {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Settings are missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file or directory could not be read, created or written.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path of the file or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A results row could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl BenchError {
    /// Engine query id attached to a failed query, if any.
    #[must_use]
    pub fn query_id(&self) -> Option<&str> {
        match self {
            Self::Query { query_id, .. } => query_id.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
