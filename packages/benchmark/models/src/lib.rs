#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Benchmark configuration, per-iteration metrics and persisted result
//! types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Value of the `system` column in the results file.
pub const SYSTEM_NAME: &str = "trino";

/// Columns of the results CSV, in order.
pub const RESULT_COLUMNS: [&str; 12] = [
    "system",
    "query_pattern",
    "iteration",
    "runtime_sec",
    "client_runtime_sec",
    "input_rows_processed",
    "rows_returned",
    "throughput_input_rows_per_sec",
    "cpu_seconds",
    "peak_memory_mb",
    "status",
    "query_id",
];

/// Settings for one benchmark run.
///
/// Deserializable from TOML; every field is optional there and falls back
/// to [`BenchmarkConfig::default()`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Trino coordinator host.
    pub host: String,
    /// Trino coordinator HTTP port.
    pub port: u16,
    /// User sent as `X-Trino-User`.
    pub user: String,
    /// Catalog the queries run in.
    pub catalog: String,
    /// Schema the queries run in.
    pub schema: String,
    /// Table holding the generated dataset.
    pub table: String,
    /// Unmeasured runs per query before measuring.
    pub warmup_runs: u32,
    /// Measured runs per query.
    pub iterations: u32,
    /// Directory holding the `*.sql` query library.
    pub query_dir: PathBuf,
    /// Directory results are written to.
    pub output_dir: PathBuf,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            user: "admin".to_string(),
            catalog: "postgres".to_string(),
            schema: "public".to_string(),
            table: "crime_data".to_string(),
            warmup_runs: 1,
            iterations: 5,
            query_dir: PathBuf::from("queries"),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl BenchmarkConfig {
    /// Base URL of the Trino coordinator.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// A pattern query from the query library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// File name, used as the `query_pattern` label.
    pub name: String,
    /// SQL text without a trailing `;`.
    pub sql: String,
}

/// Statistics reported by the engine for one finished query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStats {
    /// Engine-assigned query id.
    pub query_id: String,
    /// Final query state (e.g. `FINISHED`).
    pub state: String,
    /// Raw CPU time string, e.g. `1.23s`.
    pub cpu_time: Option<String>,
    /// CPU time in seconds.
    pub cpu_seconds: Option<f64>,
    /// Raw elapsed time string.
    pub elapsed_time: Option<String>,
    /// Elapsed time in seconds.
    pub elapsed_seconds: Option<f64>,
    /// Raw peak memory string, e.g. `256.5MB`.
    pub peak_memory: Option<String>,
    /// Peak memory in MiB.
    pub peak_memory_mb: Option<f64>,
    /// Rows read from the connector.
    pub physical_input_rows: Option<u64>,
    /// Rows produced by the query.
    pub output_rows: Option<u64>,
}

/// Where the metrics of an iteration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatsSource {
    /// Server statistics from the REST API were available.
    RestApi,
    /// Only client-side timing was available.
    ClientOnly,
}

/// Outcome of executing a query once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The query finished and all rows were fetched.
    Success,
    /// The query failed with the given message.
    Error(String),
}

impl RunStatus {
    /// Returns `true` for [`RunStatus::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Error(message) => write!(f, "ERROR: {message}"),
        }
    }
}

/// Metrics of one measured iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationMetrics {
    /// Server elapsed time when available, else client time.
    pub runtime_sec: f64,
    /// Wall-clock time measured by the driver.
    pub client_runtime_sec: f64,
    /// Rows fetched by the driver.
    pub rows_returned: u64,
    /// Input rows the query processed.
    pub input_rows_processed: u64,
    /// `input_rows_processed / runtime_sec`, or 0.
    pub throughput_input_rows_per_sec: f64,
    /// Server CPU time, if reported and non-zero.
    pub cpu_seconds: Option<f64>,
    /// Server peak memory, if reported and non-zero.
    pub peak_memory_mb: Option<f64>,
    /// Execution outcome.
    pub status: RunStatus,
    /// Engine query id, if one was assigned.
    pub query_id: Option<String>,
    /// Origin of the metrics.
    pub stats_source: StatsSource,
}

/// One row of the results CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Engine name, always [`SYSTEM_NAME`].
    pub system: String,
    /// Query file name.
    pub query_pattern: String,
    /// 1-based iteration number.
    pub iteration: u32,
    /// See [`IterationMetrics::runtime_sec`].
    pub runtime_sec: f64,
    /// See [`IterationMetrics::client_runtime_sec`].
    pub client_runtime_sec: f64,
    /// See [`IterationMetrics::input_rows_processed`].
    pub input_rows_processed: u64,
    /// See [`IterationMetrics::rows_returned`].
    pub rows_returned: u64,
    /// See [`IterationMetrics::throughput_input_rows_per_sec`].
    pub throughput_input_rows_per_sec: f64,
    /// Empty when unavailable.
    pub cpu_seconds: Option<f64>,
    /// Empty when unavailable.
    pub peak_memory_mb: Option<f64>,
    /// `SUCCESS` or `ERROR: <message>`.
    pub status: String,
    /// Query id, or `unavailable`.
    pub query_id: String,
}

impl ResultRow {
    /// Builds the CSV row for iteration `iteration` of `query`.
    #[must_use]
    pub fn new(query: &str, iteration: u32, metrics: &IterationMetrics) -> Self {
        Self {
            system: SYSTEM_NAME.to_string(),
            query_pattern: query.to_string(),
            iteration,
            runtime_sec: metrics.runtime_sec,
            client_runtime_sec: metrics.client_runtime_sec,
            input_rows_processed: metrics.input_rows_processed,
            rows_returned: metrics.rows_returned,
            throughput_input_rows_per_sec: metrics.throughput_input_rows_per_sec,
            cpu_seconds: metrics.cpu_seconds,
            peak_memory_mb: metrics.peak_memory_mb,
            status: metrics.status.to_string(),
            query_id: metrics
                .query_id
                .clone()
                .unwrap_or_else(|| "unavailable".to_string()),
        }
    }
}

/// Median metrics of one query across its successful iterations.
///
/// A field is `None` when no iteration produced that metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySummary {
    /// Median runtime in seconds.
    pub runtime_median: Option<f64>,
    /// Median throughput in input rows per second.
    pub throughput_median: Option<f64>,
    /// Median server CPU seconds.
    pub cpu_median: Option<f64>,
    /// Median server peak memory in MiB.
    pub memory_median: Option<f64>,
}

/// Engine and cluster information gathered through SQL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Result of `SELECT version()`, or `unknown`.
    pub version: String,
    /// First session properties from `SHOW SESSION`.
    pub session_properties: BTreeMap<String, String>,
    /// Number of cluster nodes, if known.
    pub cluster_nodes: Option<u64>,
    /// Number of coordinator nodes, if known.
    pub coordinator_count: Option<u64>,
}

/// Hardware and OS of the machine running the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// Host name.
    pub hostname: String,
    /// CPU model name.
    pub cpu_model: String,
    /// Logical CPU count.
    pub cpu_cores: u64,
    /// Total RAM in MiB (0 if unknown).
    pub total_ram_mb: u64,
    /// Kernel release.
    pub os_kernel: String,
    /// Operating system family.
    pub client_os: String,
}

/// Connection and iteration settings recorded alongside results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedConfig {
    /// Measured runs per query.
    pub iterations: u32,
    /// Warmup runs per query.
    pub warmup_runs: u32,
    /// Connection settings.
    pub connection: BTreeMap<String, String>,
}

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// RFC 3339 start time of the run.
    pub timestamp: String,
    /// Engine name.
    pub system: String,
    /// Engine details.
    pub engine: EngineInfo,
    /// Driver host details.
    pub host: HostInfo,
    /// Driver version.
    pub client_version: String,
    /// Benchmark settings.
    pub benchmark_config: RecordedConfig,
}

/// Paths and summaries produced by a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    /// Per-query medians keyed by query file name.
    pub summaries: BTreeMap<String, QuerySummary>,
    /// Row count of the benchmark table, if it could be determined.
    pub table_rows: Option<u64>,
    /// Path of `results.csv`.
    pub results_path: PathBuf,
    /// Path of `metadata.json`.
    pub metadata_path: PathBuf,
    /// Path of `stats.json`.
    pub stats_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_renders_like_the_results_file() {
        assert_eq!(RunStatus::Success.to_string(), "SUCCESS");
        assert_eq!(
            RunStatus::Error("line 1:8: mismatched input".to_string()).to_string(),
            "ERROR: line 1:8: mismatched input"
        );
    }

    #[test]
    fn partial_toml_style_config_falls_back_to_defaults() {
        let config: BenchmarkConfig =
            serde_json::from_str(r#"{"host": "trino", "iterations": 10}"#).unwrap();
        assert_eq!(config.host, "trino");
        assert_eq!(config.iterations, 10);
        assert_eq!(config.port, 8080);
        assert_eq!(config.base_url(), "http://trino:8080");
    }

    #[test]
    fn missing_query_id_is_reported_as_unavailable() {
        let metrics = IterationMetrics {
            runtime_sec: 1.0,
            client_runtime_sec: 1.0,
            rows_returned: 0,
            input_rows_processed: 0,
            throughput_input_rows_per_sec: 0.0,
            cpu_seconds: None,
            peak_memory_mb: None,
            status: RunStatus::Error("boom".to_string()),
            query_id: None,
            stats_source: StatsSource::ClientOnly,
        };
        let row = ResultRow::new("q1.sql", 2, &metrics);
        assert_eq!(row.query_id, "unavailable");
        assert_eq!(row.status, "ERROR: boom");
        assert_eq!(row.system, "trino");
    }
}
