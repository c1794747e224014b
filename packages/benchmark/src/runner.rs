//! Warmup, measurement and persistence of a benchmark run.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crime_bench_benchmark_models::{
    BenchmarkConfig, BenchmarkReport, IterationMetrics, QuerySpec, QuerySummary, RESULT_COLUMNS,
    ResultRow, RunMetadata, RunStatus, ServerStats, StatsSource,
};
use crime_bench_progress::ProgressCallback;
use serde::Serialize;

use crate::engine::QueryEngine;
use crate::{BenchError, metadata, queries, stats};

/// Per-iteration results file.
pub const RESULTS_FILE: &str = "results.csv";
/// Run metadata file.
pub const METADATA_FILE: &str = "metadata.json";
/// Per-query summary file.
pub const STATS_FILE: &str = "stats.json";

/// Samples needed before quartiles are logged.
const MIN_QUARTILE_SAMPLES: usize = 4;

/// Combines client timing with optional server statistics.
///
/// Server values win when positive: elapsed time becomes the runtime and
/// physical input rows the processed row count. Otherwise the client time
/// and `table_rows` are used. Zero CPU time or memory is treated as not
/// reported.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn combine_metrics(
    client_runtime_sec: f64,
    rows_returned: u64,
    status: RunStatus,
    query_id: Option<String>,
    server: Option<&ServerStats>,
    table_rows: Option<u64>,
) -> IterationMetrics {
    let fallback_rows = table_rows.unwrap_or(0);
    let positive = |v: &f64| *v > 0.0;

    let (runtime_sec, input_rows_processed, cpu_seconds, peak_memory_mb, stats_source) =
        match server {
            Some(server) => (
                server
                    .elapsed_seconds
                    .filter(positive)
                    .unwrap_or(client_runtime_sec),
                server
                    .physical_input_rows
                    .filter(|&n| n > 0)
                    .unwrap_or(fallback_rows),
                server.cpu_seconds.filter(positive),
                server.peak_memory_mb.filter(positive),
                StatsSource::RestApi,
            ),
            None => (
                client_runtime_sec,
                fallback_rows,
                None,
                None,
                StatsSource::ClientOnly,
            ),
        };

    let throughput_input_rows_per_sec = if input_rows_processed > 0 && runtime_sec > 0.0 {
        input_rows_processed as f64 / runtime_sec
    } else {
        0.0
    };

    IterationMetrics {
        runtime_sec,
        client_runtime_sec,
        rows_returned,
        input_rows_processed,
        throughput_input_rows_per_sec,
        cpu_seconds,
        peak_memory_mb,
        status,
        query_id,
        stats_source,
    }
}

/// Fetches server statistics, logging instead of failing.
async fn server_stats(engine: &dyn QueryEngine, query_id: &str) -> Option<ServerStats> {
    match engine.query_stats(query_id).await {
        Ok(stats) => stats,
        Err(e) => {
            log::warn!("    Server statistics unavailable for {query_id}: {e}");
            None
        }
    }
}

/// Executes `sql` once and measures it.
///
/// A failing query produces metrics with an error status; it never
/// returns an error.
pub async fn measure(
    engine: &dyn QueryEngine,
    sql: &str,
    table_rows: Option<u64>,
) -> IterationMetrics {
    let started = Instant::now();
    let outcome = engine.execute(sql).await;
    let client_runtime_sec = started.elapsed().as_secs_f64();

    let (status, rows_returned, query_id) = match outcome {
        Ok(result) => (
            RunStatus::Success,
            result.rows.len() as u64,
            result.query_id,
        ),
        Err(e) => (
            RunStatus::Error(e.to_string()),
            0,
            e.query_id().map(str::to_string),
        ),
    };

    let server = match &query_id {
        Some(id) => server_stats(engine, id).await,
        None => None,
    };

    combine_metrics(
        client_runtime_sec,
        rows_returned,
        status,
        query_id,
        server.as_ref(),
        table_rows,
    )
}

/// Runs the connectivity probe and returns the table's row count.
///
/// # Errors
///
/// Returns the engine error if the probe query fails, which means the
/// engine or the table is unreachable.
async fn probe(engine: &dyn QueryEngine, table: &str) -> Result<Option<u64>, BenchError> {
    let result = engine
        .execute(&format!("SELECT count(*) FROM {table}"))
        .await?;
    let rows = result.scalar().and_then(serde_json::Value::as_u64);

    match &result.query_id {
        Some(id) => match server_stats(engine, id).await {
            Some(stats) => log::info!(
                "Server statistics available (probe {id}: state {}, elapsed {})",
                stats.state,
                stats.elapsed_time.as_deref().unwrap_or("n/a")
            ),
            None => log::warn!("Server statistics unavailable; metrics fall back to client timing"),
        },
        None => log::warn!("Engine did not return a query id; metrics fall back to client timing"),
    }

    match rows {
        Some(n) => log::info!("Table {table} holds {n} rows"),
        None => log::warn!("Could not determine the row count of {table}"),
    }
    Ok(rows)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BenchError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(BenchError::io(path))
}

fn log_metadata(metadata: &RunMetadata) {
    log::info!("System: {}", metadata.system);
    log::info!("Engine version: {}", metadata.engine.version);
    match metadata.engine.cluster_nodes {
        Some(nodes) => log::info!("Cluster nodes: {nodes}"),
        None => log::info!("Cluster nodes: n/a"),
    }
    log::info!(
        "Host: {} ({}, {} cores, {} MiB RAM)",
        metadata.host.hostname,
        metadata.host.cpu_model,
        metadata.host.cpu_cores,
        metadata.host.total_ram_mb
    );
}

fn log_iteration(iteration: u32, metrics: &IterationMetrics) {
    if let RunStatus::Error(message) = &metrics.status {
        log::warn!("  Iteration {iteration}: FAILED: {message}");
        return;
    }
    log::info!(
        "  Iteration {iteration}: {:.3}s, {} rows returned, {:.0} input rows/s{}{}",
        metrics.runtime_sec,
        metrics.rows_returned,
        metrics.throughput_input_rows_per_sec,
        metrics
            .cpu_seconds
            .map(|cpu| format!(", cpu {cpu:.3}s"))
            .unwrap_or_default(),
        metrics
            .peak_memory_mb
            .map(|mb| format!(", peak {mb:.2} MiB"))
            .unwrap_or_default(),
    );
}

fn log_summary(name: &str, iterations: &[IterationMetrics], summary: &QuerySummary) {
    let runtimes: Vec<f64> = iterations
        .iter()
        .filter(|m| m.status.is_success())
        .map(|m| m.runtime_sec)
        .collect();
    log::info!(
        "  {name}: {}/{} iterations succeeded",
        runtimes.len(),
        iterations.len()
    );

    let Some(median) = summary.runtime_median else {
        return;
    };
    let min = runtimes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = runtimes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    log::info!("  Runtime median {median:.3}s (range {min:.3}s .. {max:.3}s)");

    if runtimes.len() >= MIN_QUARTILE_SAMPLES
        && let Some([q1, _, q3]) = stats::quartiles(&runtimes)
    {
        log::info!("  Runtime Q1 {q1:.3}s, Q3 {q3:.3}s");
    }
    if let Some(throughput) = summary.throughput_median {
        log::info!("  Throughput median {throughput:.0} input rows/s");
    }
}

/// Runs one query: warmup runs, then measured iterations appended to
/// `results`.
async fn run_query<W: std::io::Write>(
    engine: &dyn QueryEngine,
    config: &BenchmarkConfig,
    query: &QuerySpec,
    table_rows: Option<u64>,
    results: &mut csv::Writer<W>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<IterationMetrics>, BenchError> {
    for run in 1..=config.warmup_runs {
        if let Err(e) = engine.execute(&query.sql).await {
            log::warn!("  Warmup {run}/{} failed: {e}", config.warmup_runs);
        }
    }

    let mut iterations = Vec::with_capacity(config.iterations as usize);
    for iteration in 1..=config.iterations {
        let metrics = measure(engine, &query.sql, table_rows).await;
        log_iteration(iteration, &metrics);

        results.serialize(ResultRow::new(&query.name, iteration, &metrics))?;
        results.flush().map_err(|e| BenchError::Csv(e.into()))?;
        progress.inc(1);

        iterations.push(metrics);
    }
    Ok(iterations)
}

/// Runs the complete benchmark described by `config` against `engine`.
///
/// Query failures are recorded as error rows and do not abort the run.
///
/// # Errors
///
/// * [`BenchError::Config`] for zero iterations or an empty query library
/// * the engine error if the connectivity probe fails
/// * [`BenchError::Io`], [`BenchError::Csv`] or [`BenchError::Json`] if
///   the output files cannot be written
pub async fn run_benchmark(
    engine: &dyn QueryEngine,
    config: &BenchmarkConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<BenchmarkReport, BenchError> {
    if config.iterations == 0 {
        return Err(BenchError::Config("iterations must be positive".to_string()));
    }
    let queries = queries::load_queries(&config.query_dir)?;

    let output_dir = &config.output_dir;
    std::fs::create_dir_all(output_dir).map_err(BenchError::io(output_dir))?;

    log::info!("Connecting to {}", config.base_url());
    let table_rows = probe(engine, &config.table).await?;

    let metadata = metadata::collect(engine, config).await;
    log_metadata(&metadata);
    let metadata_path = output_dir.join(METADATA_FILE);
    write_json(&metadata_path, &metadata)?;

    let results_path = output_dir.join(RESULTS_FILE);
    let file = File::create(&results_path).map_err(BenchError::io(&results_path))?;
    let mut results = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    results.write_record(RESULT_COLUMNS)?;

    progress.set_total(queries.len() as u64 * u64::from(config.iterations));

    let mut summaries = BTreeMap::new();
    for query in &queries {
        log::info!("Running {}", query.name);
        progress.set_message(query.name.clone());

        let iterations =
            run_query(engine, config, query, table_rows, &mut results, progress).await?;
        let summary = stats::summarize(&iterations);
        log_summary(&query.name, &iterations, &summary);
        summaries.insert(query.name.clone(), summary);
    }

    let stats_path = output_dir.join(STATS_FILE);
    write_json(&stats_path, &summaries)?;

    progress.finish(format!("{} queries benchmarked", queries.len()));
    log::info!("Results saved to {}", results_path.display());

    Ok(BenchmarkReport {
        summaries,
        table_rows,
        results_path,
        metadata_path,
        stats_path,
    })
}

#[cfg(test)]
mod tests {
    use crime_bench_progress::CountingProgress;
    use serde_json::json;

    use super::*;
    use crate::fake::{FakeEngine, Reply};

    fn server(elapsed: f64, input_rows: u64, cpu: f64) -> ServerStats {
        ServerStats {
            state: "FINISHED".to_string(),
            elapsed_seconds: Some(elapsed),
            physical_input_rows: Some(input_rows),
            cpu_seconds: Some(cpu),
            peak_memory_mb: Some(0.0),
            ..ServerStats::default()
        }
    }

    fn config_in(root: &Path) -> BenchmarkConfig {
        let query_dir = root.join("queries");
        std::fs::create_dir_all(&query_dir).unwrap();
        std::fs::write(query_dir.join("q1_streak.sql"), "SELECT 'streak';\n").unwrap();
        std::fs::write(query_dir.join("q2_broken.sql"), "SELECT 'broken'").unwrap();
        BenchmarkConfig {
            iterations: 3,
            warmup_runs: 2,
            query_dir,
            output_dir: root.join("output"),
            ..BenchmarkConfig::default()
        }
    }

    #[test]
    fn server_values_take_precedence_when_positive() {
        let stats = server(2.0, 1_000, 0.5);
        let metrics = combine_metrics(
            3.0,
            7,
            RunStatus::Success,
            Some("q1".to_string()),
            Some(&stats),
            Some(50),
        );

        assert_eq!(metrics.runtime_sec, 2.0);
        assert_eq!(metrics.client_runtime_sec, 3.0);
        assert_eq!(metrics.input_rows_processed, 1_000);
        assert_eq!(metrics.throughput_input_rows_per_sec, 500.0);
        assert_eq!(metrics.cpu_seconds, Some(0.5));
        assert_eq!(metrics.peak_memory_mb, None);
        assert_eq!(metrics.stats_source, StatsSource::RestApi);
    }

    #[test]
    fn zero_server_values_fall_back_to_client_and_table() {
        let stats = server(0.0, 0, 0.0);
        let metrics = combine_metrics(4.0, 0, RunStatus::Success, None, Some(&stats), Some(100));

        assert_eq!(metrics.runtime_sec, 4.0);
        assert_eq!(metrics.input_rows_processed, 100);
        assert_eq!(metrics.throughput_input_rows_per_sec, 25.0);
        assert_eq!(metrics.cpu_seconds, None);
    }

    #[test]
    fn client_only_metrics_without_server_stats() {
        let metrics = combine_metrics(
            0.0,
            0,
            RunStatus::Error("boom".to_string()),
            None,
            None,
            None,
        );

        assert_eq!(metrics.stats_source, StatsSource::ClientOnly);
        assert_eq!(metrics.input_rows_processed, 0);
        assert_eq!(metrics.throughput_input_rows_per_sec, 0.0);
    }

    #[tokio::test]
    async fn failed_query_is_measured_not_propagated() {
        let engine = FakeEngine::default().reply("broken", Reply::Fail("syntax error"));

        let metrics = measure(&engine, "SELECT 'broken'", Some(50)).await;

        assert_eq!(
            metrics.status,
            RunStatus::Error("syntax error".to_string())
        );
        assert_eq!(metrics.rows_returned, 0);
        assert_eq!(metrics.query_id.as_deref(), Some("q0"));
    }

    #[tokio::test]
    async fn full_run_writes_results_metadata_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let engine = FakeEngine::default()
            .reply("count(*)", Reply::Rows(vec![vec![json!(50)]]))
            .reply("version()", Reply::Rows(vec![vec![json!("476")]]))
            .reply("broken", Reply::Fail("line 1:8: mismatched input"))
            .reply("streak", Reply::Rows(vec![vec![json!("Mitte")]; 2]))
            .with_stats(server(0.25, 50, 0.1));
        let counting = Arc::new(CountingProgress::default());
        let progress: Arc<dyn ProgressCallback> = counting.clone();

        let report = run_benchmark(&engine, &config, &progress).await.unwrap();

        assert_eq!(report.table_rows, Some(50));
        assert_eq!(counting.total(), 6);
        assert_eq!(counting.position(), 6);
        assert_eq!(engine.calls_containing("'streak'"), 5);
        assert_eq!(engine.calls_containing("'broken'"), 5);

        let mut reader = csv::Reader::from_path(&report.results_path).unwrap();
        assert_eq!(reader.headers().unwrap(), RESULT_COLUMNS.as_slice());
        let rows: Vec<ResultRow> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].query_pattern, "q1_streak.sql");
        assert_eq!(rows[0].status, "SUCCESS");
        assert_eq!(rows[0].rows_returned, 2);
        assert_eq!(rows[0].runtime_sec, 0.25);
        assert_eq!(rows[0].throughput_input_rows_per_sec, 200.0);
        assert_eq!(rows[0].peak_memory_mb, None);
        assert_eq!(rows[3].status, "ERROR: line 1:8: mismatched input");

        let stats: BTreeMap<String, QuerySummary> =
            serde_json::from_str(&std::fs::read_to_string(&report.stats_path).unwrap()).unwrap();
        assert_eq!(stats["q1_streak.sql"].runtime_median, Some(0.25));
        assert_eq!(stats["q2_broken.sql"], QuerySummary::default());

        let metadata: RunMetadata =
            serde_json::from_str(&std::fs::read_to_string(&report.metadata_path).unwrap())
                .unwrap();
        assert_eq!(metadata.engine.version, "476");
        assert_eq!(metadata.benchmark_config.iterations, 3);
    }

    #[tokio::test]
    async fn unreachable_table_aborts_before_writing_results() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let engine = FakeEngine::default().reply("count(*)", Reply::Fail("table not found"));

        let err = run_benchmark(&engine, &config, &crime_bench_progress::null_progress())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "table not found");
        assert!(!config.output_dir.join(RESULTS_FILE).exists());
    }

    #[tokio::test]
    async fn zero_iterations_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchmarkConfig {
            iterations: 0,
            ..config_in(dir.path())
        };
        let engine = FakeEngine::default();

        assert!(matches!(
            run_benchmark(&engine, &config, &crime_bench_progress::null_progress()).await,
            Err(BenchError::Config(_))
        ));
        assert!(engine.calls.lock().unwrap().is_empty());
    }
}
