//! [`QueryEngine`] over the Trino REST API.
//!
//! Statements are submitted with `POST /v1/statement` and driven to
//! completion by following `nextUri` until the coordinator stops returning
//! one. Statistics for a finished query come from `GET /v1/query/{id}`.

use std::time::Duration;

use crime_bench_benchmark_models::{BenchmarkConfig, ServerStats};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::Value;

use crate::engine::{QueryEngine, QueryResult};
use crate::{BenchError, retry, units};

/// Value of the `X-Trino-Source` header.
const CLIENT_SOURCE: &str = "crime-bench";

/// Per-request timeout. Each protocol call is a short poll, so this bounds
/// a single HTTP exchange and not the query.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const CPU_TIME_KEYS: [&str; 2] = ["totalCpuTime", "cpuTime"];
const ELAPSED_TIME_KEYS: [&str; 2] = ["elapsedTime", "executionTime"];
const PEAK_MEMORY_KEYS: [&str; 6] = [
    "peakMemoryReservation",
    "peakUserMemoryReservation",
    "peakTotalMemoryReservation",
    "peakTaskUserMemory",
    "peakUserMemory",
    "peakTotalMemory",
];
const STAGE_PEAK_MEMORY_KEYS: [&str; 2] = ["peakUserMemoryReservation", "peakMemoryReservation"];
const INPUT_ROW_KEYS: [&str; 7] = [
    "physicalInputRows",
    "physicalInputPositions",
    "processedInputRows",
    "processedInputPositions",
    "rawInputRows",
    "rawInputPositions",
    "inputRows",
];
const OUTPUT_ROW_KEYS: [&str; 3] = ["outputRows", "outputPositions", "completedRows"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementPage {
    id: String,
    next_uri: Option<String>,
    columns: Option<Vec<Column>>,
    data: Option<Vec<Vec<Value>>>,
    error: Option<EngineError>,
}

#[derive(Debug, Deserialize)]
struct Column {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EngineError {
    message: String,
    error_name: Option<String>,
}

impl EngineError {
    fn into_bench_error(self, query_id: String) -> BenchError {
        let message = match self.error_name {
            Some(name) => format!("{name}: {}", self.message),
            None => self.message,
        };
        BenchError::Query {
            query_id: Some(query_id),
            message,
        }
    }
}

/// Trino coordinator client.
pub struct TrinoEngine {
    client: reqwest::Client,
    base_url: String,
}

impl TrinoEngine {
    /// Creates a client for the coordinator and session described by
    /// `config`.
    ///
    /// # Errors
    ///
    /// * [`BenchError::Config`] if a session value cannot be sent as an HTTP
    ///   header
    /// * [`BenchError::Http`] if the HTTP client cannot be built
    pub fn new(config: &BenchmarkConfig) -> Result<Self, BenchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            ("x-trino-user", config.user.as_str()),
            ("x-trino-catalog", config.catalog.as_str()),
            ("x-trino-schema", config.schema.as_str()),
            ("x-trino-source", CLIENT_SOURCE),
        ] {
            let value = HeaderValue::from_str(value)
                .map_err(|e| BenchError::Config(format!("invalid {name} header {value:?}: {e}")))?;
            headers.insert(HeaderName::from_static(name), value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
        })
    }
}

#[async_trait::async_trait]
impl QueryEngine for TrinoEngine {
    async fn execute(&self, sql: &str) -> Result<QueryResult, BenchError> {
        let url = format!("{}/v1/statement", self.base_url);
        let body = retry::send_json(|| self.client.post(&url).body(sql.to_string())).await?;
        let mut page: StatementPage = serde_json::from_value(body)?;
        log::debug!("Submitted query {}", page.id);

        let mut result = QueryResult {
            query_id: Some(page.id.clone()),
            ..QueryResult::default()
        };

        loop {
            if let Some(error) = page.error {
                return Err(error.into_bench_error(page.id));
            }
            if result.columns.is_empty()
                && let Some(columns) = page.columns
            {
                result.columns = columns.into_iter().map(|c| c.name).collect();
            }
            if let Some(data) = page.data {
                result.rows.extend(data);
            }

            let Some(next_uri) = page.next_uri else {
                break;
            };
            let body = retry::send_json(|| self.client.get(&next_uri)).await?;
            page = serde_json::from_value(body)?;
        }

        Ok(result)
    }

    async fn query_stats(&self, query_id: &str) -> Result<Option<ServerStats>, BenchError> {
        let url = format!("{}/v1/query/{query_id}", self.base_url);
        let info = retry::send_json(|| self.client.get(&url)).await?;
        Ok(parse_query_info(query_id, &info))
    }
}

/// First non-empty string among `keys` of `object`.
fn first_str<'a>(object: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| object.get(*key)?.as_str())
        .find(|s| !s.trim().is_empty())
}

/// First positive count among `keys` of `object`.
fn first_count(object: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|key| object.get(*key)?.as_u64())
        .find(|&n| n > 0)
}

/// Reads a duration either from a human-readable field or from its
/// `<key>Millis` numeric variant.
fn duration_field(stats: &Value, keys: &[&str]) -> (Option<String>, Option<f64>) {
    if let Some(raw) = first_str(stats, keys) {
        return (Some(raw.to_string()), units::parse_duration_seconds(raw));
    }
    let millis = keys
        .iter()
        .find_map(|key| stats.get(format!("{key}Millis"))?.as_f64());
    (millis.map(|ms| format!("{ms}ms")), millis.map(|ms| ms / 1_000.0))
}

/// Extracts [`ServerStats`] from a `GET /v1/query/{id}` payload.
///
/// Field names differ between Trino versions, so each metric is looked up
/// under several names. Peak memory falls back to the output stage when
/// the query-level fields are missing. Returns `None` when the payload has
/// no `queryStats` object.
#[must_use]
pub fn parse_query_info(query_id: &str, info: &Value) -> Option<ServerStats> {
    let stats = info.get("queryStats").filter(|s| s.is_object())?;

    let (cpu_time, cpu_seconds) = duration_field(stats, &CPU_TIME_KEYS);
    let (elapsed_time, elapsed_seconds) = duration_field(stats, &ELAPSED_TIME_KEYS);

    let peak_memory = first_str(stats, &PEAK_MEMORY_KEYS).or_else(|| {
        let stage_stats = info.get("outputStage")?.get("stageStats")?;
        first_str(stage_stats, &STAGE_PEAK_MEMORY_KEYS)
    });

    Some(ServerStats {
        query_id: query_id.to_string(),
        state: info
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string(),
        cpu_time,
        cpu_seconds,
        elapsed_time,
        elapsed_seconds,
        peak_memory: peak_memory.map(str::to_string),
        peak_memory_mb: peak_memory.and_then(units::parse_data_size_mb),
        physical_input_rows: first_count(stats, &INPUT_ROW_KEYS),
        output_rows: first_count(stats, &OUTPUT_ROW_KEYS),
    })
}
