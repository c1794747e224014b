//! Run metadata: engine version, cluster shape and the driver's host.
//!
//! Every lookup is best effort. A value that cannot be determined is
//! recorded as `unknown` (or left empty) and never fails the run.

use std::collections::BTreeMap;
use std::path::Path;

use crime_bench_benchmark_models::{
    BenchmarkConfig, EngineInfo, HostInfo, RecordedConfig, RunMetadata, SYSTEM_NAME,
};
use serde_json::Value;

use crate::engine::QueryEngine;

/// Session properties recorded in the metadata.
const MAX_SESSION_PROPERTIES: usize = 10;

const UNKNOWN: &str = "unknown";

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Collects engine details through SQL.
pub async fn engine_info(engine: &dyn QueryEngine) -> EngineInfo {
    let mut info = EngineInfo {
        version: UNKNOWN.to_string(),
        ..EngineInfo::default()
    };

    match engine.execute("SELECT version()").await {
        Ok(result) => {
            if let Some(version) = result.scalar() {
                info.version = value_to_string(version);
            }
        }
        Err(e) => log::warn!("Could not read engine version: {e}"),
    }

    match engine.execute("SHOW SESSION").await {
        Ok(result) => {
            info.session_properties = result
                .rows
                .iter()
                .filter_map(|row| match row.as_slice() {
                    [name, value, ..] => Some((value_to_string(name), value_to_string(value))),
                    _ => None,
                })
                .take(MAX_SESSION_PROPERTIES)
                .collect();
        }
        Err(e) => log::warn!("Could not read session properties: {e}"),
    }

    match engine
        .execute("SELECT node_id, coordinator FROM system.runtime.nodes")
        .await
    {
        Ok(result) => {
            info.cluster_nodes = Some(result.rows.len() as u64);
            info.coordinator_count = Some(
                result
                    .rows
                    .iter()
                    .filter(|row| row.get(1).and_then(Value::as_bool) == Some(true))
                    .count() as u64,
            );
        }
        Err(e) => log::warn!("Could not read cluster nodes: {e}"),
    }

    info
}

/// Value of the first `key : value` line in `/proc/cpuinfo` style text.
#[must_use]
pub fn proc_field<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        (name.trim() == key).then_some(value.trim())
    })
}

/// `MemTotal` from `/proc/meminfo` text, in MiB.
#[must_use]
pub fn mem_total_mb(meminfo: &str) -> Option<u64> {
    let raw = proc_field(meminfo, "MemTotal")?;
    let kib: u64 = raw.trim_end_matches("kB").trim().parse().ok()?;
    Some(kib / 1_024)
}

fn read_trimmed(path: &str) -> Option<String> {
    std::fs::read_to_string(Path::new(path))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects details of the machine running the driver.
#[must_use]
pub fn host_info() -> HostInfo {
    let cpuinfo = read_trimmed("/proc/cpuinfo").unwrap_or_default();
    let meminfo = read_trimmed("/proc/meminfo").unwrap_or_default();

    HostInfo {
        hostname: read_trimmed("/proc/sys/kernel/hostname")
            .or_else(|| std::env::var("HOSTNAME").ok())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        cpu_model: proc_field(&cpuinfo, "model name")
            .map_or_else(|| UNKNOWN.to_string(), str::to_string),
        cpu_cores: std::thread::available_parallelism().map_or(0, |n| n.get() as u64),
        total_ram_mb: mem_total_mb(&meminfo).unwrap_or(0),
        os_kernel: read_trimmed("/proc/sys/kernel/osrelease")
            .unwrap_or_else(|| UNKNOWN.to_string()),
        client_os: std::env::consts::OS.to_string(),
    }
}

/// Settings recorded alongside the results.
#[must_use]
pub fn recorded_config(config: &BenchmarkConfig) -> RecordedConfig {
    RecordedConfig {
        iterations: config.iterations,
        warmup_runs: config.warmup_runs,
        connection: BTreeMap::from([
            ("host".to_string(), config.host.clone()),
            ("port".to_string(), config.port.to_string()),
            ("user".to_string(), config.user.clone()),
            ("catalog".to_string(), config.catalog.clone()),
            ("schema".to_string(), config.schema.clone()),
        ]),
    }
}

/// Collects the full metadata of a run.
pub async fn collect(engine: &dyn QueryEngine, config: &BenchmarkConfig) -> RunMetadata {
    RunMetadata {
        timestamp: chrono::Utc::now().to_rfc3339(),
        system: SYSTEM_NAME.to_string(),
        engine: engine_info(engine).await,
        host: host_info(),
        client_version: env!("CARGO_PKG_VERSION").to_string(),
        benchmark_config: recorded_config(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_cpu_model_from_cpuinfo() {
        let cpuinfo = "processor\t: 0\nvendor_id\t: GenuineIntel\n\
                       model name\t: Intel(R) Xeon(R) CPU @ 2.20GHz\nflags\t\t: fpu\n";
        assert_eq!(
            proc_field(cpuinfo, "model name"),
            Some("Intel(R) Xeon(R) CPU @ 2.20GHz")
        );
        assert_eq!(proc_field(cpuinfo, "cache size"), None);
    }

    #[test]
    fn reads_total_memory_in_mebibytes() {
        let meminfo = "MemTotal:       16384000 kB\nMemFree:         1024 kB\n";
        assert_eq!(mem_total_mb(meminfo), Some(16_000));
        assert_eq!(mem_total_mb("MemFree: 1 kB"), None);
    }

    #[test]
    fn recorded_config_lists_connection_settings() {
        let recorded = recorded_config(&BenchmarkConfig::default());
        assert_eq!(recorded.iterations, 5);
        assert_eq!(recorded.warmup_runs, 1);
        assert_eq!(recorded.connection["port"], "8080");
        assert_eq!(recorded.connection["catalog"], "postgres");
    }

    #[test]
    fn host_info_always_has_values() {
        let host = host_info();
        assert!(!host.hostname.is_empty());
        assert!(!host.client_os.is_empty());
    }
}
