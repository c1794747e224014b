//! Loads the `MATCH_RECOGNIZE` query library from a directory of `.sql`
//! files.

use std::path::Path;

use crime_bench_benchmark_models::QuerySpec;

use crate::BenchError;

/// Normalizes a query file's contents: trims whitespace and drops trailing
/// semicolons, which the statement endpoint rejects.
#[must_use]
pub fn normalize_sql(raw: &str) -> String {
    raw.trim().trim_end_matches(';').trim_end().to_string()
}

/// Reads every `*.sql` file in `dir`, sorted by file name.
///
/// Files that are empty after normalization are skipped with a warning.
///
/// # Errors
///
/// * [`BenchError::Io`] if the directory or a file cannot be read
/// * [`BenchError::Config`] if the directory holds no runnable query
pub fn load_queries(dir: &Path) -> Result<Vec<QuerySpec>, BenchError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(BenchError::io(dir))? {
        let path = entry.map_err(BenchError::io(dir))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut queries = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let raw = std::fs::read_to_string(&path).map_err(BenchError::io(&path))?;
        let sql = normalize_sql(&raw);
        if sql.is_empty() {
            log::warn!("Skipping empty query file {}", path.display());
            continue;
        }
        queries.push(QuerySpec { name, sql });
    }

    if queries.is_empty() {
        return Err(BenchError::Config(format!(
            "no .sql queries found in {}",
            dir.display()
        )));
    }

    log::info!("Loaded {} queries from {}", queries.len(), dir.display());
    Ok(queries)
}
