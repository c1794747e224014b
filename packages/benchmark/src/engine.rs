//! Seam between the benchmark runner and the SQL engine under test.

use crime_bench_benchmark_models::ServerStats;
use serde_json::Value;

use crate::BenchError;

/// Rows of a finished query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Engine query id, if the engine assigned one.
    pub query_id: Option<String>,
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Result rows as JSON values.
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// First column of the first row, if present.
    #[must_use]
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// An engine that can run SQL and report statistics for finished queries.
#[async_trait::async_trait]
pub trait QueryEngine: Send + Sync {
    /// Runs `sql` to completion and fetches all result rows.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::Query`] if the engine reports a query failure,
    /// or a transport error if the engine cannot be reached.
    async fn execute(&self, sql: &str) -> Result<QueryResult, BenchError>;

    /// Fetches server-side statistics for a finished query.
    ///
    /// Returns `Ok(None)` if the engine no longer knows the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be reached or answers with an
    /// unexpected payload.
    async fn query_stats(&self, query_id: &str) -> Result<Option<ServerStats>, BenchError>;
}
