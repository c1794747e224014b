//! Scripted [`QueryEngine`] for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crime_bench_benchmark_models::ServerStats;
use serde_json::Value;

use crate::BenchError;
use crate::engine::{QueryEngine, QueryResult};

pub enum Reply {
    Rows(Vec<Vec<Value>>),
    Fail(&'static str),
}

/// Answers each statement with the first reply whose key the SQL contains,
/// or an empty result. Every query gets a fresh id `q<n>`.
#[derive(Default)]
pub struct FakeEngine {
    replies: Vec<(&'static str, Reply)>,
    stats: Option<ServerStats>,
    counter: AtomicU64,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn reply(mut self, key: &'static str, reply: Reply) -> Self {
        self.replies.push((key, reply));
        self
    }

    pub fn with_stats(mut self, stats: ServerStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|sql| sql.contains(needle))
            .count()
    }
}

#[async_trait::async_trait]
impl QueryEngine for FakeEngine {
    async fn execute(&self, sql: &str) -> Result<QueryResult, BenchError> {
        self.calls.lock().unwrap().push(sql.to_string());
        let id = format!("q{}", self.counter.fetch_add(1, Ordering::SeqCst));

        match self.replies.iter().find(|(key, _)| sql.contains(key)) {
            Some((_, Reply::Fail(message))) => Err(BenchError::Query {
                query_id: Some(id),
                message: (*message).to_string(),
            }),
            Some((_, Reply::Rows(rows))) => Ok(QueryResult {
                query_id: Some(id),
                columns: vec!["_col0".to_string()],
                rows: rows.clone(),
            }),
            None => Ok(QueryResult {
                query_id: Some(id),
                ..QueryResult::default()
            }),
        }
    }

    async fn query_stats(&self, query_id: &str) -> Result<Option<ServerStats>, BenchError> {
        Ok(self.stats.clone().map(|stats| ServerStats {
            query_id: query_id.to_string(),
            ..stats
        }))
    }
}
