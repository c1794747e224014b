#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Progress reporting for dataset generation and benchmark runs.
//!
//! Library code reports through [`ProgressCallback`] and never talks to a
//! terminal directly. Binaries pick the rendering (an `indicatif` bar in
//! `crime_bench_cli_utils`), tests pass [`null_progress()`] or a
//! [`CountingProgress`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives progress updates from a long-running operation.
///
/// Units are operation specific: rows for dataset generation, measured
/// queries for a benchmark run.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// Tallies reported units without rendering anything.
///
/// Lets callers check how much work an operation reported, e.g. that a
/// generation run advanced by exactly the number of rows it wrote.
#[derive(Debug, Default)]
pub struct CountingProgress {
    total: AtomicU64,
    position: AtomicU64,
}

impl CountingProgress {
    /// Last value passed to [`ProgressCallback::set_total`].
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Sum of all increments so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }
}

impl ProgressCallback for CountingProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.position.store(0, Ordering::Relaxed);
    }

    fn inc(&self, delta: u64) {
        self.position.fetch_add(delta, Ordering::Relaxed);
    }

    fn set_message(&self, _msg: String) {}

    fn finish(&self, _msg: String) {}
}
