//! Summary statistics over measured iterations.

use crime_bench_benchmark_models::{IterationMetrics, QuerySummary};

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Median of `values`; the mean of the two middle values for even counts.
///
/// NaN values are ignored. Returns `None` when nothing remains.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted(values);
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some(f64::midpoint(sorted[n / 2 - 1], sorted[n / 2])),
    }
}

/// Quartile cut points (Q1, Q2, Q3) using the exclusive method.
///
/// Cut point `i` sits at position `i * (n + 1) / 4` of the sorted data,
/// interpolating linearly between neighbours. Positions outside the data
/// extend the first or last interval. Needs at least two values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn quartiles(values: &[f64]) -> Option<[f64; 3]> {
    const PARTS: usize = 4;
    let sorted = sorted(values);
    let n = sorted.len();
    if n < 2 {
        return None;
    }

    let m = n + 1;
    let mut cuts = [0.0; 3];
    for (i, cut) in (1..PARTS).zip(cuts.iter_mut()) {
        let j = (i * m / PARTS).clamp(1, n - 1);
        // Negative or > PARTS when j was clamped: extrapolates linearly.
        let delta = (i * m) as f64 - (j * PARTS) as f64;
        *cut = sorted[j - 1].mul_add(PARTS as f64 - delta, sorted[j] * delta) / PARTS as f64;
    }
    Some(cuts)
}

/// Medians of the successful iterations of one query.
///
/// CPU and memory medians only consider iterations that reported them.
#[must_use]
pub fn summarize(iterations: &[IterationMetrics]) -> QuerySummary {
    let ok: Vec<&IterationMetrics> = iterations.iter().filter(|m| m.status.is_success()).collect();
    let collect = |f: fn(&IterationMetrics) -> Option<f64>| -> Vec<f64> {
        ok.iter().filter_map(|&m| f(m)).collect()
    };

    QuerySummary {
        runtime_median: median(&collect(|m| Some(m.runtime_sec))),
        throughput_median: median(&collect(|m| Some(m.throughput_input_rows_per_sec))),
        cpu_median: median(&collect(|m| m.cpu_seconds)),
        memory_median: median(&collect(|m| m.peak_memory_mb)),
    }
}

#[cfg(test)]
mod tests {
    use crime_bench_benchmark_models::{RunStatus, StatsSource};

    use super::*;

    fn iteration(runtime: f64, cpu: Option<f64>, status: RunStatus) -> IterationMetrics {
        IterationMetrics {
            runtime_sec: runtime,
            client_runtime_sec: runtime,
            rows_returned: 1,
            input_rows_processed: 100,
            throughput_input_rows_per_sec: 100.0 / runtime,
            cpu_seconds: cpu,
            peak_memory_mb: None,
            status,
            query_id: None,
            stats_source: StatsSource::RestApi,
        }
    }

    #[test]
    fn median_of_odd_and_even_counts() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[f64::NAN]), None);
    }

    #[test]
    fn quartiles_match_the_exclusive_method() {
        assert_eq!(quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some([1.5, 3.0, 4.5]));
        assert_eq!(
            quartiles(&[2.0, 4.0, 6.0, 8.0]),
            Some([2.5, 5.0, 7.5])
        );
        assert_eq!(quartiles(&[7.0]), None);
    }

    #[test]
    fn quartiles_of_two_values_clamp_to_the_ends() {
        // Positions 0.75 and 2.25 lie outside the data.
        let [q1, q2, q3] = quartiles(&[10.0, 20.0]).unwrap();
        assert!((q1 - 7.5).abs() < 1e-9);
        assert!((q2 - 15.0).abs() < 1e-9);
        assert!((q3 - 22.5).abs() < 1e-9);
    }

    #[test]
    fn summary_ignores_failed_iterations_and_missing_metrics() {
        let iterations = [
            iteration(1.0, Some(0.5), RunStatus::Success),
            iteration(3.0, None, RunStatus::Success),
            iteration(2.0, Some(1.5), RunStatus::Success),
            iteration(100.0, Some(9.0), RunStatus::Error("timeout".to_string())),
        ];

        let summary = summarize(&iterations);

        assert_eq!(summary.runtime_median, Some(2.0));
        assert_eq!(summary.cpu_median, Some(1.0));
        assert_eq!(summary.memory_median, None);
        assert_eq!(summary.throughput_median, Some(50.0));
    }

    #[test]
    fn summary_of_only_failures_is_empty() {
        let summary = summarize(&[iteration(1.0, None, RunStatus::Error("x".to_string()))]);
        assert_eq!(summary, QuerySummary::default());
    }
}
