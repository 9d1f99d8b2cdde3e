use indexmap::IndexMap;
use serde::Serialize;

/// The `{min, mean, median, max, percentiles}` tuple computed over a
/// sorted sample array. Percentile keys are formatted as
/// `p<value>` (e.g. `p50`, `p99.9`) so the whole thing serializes
/// straight into a recorder's JSON readout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleMetrics {
    pub min: i64,
    pub mean: f64,
    pub median: f64,
    pub max: i64,
    pub percentiles: IndexMap<String, i64>,
}

/// Computes [`SampleMetrics`] over `values` for each of `percentiles`.
/// Returns `None` for an empty sample — callers should not confuse "no
/// samples yet" with any particular numeric reading.
pub fn compute_sample_metrics(values: &[i64], percentiles: &[f64]) -> Option<SampleMetrics> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let min = sorted[0];
    let max = *sorted.last().expect("non-empty");
    let mean = sorted.iter().sum::<i64>() as f64 / sorted.len() as f64;
    let median = median_of_sorted(&sorted);

    let mut pmap = IndexMap::with_capacity(percentiles.len());
    for &p in percentiles {
        pmap.insert(percentile_key(p), percentile_of_sorted(&sorted, p));
    }

    Some(SampleMetrics {
        min,
        mean,
        median,
        max,
        percentiles: pmap,
    })
}

/// Nearest-Rank percentile over an already-sorted ascending array.
///
/// - `p <= 0` or an empty array returns `0`.
/// - `p >= 100` returns the last element.
/// - Otherwise `rank = round(p * len / 100)`, clamped into bounds.
pub fn percentile_of_sorted(sorted: &[i64], p: f64) -> i64 {
    if sorted.is_empty() || p <= 0.0 {
        return 0;
    }
    if p >= 100.0 {
        return *sorted.last().expect("non-empty");
    }
    let len = sorted.len() as f64;
    let rank = ((p * len) / 100.0).round() as i64;
    let idx = (rank - 1).clamp(0, sorted.len() as i64 - 1) as usize;
    sorted[idx]
}

pub fn median_of_sorted(sorted: &[i64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
    } else {
        sorted[n / 2] as f64
    }
}

fn percentile_key(p: f64) -> String {
    if (p.fract()).abs() < f64::EPSILON {
        format!("p{}", p as i64)
    } else {
        format!("p{p}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_has_no_metrics() {
        assert_eq!(compute_sample_metrics(&[], &[50.0, 99.0]), None);
    }

    #[test]
    fn percentile_bounds_hold() {
        let sorted = [1, 3, 5, 7, 9];
        assert_eq!(percentile_of_sorted(&sorted, 0.0), 0);
        assert_eq!(percentile_of_sorted(&sorted, 100.0), 9);
        assert!(percentile_of_sorted(&sorted, 50.0) >= 1);
        assert!(percentile_of_sorted(&sorted, 50.0) <= 9);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median_of_sorted(&[1, 2, 3, 4]), 2.5);
        assert_eq!(median_of_sorted(&[1, 2, 3]), 2.0);
    }

    #[test]
    fn sample_metrics_matches_known_values() {
        let metrics = compute_sample_metrics(&[5, 1, 9, 3, 7], &[50.0, 100.0]).unwrap();
        assert_eq!(metrics.min, 1);
        assert_eq!(metrics.max, 9);
        assert_eq!(metrics.median, 5.0);
        assert_eq!(metrics.percentiles["p50"], 5);
        assert_eq!(metrics.percentiles["p100"], 9);
    }
}
