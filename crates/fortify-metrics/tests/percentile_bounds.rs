use fortify_metrics::compute_sample_metrics;
use proptest::prelude::*;

proptest! {
    #[test]
    fn percentile_bounds_hold_for_any_sample(values in prop::collection::vec(-1_000_000i64..1_000_000, 1..200)) {
        let metrics = compute_sample_metrics(&values, &[0.0, 25.0, 50.0, 75.0, 99.0, 100.0])
            .expect("non-empty sample always yields metrics");

        prop_assert!(metrics.min as f64 <= metrics.median);
        prop_assert!(metrics.median <= metrics.max as f64);
        prop_assert_eq!(metrics.percentiles["p100"], metrics.max);
        // p <= 0 is a special case (always 0), not clamped into [min, max].
        prop_assert_eq!(metrics.percentiles["p0"], 0);

        for (key, &p) in metrics.percentiles.iter() {
            if key == "p0" {
                continue;
            }
            prop_assert!(p >= metrics.min && p <= metrics.max);
        }
    }

    #[test]
    fn empty_window_never_reports_metrics(percentiles in prop::collection::vec(0.0f64..100.0, 0..5)) {
        prop_assert_eq!(compute_sample_metrics(&[], &percentiles), None);
    }
}
