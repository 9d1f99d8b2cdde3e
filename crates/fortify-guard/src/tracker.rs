use fortify_common::{MonotonicClock, Result};

use crate::classifier::{classify, ResultClassifier};

/// Invokes a pure arity-1 side
/// effect `f(bool)` with the classified outcome before the
/// result (or error) is returned to the caller.
pub fn via_success_failure_tracker<T>(
    classifier: &dyn ResultClassifier<T>,
    f: impl FnOnce(bool),
    task: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let result = task();
    f(classify(classifier, &result));
    result
}

/// Samples a monotonic clock around
/// `task` and invokes `f(success?, elapsed_ms)` on both the success and
/// failure paths.
pub fn via_latency_tracker<T>(
    classifier: &dyn ResultClassifier<T>,
    f: impl FnOnce(bool, u64),
    task: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let clock = MonotonicClock::new();
    let start = clock.now();
    let result = task();
    let elapsed_ms = clock.now().duration_since(start).as_millis() as u64;
    f(classify(classifier, &result), elapsed_ms);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DefaultClassifier;
    use std::cell::Cell;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn success_failure_tracker_reports_outcome() {
        let seen = Cell::new(None);
        let _ = via_success_failure_tracker(
            &DefaultClassifier,
            |success| seen.set(Some(success)),
            || -> Result<i32> { Ok(3) },
        );
        assert_eq!(seen.get(), Some(true));

        let seen2 = Cell::new(None);
        let _ = via_success_failure_tracker(
            &DefaultClassifier,
            |success| seen2.set(Some(success)),
            || -> Result<i32> { Err(fortify_common::Error::invalid_argument("x", "bad")) },
        );
        assert_eq!(seen2.get(), Some(false));
    }

    #[test]
    fn latency_tracker_measures_elapsed_time() {
        let elapsed = Cell::new(0u64);
        let success = Cell::new(false);
        let _ = via_latency_tracker(
            &DefaultClassifier,
            |ok, ms| {
                success.set(ok);
                elapsed.set(ms);
            },
            || -> Result<()> {
                thread::sleep(Duration::from_millis(20));
                Ok(())
            },
        );
        assert!(success.get());
        assert!(elapsed.get() >= 15);
    }
}
