use fortify_common::Error;

/// Decides, for a given `Result<T, Error>`, whether the outcome counts
/// as a success for the purposes of fault detectors, circuit breakers
/// and trackers. The default treats every `Ok` as success
/// and every `Err` as failure; callers with richer domain results (an
/// `Ok(false)` that's logically a failure, or an expected `Err` that
/// shouldn't count against a breaker) supply their own.
pub trait ResultClassifier<T>: Send + Sync {
    fn success_result(&self, result: &T) -> bool;
    fn success_error(&self, error: &Error) -> bool;
}

/// `Ok` is always success, `Err` is always failure.
pub struct DefaultClassifier;

impl<T> ResultClassifier<T> for DefaultClassifier {
    fn success_result(&self, _result: &T) -> bool {
        true
    }

    fn success_error(&self, _error: &Error) -> bool {
        false
    }
}

pub(crate) fn classify<T>(classifier: &dyn ResultClassifier<T>, result: &fortify_common::Result<T>) -> bool {
    match result {
        Ok(value) => classifier.success_result(value),
        Err(err) => classifier.success_error(err),
    }
}
