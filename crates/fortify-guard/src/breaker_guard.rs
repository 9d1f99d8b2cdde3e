use fortify_breaker::CircuitBreaker;
use fortify_common::{Error, Result};

use crate::classifier::{classify, ResultClassifier};

/// Optional hooks for [`via_circuit_breaker`]: `on_circuit_deny`
/// replaces the default `CircuitBreakerOpen` failure when the breaker
/// is open, `on_circuit_allow` runs as a side effect right after the
/// breaker admits the call and before `task` runs. Both default to a
/// no-op (surfacing `CircuitBreakerOpen` unchanged, doing nothing on
/// admission).
#[derive(Default)]
pub struct CircuitBreakerGuardOptions<T> {
    pub on_circuit_deny: Option<Box<dyn Fn(&str) -> Result<T>>>,
    pub on_circuit_allow: Option<Box<dyn Fn()>>,
}

/// Denies with `CircuitBreakerOpen` (or `options.on_circuit_deny`, if
/// set) when `allow()` is false; otherwise runs `task` and marks the
/// outcome (classified by `classifier`) before returning or re-throwing
/// it.
pub fn via_circuit_breaker<T>(
    breaker: &CircuitBreaker,
    classifier: &dyn ResultClassifier<T>,
    options: &CircuitBreakerGuardOptions<T>,
    task: impl FnOnce() -> Result<T>,
) -> Result<T> {
    if !breaker.allow() {
        tracing::debug!(breaker = %breaker.name(), "denying call, breaker open");
        return match &options.on_circuit_deny {
            Some(hook) => hook(breaker.name()),
            None => Err(Error::CircuitBreakerOpen {
                name: breaker.name().to_string(),
            }),
        };
    }
    if let Some(hook) = &options.on_circuit_allow {
        hook();
    }
    let result = task();
    breaker.mark(classify(classifier, &result));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DefaultClassifier;
    use fortify_breaker::{FaultDetector, HalfOpenRetryResolver, RollingWindowFaultDetector};
    use fortify_common::VirtualClock;
    use fortify_metrics::RollingOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn breaker_and_clock() -> (CircuitBreaker, VirtualClock, Arc<AtomicUsize>) {
        let clock = VirtualClock::new(0);
        let detector_options = RollingOptions {
            bucket_interval_millis: 100,
            deref_head: false,
            shard_count: 1,
            buckets_key: None,
            clock: Arc::new(clock.clone()),
        };
        let detector: Arc<dyn FaultDetector> =
            Arc::new(RollingWindowFaultDetector::new(10, 1000, 100, detector_options).unwrap());
        let resolver = Arc::new(HalfOpenRetryResolver::new(100, Some(100), 1, Arc::new(clock.clone())).unwrap());
        let trips = Arc::new(AtomicUsize::new(0));
        let trips_hook = trips.clone();
        let breaker = CircuitBreaker::builder("guarded")
            .clock(Arc::new(clock.clone()))
            .on_trip(move |_| {
                trips_hook.fetch_add(1, Ordering::SeqCst);
            })
            .build(detector, resolver);
        (breaker, clock, trips)
    }

    #[test]
    fn guard_denies_while_tripped_then_recovers() {
        let (breaker, clock, trips) = breaker_and_clock();
        let options = CircuitBreakerGuardOptions::default();

        for i in 0..12 {
            let success = i == 5 || i == 10;
            let _ = via_circuit_breaker(&breaker, &DefaultClassifier, &options, || {
                if success {
                    Ok(())
                } else {
                    Err(Error::exception(std::io::Error::new(std::io::ErrorKind::Other, "boom")))
                }
            });
            clock.advance(10);
        }
        clock.advance(120);

        let denied = via_circuit_breaker(&breaker, &DefaultClassifier, &options, || Ok(()));
        assert!(matches!(denied, Err(Error::CircuitBreakerOpen { .. })));
        assert_eq!(trips.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_circuit_deny_and_on_circuit_allow_hooks_fire() {
        let (breaker, clock, _trips) = breaker_and_clock();

        let denies = Arc::new(AtomicUsize::new(0));
        let denies_hook = denies.clone();
        let allows = Arc::new(AtomicUsize::new(0));
        let allows_hook = allows.clone();
        let options = CircuitBreakerGuardOptions {
            on_circuit_deny: Some(Box::new(move |_name: &str| {
                denies_hook.fetch_add(1, Ordering::SeqCst);
                Ok(-1)
            })),
            on_circuit_allow: Some(Box::new(move || {
                allows_hook.fetch_add(1, Ordering::SeqCst);
            })),
        };

        for i in 0..12 {
            let success = i == 5 || i == 10;
            let _ = via_circuit_breaker(&breaker, &DefaultClassifier, &options, || {
                if success {
                    Ok(())
                } else {
                    Err(Error::exception(std::io::Error::new(std::io::ErrorKind::Other, "boom")))
                }
            });
            clock.advance(10);
        }
        clock.advance(120);

        assert!(allows.load(Ordering::SeqCst) >= 12);

        let denied = via_circuit_breaker(&breaker, &DefaultClassifier, &options, || Ok(()));
        assert_eq!(denied.unwrap(), -1);
        assert_eq!(denies.load(Ordering::SeqCst), 1);
    }
}
