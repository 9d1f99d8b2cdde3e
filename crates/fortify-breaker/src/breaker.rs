use std::sync::Arc;

use fortify_common::{EventClock, SystemClock};
use parking_lot::Mutex;

use crate::detector::FaultDetector;
use crate::retry::HalfOpenRetryResolver;

struct BreakerState {
    connected: bool,
    since_millis: i64,
}

type Hook = Box<dyn Fn(&CircuitBreaker) + Send + Sync>;

/// Couples a [`FaultDetector`] and a [`HalfOpenRetryResolver`] behind a
/// two-state (connected/tripped) machine. `on_trip` and
/// `on_connect` fire after the state mutex is released, so a hook can
/// safely call back into the breaker without deadlocking.
pub struct CircuitBreaker {
    name: String,
    fault_detector: Arc<dyn FaultDetector>,
    retry_resolver: Arc<HalfOpenRetryResolver>,
    clock: Arc<dyn EventClock>,
    state: Mutex<BreakerState>,
    on_trip: Option<Hook>,
    on_connect: Option<Hook>,
}

pub struct CircuitBreakerBuilder {
    name: String,
    clock: Arc<dyn EventClock>,
    on_trip: Option<Hook>,
    on_connect: Option<Hook>,
}

impl CircuitBreakerBuilder {
    pub fn clock(mut self, clock: Arc<dyn EventClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn on_trip(mut self, hook: impl Fn(&CircuitBreaker) + Send + Sync + 'static) -> Self {
        self.on_trip = Some(Box::new(hook));
        self
    }

    pub fn on_connect(mut self, hook: impl Fn(&CircuitBreaker) + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Box::new(hook));
        self
    }

    pub fn build(self, fault_detector: Arc<dyn FaultDetector>, retry_resolver: Arc<HalfOpenRetryResolver>) -> CircuitBreaker {
        let since_millis = self.clock.now_millis();
        CircuitBreaker {
            name: self.name,
            fault_detector,
            retry_resolver,
            clock: self.clock,
            state: Mutex::new(BreakerState {
                connected: true,
                since_millis,
            }),
            on_trip: self.on_trip,
            on_connect: self.on_connect,
        }
    }
}

impl CircuitBreaker {
    pub fn builder(name: impl Into<String>) -> CircuitBreakerBuilder {
        CircuitBreakerBuilder {
            name: name.into(),
            clock: Arc::new(SystemClock),
            on_trip: None,
            on_connect: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub fn since_millis(&self) -> i64 {
        self.state.lock().since_millis
    }

    /// `allow?()`: admits the call, or denies it while recording a trip
    /// / delegating to the retry resolver while tripped.
    pub fn allow(&self) -> bool {
        let was_connected = self.state.lock().connected;
        if !was_connected {
            return self.retry_resolver.retry();
        }
        if !self.fault_detector.is_fault() {
            return true;
        }

        let just_tripped = {
            let mut state = self.state.lock();
            if !state.connected || !self.fault_detector.is_fault() {
                false
            } else {
                state.connected = false;
                state.since_millis = self.clock.now_millis();
                true
            }
        };

        if just_tripped {
            self.retry_resolver.reinit();
            tracing::warn!(breaker = %self.name, "circuit breaker tripped");
            if let Some(hook) = &self.on_trip {
                hook(self);
            }
            false
        } else {
            true
        }
    }

    /// `mark!(success)`: feeds the outcome into the fault detector and,
    /// on a qualifying success while tripped, transitions back to
    /// connected.
    pub fn mark(&self, success: bool) {
        let tripped = !self.state.lock().connected;
        if success {
            if !tripped {
                self.fault_detector.record_outcome(true);
                return;
            }
            self.fault_detector.reinit();
            let reconnected = {
                let mut state = self.state.lock();
                if !state.connected {
                    state.connected = true;
                    state.since_millis = self.clock.now_millis();
                    true
                } else {
                    false
                }
            };
            if reconnected {
                tracing::info!(breaker = %self.name, "circuit breaker reconnected");
                if let Some(hook) = &self.on_connect {
                    hook(self);
                }
            }
        } else if !tripped {
            self.fault_detector.record_outcome(false);
        }
        // Tripped + failure: no-op, don't pollute the retry probe result.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::RollingWindowFaultDetector;
    use fortify_common::VirtualClock;
    use fortify_metrics::RollingOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn rolling_fault_detector_trips_and_recovers() {
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
        let connects = Arc::new(AtomicUsize::new(0));
        let trips_hook = trips.clone();
        let connects_hook = connects.clone();

        let breaker = CircuitBreaker::builder("s1")
            .clock(Arc::new(clock.clone()))
            .on_trip(move |_| {
                trips_hook.fetch_add(1, Ordering::SeqCst);
            })
            .on_connect(move |_| {
                connects_hook.fetch_add(1, Ordering::SeqCst);
            })
            .build(detector, resolver);

        // 10 failures interleaved with 2 successes (at i=5 and i=10), one
        // invocation every 10ms, spanning a 120ms window.
        for i in 0..12 {
            if breaker.allow() {
                let success = i == 5 || i == 10;
                breaker.mark(success);
            }
            clock.advance(10);
        }
        clock.advance(120);

        assert!(!breaker.allow());
        assert_eq!(trips.load(Ordering::SeqCst), 1);
        assert_eq!(connects.load(Ordering::SeqCst), 0);

        clock.advance(100);
        assert!(breaker.allow());
        breaker.mark(true);
        assert_eq!(trips.load(Ordering::SeqCst), 1);
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        assert!(breaker.allow());
        breaker.mark(true);
    }
}
