use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use fortify_common::{EventClock, Error, Result, SystemClock};
use fortify_metrics::{Reading, RollingCount, RollingOptions};
use parking_lot::Mutex;
use serde_json::json;

/// Capability shared by all three fault detector shapes:
/// record a pass/fail outcome, ask whether the accumulated failures
/// warrant tripping a breaker, clear history, and read a metric.
pub trait FaultDetector: Send + Sync {
    fn record_outcome(&self, success: bool);
    fn is_fault(&self) -> bool;
    fn reinit(&self);
    fn count(&self) -> i64;
    fn deref(&self) -> Reading;
}

fn reading_of(count: i64, fault: bool) -> Reading {
    let mut reading = Reading::new();
    reading.insert("count".to_string(), json!(count));
    reading.insert("fault".to_string(), json!(fault));
    reading
}

/// Counts consecutive failures; any success resets the counter to zero.
/// Faulty once the counter reaches `threshold`.
pub struct SerialFaultDetector {
    threshold: i64,
    counter: AtomicI64,
}

impl SerialFaultDetector {
    pub fn new(threshold: i64) -> Result<Self> {
        if threshold <= 0 {
            return Err(Error::invalid_argument("threshold", "must be positive"));
        }
        Ok(Self {
            threshold,
            counter: AtomicI64::new(0),
        })
    }
}

impl FaultDetector for SerialFaultDetector {
    fn record_outcome(&self, success: bool) {
        if success {
            self.counter.store(0, Ordering::SeqCst);
        } else {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_fault(&self) -> bool {
        self.counter.load(Ordering::SeqCst) >= self.threshold
    }

    fn reinit(&self) {
        self.counter.store(0, Ordering::SeqCst);
    }

    fn count(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }

    fn deref(&self) -> Reading {
        reading_of(self.count(), self.is_fault())
    }
}

struct DiscreteState {
    counter: i64,
    window_start: i64,
}

/// Counts failures within a fixed wall-clock window of duration `D`; the
/// window rolls forward (and the counter clears) the first time an
/// outcome is recorded at or after `window_start + D`.
pub struct DiscreteWindowFaultDetector {
    threshold: i64,
    duration_millis: i64,
    clock: Arc<dyn EventClock>,
    state: Mutex<DiscreteState>,
}

impl DiscreteWindowFaultDetector {
    pub fn new(threshold: i64, duration_millis: i64, clock: Arc<dyn EventClock>) -> Result<Self> {
        if threshold <= 0 {
            return Err(Error::invalid_argument("threshold", "must be positive"));
        }
        if duration_millis <= 0 {
            return Err(Error::invalid_argument("duration", "must be positive"));
        }
        let now = clock.now_millis();
        Ok(Self {
            threshold,
            duration_millis,
            clock,
            state: Mutex::new(DiscreteState {
                counter: 0,
                window_start: now,
            }),
        })
    }

    pub fn with_system_clock(threshold: i64, duration_millis: i64) -> Result<Self> {
        Self::new(threshold, duration_millis, Arc::new(SystemClock))
    }

    fn roll_window_locked(&self, state: &mut DiscreteState, now: i64) {
        if now >= state.window_start + self.duration_millis {
            state.counter = 0;
            state.window_start = now;
        }
    }
}

impl FaultDetector for DiscreteWindowFaultDetector {
    fn record_outcome(&self, success: bool) {
        let now = self.clock.now_millis();
        let mut state = self.state.lock();
        self.roll_window_locked(&mut state, now);
        if !success {
            state.counter += 1;
        }
    }

    fn is_fault(&self) -> bool {
        let now = self.clock.now_millis();
        let mut state = self.state.lock();
        self.roll_window_locked(&mut state, now);
        state.counter >= self.threshold
    }

    fn reinit(&self) {
        let now = self.clock.now_millis();
        let mut state = self.state.lock();
        state.counter = 0;
        state.window_start = now;
    }

    fn count(&self) -> i64 {
        self.state.lock().counter
    }

    fn deref(&self) -> Reading {
        reading_of(self.count(), self.is_fault())
    }
}

/// Backed by a [`RollingCount`] spanning `⌈D/bucket_interval⌉ + 1`
/// buckets; faulty once the tail sum reaches `threshold`. Successes are
/// a no-op — the rolling window counts only failures.
pub struct RollingWindowFaultDetector {
    threshold: i64,
    rolling: RollingCount,
}

impl RollingWindowFaultDetector {
    pub fn new(
        threshold: i64,
        duration_millis: i64,
        bucket_interval_millis: i64,
        options: RollingOptions,
    ) -> Result<Self> {
        if threshold <= 0 {
            return Err(Error::invalid_argument("threshold", "must be positive"));
        }
        if bucket_interval_millis <= 0 || duration_millis % bucket_interval_millis != 0 {
            return Err(Error::invalid_argument(
                "duration",
                "must be a positive multiple of bucket_interval",
            ));
        }
        let windows = duration_millis / bucket_interval_millis;
        if windows <= 0 {
            return Err(Error::invalid_argument("duration", "duration/bucket_interval must be > 0"));
        }
        let bucket_count = windows as usize + 1;
        let mut options = options;
        options.bucket_interval_millis = bucket_interval_millis;
        let rolling = RollingCount::new("count", bucket_count, options);
        Ok(Self { threshold, rolling })
    }
}

impl FaultDetector for RollingWindowFaultDetector {
    fn record_outcome(&self, success: bool) {
        if !success {
            self.rolling.record(1);
        }
    }

    fn is_fault(&self) -> bool {
        self.rolling.count() >= self.threshold
    }

    fn reinit(&self) {
        self.rolling.reset();
    }

    fn count(&self) -> i64 {
        self.rolling.count()
    }

    fn deref(&self) -> Reading {
        reading_of(self.count(), self.is_fault())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fortify_common::VirtualClock;

    #[test]
    fn serial_detector_trips_and_resets_on_success() {
        let detector = SerialFaultDetector::new(3).unwrap();
        detector.record_outcome(false);
        detector.record_outcome(false);
        assert!(!detector.is_fault());
        detector.record_outcome(false);
        assert!(detector.is_fault());
        detector.record_outcome(true);
        assert!(!detector.is_fault());
        assert_eq!(detector.count(), 0);
    }

    #[test]
    fn discrete_window_rolls_over_time() {
        let clock = VirtualClock::new(0);
        let detector = DiscreteWindowFaultDetector::new(2, 1000, Arc::new(clock.clone())).unwrap();
        detector.record_outcome(false);
        detector.record_outcome(false);
        assert!(detector.is_fault());
        clock.advance(1000);
        detector.record_outcome(false);
        assert_eq!(detector.count(), 1);
        assert!(!detector.is_fault());
    }

    #[test]
    fn rolling_window_rejects_non_divisible_duration() {
        let clock = VirtualClock::new(0);
        let options = RollingOptions {
            bucket_interval_millis: 100,
            deref_head: false,
            shard_count: 1,
            buckets_key: None,
            clock: Arc::new(clock),
        };
        let err = RollingWindowFaultDetector::new(10, 950, 100, options).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn rolling_window_trips_on_tail_threshold() {
        let clock = VirtualClock::new(0);
        let options = RollingOptions {
            bucket_interval_millis: 100,
            deref_head: false,
            shard_count: 1,
            buckets_key: None,
            clock: Arc::new(clock.clone()),
        };
        let detector = RollingWindowFaultDetector::new(10, 1000, 100, options).unwrap();
        for _ in 0..10 {
            detector.record_outcome(false);
        }
        clock.advance(100);
        assert!(detector.is_fault());
    }
}
