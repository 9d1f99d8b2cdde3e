use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fortify_common::{EventClock, Error, Result, SystemClock};
use parking_lot::Mutex;

struct RetryState {
    retry_init_ts: i64,
    open_elapsed: bool,
    last_retry_ts: i64,
    retry_counter: i32,
}

impl RetryState {
    fn fresh(now: i64) -> Self {
        Self {
            retry_init_ts: now,
            open_elapsed: false,
            last_retry_ts: now,
            retry_counter: 0,
        }
    }
}

/// The half-open-window state machine: while tripped, grants
/// a bounded number of probe retries per half-open window, gated so
/// that only one concurrent caller at a time evaluates `retry()`.
pub struct HalfOpenRetryResolver {
    half_open_duration_millis: i64,
    open_duration_millis: i64,
    retry_times: i32,
    clock: Arc<dyn EventClock>,
    state: Mutex<RetryState>,
    retry_gate: AtomicBool,
    reinit_gate: AtomicBool,
}

impl HalfOpenRetryResolver {
    pub fn new(
        half_open_duration_millis: i64,
        open_duration_millis: Option<i64>,
        retry_times: i32,
        clock: Arc<dyn EventClock>,
    ) -> Result<Self> {
        if retry_times < 1 {
            return Err(Error::invalid_argument("retry_times", "must be >= 1"));
        }
        let now = clock.now_millis();
        Ok(Self {
            half_open_duration_millis,
            open_duration_millis: open_duration_millis.unwrap_or(half_open_duration_millis),
            retry_times,
            clock,
            state: Mutex::new(RetryState::fresh(now)),
            retry_gate: AtomicBool::new(false),
            reinit_gate: AtomicBool::new(false),
        })
    }

    pub fn with_system_clock(half_open_duration_millis: i64, open_duration_millis: Option<i64>, retry_times: i32) -> Result<Self> {
        Self::new(half_open_duration_millis, open_duration_millis, retry_times, Arc::new(SystemClock))
    }

    /// Non-blocking: a caller that loses the race for the retry gate
    /// simply gets `false`, matching "concurrent retry in progress".
    pub fn retry(&self) -> bool {
        if self
            .retry_gate
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        let granted = {
            let mut state = self.state.lock();
            let now = self.clock.now_millis();
            if !state.open_elapsed {
                if now - state.retry_init_ts >= self.open_duration_millis {
                    state.open_elapsed = true;
                    state.last_retry_ts = now;
                    state.retry_counter = 1;
                    true
                } else {
                    false
                }
            } else if now - state.last_retry_ts >= self.half_open_duration_millis {
                state.last_retry_ts = now;
                state.retry_counter = 1;
                true
            } else if state.retry_counter < self.retry_times {
                state.retry_counter += 1;
                true
            } else {
                false
            }
        };

        self.retry_gate.store(false, Ordering::Release);
        granted
    }

    /// Replaces state with a fresh initial tuple. A concurrent `reinit!`
    /// already in flight makes this call a no-op rather than blocking,
    /// since either one resets to the same starting point.
    pub fn reinit(&self) {
        if self
            .reinit_gate
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        let now = self.clock.now_millis();
        *self.state.lock() = RetryState::fresh(now);
        self.reinit_gate.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fortify_common::VirtualClock;

    #[test]
    fn half_open_retry_quota_is_bounded() {
        let clock = VirtualClock::new(0);
        let resolver = HalfOpenRetryResolver::new(100, Some(200), 1, Arc::new(clock.clone())).unwrap();

        assert!(!resolver.retry());
        clock.set(100);
        assert!(!resolver.retry());
        clock.set(200);
        assert!(resolver.retry());
        assert!(!resolver.retry());
        clock.set(300);
        assert!(resolver.retry());
    }

    #[test]
    fn reinit_restores_initial_state() {
        let clock = VirtualClock::new(0);
        let resolver = HalfOpenRetryResolver::new(100, Some(100), 1, Arc::new(clock.clone())).unwrap();
        clock.set(100);
        assert!(resolver.retry());
        resolver.reinit();
        clock.set(150);
        assert!(!resolver.retry());
    }

    #[test]
    fn rejects_non_positive_retry_times() {
        let clock = Arc::new(VirtualClock::new(0));
        let err = HalfOpenRetryResolver::new(100, None, 0, clock).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }
}
