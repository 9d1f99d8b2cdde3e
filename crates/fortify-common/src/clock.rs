use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of "now" in event-id space (milliseconds since an epoch,
/// monotonic enough for the caller's purposes). Every fault detector,
/// the retry resolver, and rolling recorders read time through this
/// trait rather than calling `SystemTime::now()` directly, so tests can
/// swap in a [`VirtualClock`].
pub trait EventClock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock milliseconds since the Unix epoch. The default for every
/// constructor in `fortify-*` unless the caller passes an explicit
/// `event_id_fn`/`now_fn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl EventClock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// A settable clock for deterministic tests: advance it by fixed
/// increments between assertions instead of sleeping real time.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    millis: Arc<AtomicI64>,
}

impl VirtualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start_millis)),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_millis: i64) -> i64 {
        self.millis.fetch_add(delta_millis, Ordering::SeqCst) + delta_millis
    }
}

impl EventClock for VirtualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Monotonic timestamps for latency measurement, reusing `quanta`'s
/// low-overhead clock rather than `Instant::now()` on the hot path
/// (latency trackers wrap every guarded call).
pub use quanta::{Clock as MonotonicClock, Instant as MonotonicInstant};
