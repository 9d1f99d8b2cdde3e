use std::sync::Arc;

use fortify_buckets::{CyclicBucketBuffer, MaxStore, ShardedCbb, StoringStore, SummingStore};
use fortify_common::{EventClock, SystemClock};

use crate::percentile::compute_sample_metrics;
use crate::reading::{RollingBooleanReading, RollingCountReading, RollingMaxReading, RollingPercentileReading};

const DEFAULT_BUCKET_INTERVAL_MILLIS: i64 = 1_000;
const DEFAULT_STORE_CAPACITY: usize = 128;

/// Shared construction knobs for every rolling recorder:
/// bucket interval, whether `deref`/`count` include the in-progress
/// head bucket, shard count (0 = auto-detect), an optional second JSON
/// key to emit the raw per-bucket array under, and the clock event ids
/// are drawn from.
#[derive(Clone)]
pub struct RollingOptions {
    pub bucket_interval_millis: i64,
    pub deref_head: bool,
    pub shard_count: usize,
    pub buckets_key: Option<String>,
    pub clock: Arc<dyn EventClock>,
}

impl Default for RollingOptions {
    fn default() -> Self {
        Self {
            bucket_interval_millis: DEFAULT_BUCKET_INTERVAL_MILLIS,
            deref_head: false,
            shard_count: 0,
            buckets_key: None,
            clock: Arc::new(SystemClock),
        }
    }
}

fn build_sharded<S: fortify_buckets::BucketStore>(
    bucket_count: usize,
    interval_millis: i64,
    shard_count: usize,
    start: i64,
) -> ShardedCbb<S> {
    ShardedCbb::new(shard_count, move || CyclicBucketBuffer::new(bucket_count, interval_millis, start))
}

fn elements(sharded: &ShardedCbb<impl fortify_buckets::BucketStore>, deref_head: bool, now: i64) -> Vec<i64> {
    if deref_head {
        sharded.all_elements_as_of(now)
    } else {
        sharded.tail_elements_as_of(now)
    }
}

fn buckets_snapshot(
    sharded: &ShardedCbb<impl fortify_buckets::BucketStore>,
    options: &RollingOptions,
    now: i64,
) -> Option<Vec<i64>> {
    options.buckets_key.as_ref().map(|_| elements(sharded, options.deref_head, now))
}

/// `rolling-sum`: adds `value` at `now()`; `deref()`/`count()` report
/// the sum over the tail window (or the whole window if `deref_head`).
pub struct RollingSum {
    key: String,
    sharded: ShardedCbb<SummingStore>,
    options: RollingOptions,
}

impl RollingSum {
    pub fn new(key: impl Into<String>, bucket_count: usize, options: RollingOptions) -> Self {
        let start = options.clock.now_millis();
        Self {
            key: key.into(),
            sharded: build_sharded(bucket_count, options.bucket_interval_millis, options.shard_count, start),
            options,
        }
    }

    pub fn record(&self, value: i64) {
        self.sharded.record(self.options.clock.now_millis(), value);
    }

    /// Clears every bucket and re-anchors the window at `now()` (used by
    /// fault detectors to discard history on `reinit!`).
    pub fn reset(&self) {
        self.sharded.reset(self.options.clock.now_millis());
    }

    pub fn count(&self) -> i64 {
        let now = self.options.clock.now_millis();
        elements(&self.sharded, self.options.deref_head, now).iter().sum()
    }

    pub fn deref(&self) -> RollingCountReading {
        let now = self.options.clock.now_millis();
        RollingCountReading {
            key: self.key.clone(),
            value: self.count(),
            buckets_key: self.options.buckets_key.clone(),
            buckets: buckets_snapshot(&self.sharded, &self.options, now),
        }
    }
}

/// `rolling-count`: the same mechanism as [`RollingSum`] with `record`
/// fixed to `+1` per event.
pub struct RollingCount {
    inner: RollingSum,
}

impl RollingCount {
    pub fn new(key: impl Into<String>, bucket_count: usize, options: RollingOptions) -> Self {
        Self {
            inner: RollingSum::new(key, bucket_count, options),
        }
    }

    pub fn increment(&self) {
        self.inner.record(1);
    }

    /// Used by fault detectors recording a failure weight directly
    /// rather than going through `increment`.
    pub fn record(&self, value: i64) {
        self.inner.record(value);
    }

    pub fn reset(&self) {
        self.inner.reset();
    }

    pub fn count(&self) -> i64 {
        self.inner.count()
    }

    pub fn deref(&self) -> RollingCountReading {
        self.inner.deref()
    }
}

/// `rolling-max`: merge-max over the tail window. An empty window
/// returns `None` rather than `0` so aggregation
/// code never confuses "no samples" with "max observed was zero".
pub struct RollingMax {
    key: String,
    sharded: ShardedCbb<MaxStore>,
    options: RollingOptions,
}

impl RollingMax {
    pub fn new(key: impl Into<String>, bucket_count: usize, options: RollingOptions) -> Self {
        let start = options.clock.now_millis();
        Self {
            key: key.into(),
            sharded: build_sharded(bucket_count, options.bucket_interval_millis, options.shard_count, start),
            options,
        }
    }

    pub fn record(&self, value: i64) {
        self.sharded.record(self.options.clock.now_millis(), value);
    }

    pub fn max(&self) -> Option<i64> {
        let now = self.options.clock.now_millis();
        elements(&self.sharded, self.options.deref_head, now)
            .into_iter()
            .filter(|&v| v != MaxStore::EMPTY)
            .max()
    }

    pub fn deref(&self) -> RollingMaxReading {
        let now = self.options.clock.now_millis();
        RollingMaxReading {
            key: self.key.clone(),
            value: self.max(),
            buckets_key: self.options.buckets_key.clone(),
            buckets: buckets_snapshot(&self.sharded, &self.options, now),
        }
    }
}

/// `rolling-store`: keeps the last `capacity` values per bucket and
/// reports [`crate::percentile::SampleMetrics`] over the tail.
pub struct RollingStore {
    key: String,
    sharded: ShardedCbb<StoringStore>,
    options: RollingOptions,
    percentiles: Vec<f64>,
}

impl RollingStore {
    pub fn new(
        key: impl Into<String>,
        bucket_count: usize,
        capacity: usize,
        percentiles: Vec<f64>,
        options: RollingOptions,
    ) -> Self {
        let start = options.clock.now_millis();
        let interval = options.bucket_interval_millis;
        let shard_count = options.shard_count;
        let capacity = if capacity == 0 { DEFAULT_STORE_CAPACITY } else { capacity };
        let sharded = ShardedCbb::new(shard_count, move || {
            CyclicBucketBuffer::with_store(bucket_count, interval, start, StoringStore::new(bucket_count, capacity))
        });
        Self {
            key: key.into(),
            sharded,
            options,
            percentiles,
        }
    }

    pub fn record(&self, value: i64) {
        self.sharded.record(self.options.clock.now_millis(), value);
    }

    pub fn sample_metrics(&self) -> Option<crate::percentile::SampleMetrics> {
        let now = self.options.clock.now_millis();
        let values = elements(&self.sharded, self.options.deref_head, now);
        compute_sample_metrics(&values, &self.percentiles)
    }

    pub fn deref(&self) -> RollingPercentileReading {
        let now = self.options.clock.now_millis();
        RollingPercentileReading {
            key: self.key.clone(),
            value: self.sample_metrics(),
            buckets_key: self.options.buckets_key.clone(),
            buckets: buckets_snapshot(&self.sharded, &self.options, now),
        }
    }
}

/// `rolling-boolean`: a pair of summing stores tallying truthy vs falsy
/// outcomes independently (e.g. per-window success/failure gauges kept
/// apart from the fault detector that may share the same raw events).
pub struct RollingBoolean {
    truthy_key: String,
    falsy_key: String,
    truthy: ShardedCbb<SummingStore>,
    falsy: ShardedCbb<SummingStore>,
    options: RollingOptions,
}

impl RollingBoolean {
    pub fn new(
        truthy_key: impl Into<String>,
        falsy_key: impl Into<String>,
        bucket_count: usize,
        options: RollingOptions,
    ) -> Self {
        let start = options.clock.now_millis();
        Self {
            truthy_key: truthy_key.into(),
            falsy_key: falsy_key.into(),
            truthy: build_sharded(bucket_count, options.bucket_interval_millis, options.shard_count, start),
            falsy: build_sharded(bucket_count, options.bucket_interval_millis, options.shard_count, start),
            options,
        }
    }

    pub fn record(&self, outcome: bool) {
        let now = self.options.clock.now_millis();
        if outcome {
            self.truthy.record(now, 1);
        } else {
            self.falsy.record(now, 1);
        }
    }

    pub fn counts(&self) -> (i64, i64) {
        let now = self.options.clock.now_millis();
        let truthy: i64 = elements(&self.truthy, self.options.deref_head, now).iter().sum();
        let falsy: i64 = elements(&self.falsy, self.options.deref_head, now).iter().sum();
        (truthy, falsy)
    }

    pub fn deref(&self) -> RollingBooleanReading {
        let (truthy, falsy) = self.counts();
        let now = self.options.clock.now_millis();
        let (truthy_buckets, falsy_buckets) = match &self.options.buckets_key {
            Some(_) => (
                Some(elements(&self.truthy, self.options.deref_head, now)),
                Some(elements(&self.falsy, self.options.deref_head, now)),
            ),
            None => (None, None),
        };
        RollingBooleanReading {
            truthy_key: self.truthy_key.clone(),
            truthy,
            falsy_key: self.falsy_key.clone(),
            falsy,
            truthy_buckets,
            falsy_buckets,
        }
    }
}
