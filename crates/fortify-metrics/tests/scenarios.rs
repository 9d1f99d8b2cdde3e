use std::sync::Arc;

use fortify_common::VirtualClock;
use fortify_metrics::{RollingCount, RollingOptions};

/// A burst of increments settles into one bucket, then visibly shifts
/// one bucket older as the window advances past it.
#[test]
fn rolling_count_shifts_buckets_as_window_advances() {
    let clock = VirtualClock::new(0);
    let options = RollingOptions {
        bucket_interval_millis: 100,
        deref_head: false,
        shard_count: 1,
        buckets_key: Some("buckets".to_string()),
        clock: Arc::new(clock.clone()),
    };
    let counter = RollingCount::new("foo", 11, options);

    clock.advance(10);
    for _ in 0..10 {
        counter.increment();
    }

    clock.advance(100);
    let reading = counter.deref();
    assert_eq!(reading.value, 10);
    assert_eq!(reading.buckets, Some(vec![10, 0, 0, 0, 0, 0, 0, 0, 0, 0]));

    clock.advance(100);
    let reading = counter.deref();
    assert_eq!(reading.value, 10);
    assert_eq!(reading.buckets, Some(vec![0, 10, 0, 0, 0, 0, 0, 0, 0, 0]));
}
