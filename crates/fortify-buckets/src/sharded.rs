use rand::Rng;

use crate::cbb::CyclicBucketBuffer;
use crate::store::BucketStore;

/// A fan-out of [`CyclicBucketBuffer`] instances, all built to the same
/// shape. Writers pick a shard at random (no cross-shard
/// synchronization on write); readers read every shard and fold the
/// results with the bucket store's [`BucketStore::reduce`].
///
/// A shard count of 1 degenerates to a single CBB with no randomness on
/// the write path and an identity reduce on the read path, which is
/// exactly what the single-shard case needs for linearizable reads in
/// tests — no special-casing required beyond skipping the RNG call.
pub struct ShardedCbb<S: BucketStore> {
    shards: Vec<CyclicBucketBuffer<S>>,
}

/// Auto-detects a shard count from the available parallelism:
/// `min(available_processors, 64) * 2`.
pub fn auto_shard_count() -> usize {
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    cpus.min(64) * 2
}

impl<S: BucketStore> ShardedCbb<S> {
    /// `shard_count == 0` auto-detects via [`auto_shard_count`].
    pub fn new<F>(shard_count: usize, factory: F) -> Self
    where
        F: Fn() -> CyclicBucketBuffer<S>,
    {
        let shard_count = if shard_count == 0 { auto_shard_count() } else { shard_count };
        let shards = (0..shard_count.max(1)).map(|_| factory()).collect();
        Self { shards }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn record(&self, event_id: i64, value: i64) {
        self.pick_shard().record(event_id, value);
    }

    pub fn reset(&self, new_latest_event_id: i64) {
        // Not atomic across shards; readers must tolerate observing
        // some shards already reset and others not yet.
        for shard in &self.shards {
            shard.reset(new_latest_event_id);
        }
    }

    pub fn all_elements(&self) -> Vec<i64> {
        S::reduce(self.shards.iter().map(CyclicBucketBuffer::all_elements).collect())
    }

    pub fn all_elements_as_of(&self, latest_event_id: i64) -> Vec<i64> {
        S::reduce(
            self.shards
                .iter()
                .map(|s| s.all_elements_as_of(latest_event_id))
                .collect(),
        )
    }

    pub fn tail_elements(&self) -> Vec<i64> {
        S::reduce(self.shards.iter().map(CyclicBucketBuffer::tail_elements).collect())
    }

    pub fn tail_elements_as_of(&self, latest_event_id: i64) -> Vec<i64> {
        S::reduce(
            self.shards
                .iter()
                .map(|s| s.tail_elements_as_of(latest_event_id))
                .collect(),
        )
    }

    fn pick_shard(&self) -> &CyclicBucketBuffer<S> {
        if self.shards.len() == 1 {
            return &self.shards[0];
        }
        let idx = rand::rng().random_range(0..self.shards.len());
        &self.shards[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SummingStore;

    #[test]
    fn single_shard_bypasses_randomness() {
        let sharded: ShardedCbb<SummingStore> =
            ShardedCbb::new(1, || CyclicBucketBuffer::new(4, 10, 100));
        for _ in 0..50 {
            sharded.record(100, 1);
        }
        assert_eq!(sharded.all_elements(), vec![50, 0, 0, 0]);
    }

    #[test]
    fn many_shards_reduce_to_the_same_total() {
        let sharded: ShardedCbb<SummingStore> =
            ShardedCbb::new(8, || CyclicBucketBuffer::new(4, 10, 100));
        for _ in 0..1000 {
            sharded.record(100, 1);
        }
        let elements = sharded.all_elements();
        assert_eq!(elements.iter().sum::<i64>(), 1000);
        assert_eq!(elements[1..], [0, 0, 0]);
    }

    #[test]
    fn auto_detect_is_bounded() {
        let n = auto_shard_count();
        assert!(n >= 2 && n <= 128);
    }
}
