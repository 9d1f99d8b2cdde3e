use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

/// A strategy an individual bucket in a [`crate::cbb::CyclicBucketBuffer`]
/// can implement. All three shapes (summing, max, storing)
/// hold one instance sized for the whole buffer, not one object per
/// bucket: `record`/`reset` address a bucket by its physical index.
pub trait BucketStore: Send + Sync + 'static {
    /// Allocates a fresh, all-empty store sized for `bucket_count`
    /// buckets.
    fn with_capacity(bucket_count: usize) -> Self
    where
        Self: Sized;

    /// Merges `value` into bucket `index`.
    fn record(&self, index: usize, value: i64);

    /// Makes bucket `index` semantically empty again.
    fn reset(&self, index: usize);

    /// Returns the concatenated content of the listed bucket indices, in
    /// the order given (summing/max: one element per index; storing:
    /// `min(writes, capacity)` elements per index).
    fn get_elements(&self, indices: &[usize]) -> Vec<i64>;

    /// Combines one [`Self::get_elements`] result per shard into a
    /// single array — element-wise add/max for summing/max stores,
    /// concatenation for the storing store.
    fn reduce(parts: Vec<Vec<i64>>) -> Vec<i64>
    where
        Self: Sized;
}

/// Accumulates a running `i64` sum per bucket. `reset` zeroes it; "no
/// writes" and "sum of writes == 0" are the same observable state.
#[derive(Debug)]
pub struct SummingStore {
    slots: Vec<AtomicI64>,
}

impl BucketStore for SummingStore {
    fn with_capacity(bucket_count: usize) -> Self {
        Self {
            slots: (0..bucket_count).map(|_| AtomicI64::new(0)).collect(),
        }
    }

    fn record(&self, index: usize, value: i64) {
        self.slots[index].fetch_add(value, Ordering::AcqRel);
    }

    fn reset(&self, index: usize) {
        self.slots[index].store(0, Ordering::Release);
    }

    fn get_elements(&self, indices: &[usize]) -> Vec<i64> {
        indices
            .iter()
            .map(|&i| self.slots[i].load(Ordering::Acquire))
            .collect()
    }

    fn reduce(parts: Vec<Vec<i64>>) -> Vec<i64> {
        elementwise(parts, i64::wrapping_add, 0)
    }
}

/// Keeps the maximum `i64` recorded per bucket via a compare-and-swap
/// loop. Empty buckets read back as `i64::MIN`; this is an internal
/// sentinel only — recorders built on top of this store translate it
/// to an explicit "no samples" reading rather than surfacing
/// `i64::MIN` or `0`.
#[derive(Debug)]
pub struct MaxStore {
    slots: Vec<AtomicI64>,
}

impl MaxStore {
    pub const EMPTY: i64 = i64::MIN;
}

impl BucketStore for MaxStore {
    fn with_capacity(bucket_count: usize) -> Self {
        Self {
            slots: (0..bucket_count).map(|_| AtomicI64::new(Self::EMPTY)).collect(),
        }
    }

    fn record(&self, index: usize, value: i64) {
        let slot = &self.slots[index];
        let mut current = slot.load(Ordering::Acquire);
        loop {
            if value <= current {
                return;
            }
            match slot.compare_exchange_weak(
                current,
                value,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    fn reset(&self, index: usize) {
        self.slots[index].store(Self::EMPTY, Ordering::Release);
    }

    fn get_elements(&self, indices: &[usize]) -> Vec<i64> {
        indices
            .iter()
            .map(|&i| self.slots[i].load(Ordering::Acquire))
            .collect()
    }

    fn reduce(parts: Vec<Vec<i64>>) -> Vec<i64> {
        elementwise(parts, i64::max, Self::EMPTY)
    }
}

/// A fixed-capacity ring of the last `C` values recorded into a bucket,
/// plus a write counter per bucket. `record` writes to
/// `slots[bucket * C + (counter.fetch_add(1) % C)]`.
#[derive(Debug)]
pub struct StoringStore {
    capacity: usize,
    slots: Vec<AtomicI64>,
    lens: Vec<AtomicUsize>,
}

impl StoringStore {
    /// The storing store needs a per-bucket capacity that the generic
    /// [`BucketStore::with_capacity`] constructor cannot express (it
    /// only knows the bucket *count*); callers build it via
    /// [`StoringStore::new`] and wrap bucket count selection at the CBB
    /// layer instead of going through the trait constructor.
    pub fn new(bucket_count: usize, capacity: usize) -> Self {
        assert!(capacity > 0, "storing bucket capacity must be positive");
        Self {
            capacity,
            slots: (0..bucket_count * capacity).map(|_| AtomicI64::new(0)).collect(),
            lens: (0..bucket_count).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the values written into `bucket`, oldest first, limited
    /// to the last `capacity` writes.
    fn read_bucket(&self, bucket: usize) -> Vec<i64> {
        let len = self.lens[bucket].load(Ordering::Acquire);
        let base = bucket * self.capacity;
        let count = len.min(self.capacity);
        if len <= self.capacity {
            // Ring hasn't wrapped: physical order is insertion order.
            (0..count)
                .map(|i| self.slots[base + i].load(Ordering::Acquire))
                .collect()
        } else {
            // Wrapped: the next write lands at `len % capacity`, which
            // is therefore the oldest surviving value; read starting
            // there and wrap around.
            let start = len % self.capacity;
            (0..count)
                .map(|i| self.slots[base + (start + i) % self.capacity].load(Ordering::Acquire))
                .collect()
        }
    }
}

impl BucketStore for StoringStore {
    fn with_capacity(bucket_count: usize) -> Self {
        // Default capacity chosen so the generic trait constructor is
        // usable in shard factories; recorders that care about a
        // specific sample capacity should use [`StoringStore::new`]
        // directly.
        Self::new(bucket_count, 128)
    }

    fn record(&self, index: usize, value: i64) {
        let next = self.lens[index].fetch_add(1, Ordering::AcqRel);
        let offset = index * self.capacity + next % self.capacity;
        self.slots[offset].store(value, Ordering::Release);
    }

    fn reset(&self, index: usize) {
        self.lens[index].store(0, Ordering::Release);
    }

    fn get_elements(&self, indices: &[usize]) -> Vec<i64> {
        indices.iter().flat_map(|&i| self.read_bucket(i)).collect()
    }

    fn reduce(parts: Vec<Vec<i64>>) -> Vec<i64> {
        parts.into_iter().flatten().collect()
    }
}

fn elementwise(parts: Vec<Vec<i64>>, combine: fn(i64, i64) -> i64, identity: i64) -> Vec<i64> {
    let mut iter = parts.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let mut acc = first;
    for part in iter {
        debug_assert_eq!(acc.len(), part.len(), "shards must share bucket shape");
        for (a, b) in acc.iter_mut().zip(part.iter()) {
            *a = combine(*a, *b);
        }
    }
    if acc.is_empty() {
        return acc;
    }
    let _ = identity; // kept for documentation/symmetry with MaxStore::EMPTY
    acc
}
