use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::pending::{PendingQueue, PendingWrite};
use crate::store::BucketStore;

const DEFAULT_QUEUE_CAPACITY: usize = 4096;
const DEFAULT_SOFT_THRESHOLD_RATIO: f64 = 0.75;
const DEFAULT_DRAIN_BURST: usize = 256;
const PENDING_DRAIN_TIMEOUT: Duration = Duration::from_millis(50);

/// Fixed-size ring of `bucket_count` buckets keyed by a monotonically
/// increasing event id. Index 0 is always the head (the bucket holding
/// `latest_event_id`); indices `1..bucket_count` are successively older.
///
/// `head_index` and `latest_event_id` are read lock-free on the fast
/// path; advancing the window (moving the head forward because a
/// writer's event id is newer than the window covers) is serialized by
/// `advance_mutex`. `latest_event_id` is monotonically non-decreasing
/// and every recorded value stays visible until the window advances
/// past it.
pub struct CyclicBucketBuffer<S: BucketStore> {
    bucket_count: usize,
    interval: i64,
    store: S,
    head_index: AtomicUsize,
    latest_event_id: AtomicI64,
    advance_mutex: Mutex<()>,
    pending: PendingQueue,
}

impl<S: BucketStore> CyclicBucketBuffer<S> {
    pub fn new(bucket_count: usize, interval: i64, initial_latest_event_id: i64) -> Self {
        assert!(bucket_count > 0, "bucket_count must be positive");
        assert!(interval > 0, "bucket_interval must be positive");
        let queue_capacity = DEFAULT_QUEUE_CAPACITY;
        let soft = (queue_capacity as f64 * DEFAULT_SOFT_THRESHOLD_RATIO) as usize;
        Self {
            bucket_count,
            interval,
            store: S::with_capacity(bucket_count),
            head_index: AtomicUsize::new(0),
            latest_event_id: AtomicI64::new(initial_latest_event_id),
            advance_mutex: Mutex::new(()),
            pending: PendingQueue::new(queue_capacity, soft, queue_capacity),
        }
    }

    pub fn with_store(bucket_count: usize, interval: i64, initial_latest_event_id: i64, store: S) -> Self {
        let queue_capacity = DEFAULT_QUEUE_CAPACITY;
        let soft = (queue_capacity as f64 * DEFAULT_SOFT_THRESHOLD_RATIO) as usize;
        Self {
            bucket_count,
            interval,
            store,
            head_index: AtomicUsize::new(0),
            latest_event_id: AtomicI64::new(initial_latest_event_id),
            advance_mutex: Mutex::new(()),
            pending: PendingQueue::new(queue_capacity, soft, queue_capacity),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn interval(&self) -> i64 {
        self.interval
    }

    pub fn latest_event_id(&self) -> i64 {
        self.latest_event_id.load(Ordering::Acquire)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Records `value` at `event_id`. If `event_id` falls within the
    /// current window, this is a single atomic op into the store. If it
    /// is newer than the window, the head must advance first: the
    /// writer tries the advancement mutex non-blocking and, on
    /// contention, defers the write into the pending queue for whoever
    /// holds the mutex next.
    pub fn record(&self, event_id: i64, value: i64) {
        let latest = self.latest_event_id.load(Ordering::Acquire);
        let offset = bucket_offset(latest, event_id, self.interval);
        if offset >= 0 {
            self.record_existing(offset as usize, value);
            return;
        }

        match self.advance_mutex.try_lock() {
            Some(_guard) => {
                self.record_locked(event_id, value);
                self.drain_pending_locked();
            }
            None => {
                self.pending.offer(PendingWrite { event_id, value });
            }
        }
    }

    /// Resets the buffer unconditionally: every bucket is emptied, the
    /// head returns to physical slot 0, and `latest_event_id` becomes
    /// exactly `new_latest_event_id` — distinct from advancement, which
    /// only ever moves the window forward in `interval`-sized steps.
    pub fn reset(&self, new_latest_event_id: i64) {
        let _guard = self.advance_mutex.lock();
        for i in 0..self.bucket_count {
            self.store.reset(i);
        }
        self.head_index.store(0, Ordering::Release);
        self.latest_event_id.store(new_latest_event_id, Ordering::Release);
        self.pending.clear();
    }

    /// All `bucket_count` buckets, index 0 = head, sampling whatever is
    /// currently visible (no forced advancement).
    pub fn all_elements(&self) -> Vec<i64> {
        self.read_logical(0, self.bucket_count)
    }

    /// Same as [`Self::all_elements`] but first forces the window to
    /// cover `latest_event_id`, draining any pending advancements.
    pub fn all_elements_as_of(&self, latest_event_id: i64) -> Vec<i64> {
        self.force_advance(latest_event_id);
        self.read_logical(0, self.bucket_count)
    }

    /// All buckets except the head (the in-progress interval).
    pub fn tail_elements(&self) -> Vec<i64> {
        self.read_logical(1, self.bucket_count)
    }

    pub fn tail_elements_as_of(&self, latest_event_id: i64) -> Vec<i64> {
        self.force_advance(latest_event_id);
        self.read_logical(1, self.bucket_count)
    }

    fn read_logical(&self, from: usize, to: usize) -> Vec<i64> {
        let head = self.head_index.load(Ordering::Acquire);
        let indices: Vec<usize> = (from..to).map(|k| (head + k) % self.bucket_count).collect();
        self.store.get_elements(&indices)
    }

    fn record_existing(&self, offset: usize, value: i64) {
        if offset >= self.bucket_count {
            // Older than the window can represent; metrics never throw
            // on overflow, so this is a silent drop.
            return;
        }
        let head = self.head_index.load(Ordering::Acquire);
        let physical = (head + offset) % self.bucket_count;
        self.store.record(physical, value);
    }

    /// Must be called with `advance_mutex` held. Always re-reads
    /// `latest_event_id` after acquiring the lock rather than trusting a
    /// pre-lock snapshot, then applies whichever advancement shape
    /// (no-op, incremental, or full reset) the fresh offset calls for.
    fn record_locked(&self, event_id: i64, value: i64) {
        let latest = self.latest_event_id.load(Ordering::Acquire);
        let offset = bucket_offset(latest, event_id, self.interval);
        if offset >= 0 {
            self.record_existing(offset as usize, value);
            return;
        }
        self.advance_locked(event_id);
        // Re-check once more: after advancing, the event should land
        // inside the window (generally right at the head).
        let latest = self.latest_event_id.load(Ordering::Acquire);
        let offset = bucket_offset(latest, event_id, self.interval);
        if offset >= 0 {
            self.record_existing(offset as usize, value);
        }
    }

    /// Must be called with `advance_mutex` held.
    fn advance_locked(&self, event_id: i64) {
        let latest = self.latest_event_id.load(Ordering::Acquire);
        let offset = bucket_offset(latest, event_id, self.interval);
        if offset >= 0 {
            return;
        }
        let shift = (-offset) as usize;
        let head = self.head_index.load(Ordering::Acquire);

        if shift >= self.bucket_count {
            // index <= -N: the incoming event is further in the future
            // than the whole window spans; start over completely.
            for i in 0..self.bucket_count {
                self.store.reset(i);
            }
            self.head_index.store(0, Ordering::Release);
            self.latest_event_id.store(event_id, Ordering::Release);
            return;
        }

        // -N < index < 0: shift the head by `shift` and reset the
        // buckets that become the new head..head+shift-1 range — the
        // buckets currently holding the *oldest* data, which are about
        // to become the newest (empty) ones.
        let new_head = (head + self.bucket_count - shift) % self.bucket_count;
        for k in 0..shift {
            let physical = (new_head + k) % self.bucket_count;
            self.store.reset(physical);
        }
        self.head_index.store(new_head, Ordering::Release);
        self.latest_event_id.fetch_add((shift as i64) * self.interval, Ordering::AcqRel);
    }

    /// Drains queued deferred writes (bounded burst) while already
    /// holding `advance_mutex`. Flushes every thread's local batch first
    /// — the thread holding the mutex here is rarely the thread whose
    /// writes are sitting in it — then replays whatever lands in the
    /// shared queue.
    fn drain_pending_locked(&self) {
        self.pending.flush_all();
        for write in self.pending.drain_burst(DEFAULT_DRAIN_BURST) {
            self.record_locked(write.event_id, write.value);
        }
    }

    /// Used by readers that pass an explicit `latest_event_id`: first
    /// wait (bounded) for any in-flight pending advancements to drain,
    /// then force the window to cover `latest_event_id`.
    fn force_advance(&self, latest_event_id: i64) {
        self.wait_for_pending_drain();

        let latest = self.latest_event_id.load(Ordering::Acquire);
        if bucket_offset(latest, latest_event_id, self.interval) >= 0 {
            return;
        }

        let _guard = self.advance_mutex.lock();
        let latest = self.latest_event_id.load(Ordering::Acquire);
        if bucket_offset(latest, latest_event_id, self.interval) < 0 {
            self.advance_locked(latest_event_id);
        }
        self.drain_pending_locked();
    }

    fn wait_for_pending_drain(&self) {
        if self.pending.is_empty() {
            return;
        }
        let deadline = Instant::now() + PENDING_DRAIN_TIMEOUT;
        loop {
            if self.pending.is_empty() {
                return;
            }
            if let Some(_guard) = self.advance_mutex.try_lock() {
                self.drain_pending_locked();
                return;
            }
            if Instant::now() >= deadline {
                return;
            }
            std::thread::yield_now();
        }
    }
}

/// Computes the signed bucket offset from the head for an incoming
/// `event_id` given the current `latest_event_id` and `interval`.
/// Non-negative results name existing buckets (0 = head); negative
/// results name buckets that don't exist yet and require advancement.
pub fn bucket_offset(latest_event_id: i64, event_id: i64, interval: i64) -> i64 {
    let diff = latest_event_id - event_id;
    let q = diff / interval;
    let r = diff % interval;
    if r < 0 {
        q - 1
    } else {
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SummingStore;

    fn buf(bucket_count: usize, interval: i64, latest: i64) -> CyclicBucketBuffer<SummingStore> {
        CyclicBucketBuffer::new(bucket_count, interval, latest)
    }

    #[test]
    fn bucket_offset_computes_expected_index() {
        assert_eq!(bucket_offset(100, 100, 10), 0);
        assert_eq!(bucket_offset(100, 95, 10), 0);
        assert_eq!(bucket_offset(100, 90, 10), 1);
        assert_eq!(bucket_offset(100, 105, 10), -1);
        assert_eq!(bucket_offset(100, 115, 10), -2);
    }

    #[test]
    fn records_within_current_window() {
        let b = buf(4, 10, 100);
        b.record(100, 5);
        b.record(95, 3);
        b.record(85, 1);
        assert_eq!(b.all_elements(), vec![8, 1, 0, 0]);
    }

    #[test]
    fn single_step_advance_resets_new_head_only() {
        let b = buf(4, 10, 100);
        b.record(100, 5);
        b.record(90, 2);
        b.record(105, 7); // advance by one bucket
        // old head (5) becomes index 1, old index1(2) becomes index2,
        // new head holds 7.
        assert_eq!(b.all_elements(), vec![7, 5, 2, 0]);
        assert_eq!(b.latest_event_id(), 110);
    }

    #[test]
    fn multi_step_advance_resets_vacated_range() {
        let b = buf(4, 10, 100);
        b.record(100, 9);
        b.record(121, 4); // shift by 3 buckets
        assert_eq!(b.latest_event_id(), 130);
        assert_eq!(b.all_elements(), vec![4, 0, 0, 9]);
    }

    #[test]
    fn full_reset_when_shift_exceeds_bucket_count() {
        let b = buf(4, 10, 100);
        b.record(100, 9);
        b.record(1000, 4); // far beyond window -> full reset
        assert_eq!(b.latest_event_id(), 1000);
        assert_eq!(b.all_elements(), vec![4, 0, 0, 0]);
    }

    #[test]
    fn explicit_reset_sets_latest_unconditionally() {
        let b = buf(3, 10, 100);
        b.record(100, 9);
        b.reset(5);
        assert_eq!(b.latest_event_id(), 5);
        assert_eq!(b.all_elements(), vec![0, 0, 0]);
    }

    #[test]
    fn as_of_forces_advancement_for_the_reader() {
        let b = buf(4, 10, 100);
        b.record(100, 3);
        // A reader demanding a later window forces the head forward
        // even though no writer has recorded at that event id yet.
        assert_eq!(b.all_elements_as_of(130), vec![0, 0, 0, 3]);
        assert_eq!(b.latest_event_id(), 130);
    }

    #[test]
    fn tail_excludes_head() {
        let b = buf(3, 10, 100);
        b.record(100, 1);
        b.record(90, 2);
        b.record(80, 3);
        assert_eq!(b.tail_elements(), vec![2, 3]);
    }

    #[test]
    fn stale_write_outside_window_is_dropped() {
        let b = buf(3, 10, 100);
        b.record(0, 99); // 10 buckets in the past, window is only 3 wide
        assert_eq!(b.all_elements(), vec![0, 0, 0]);
    }

    #[test]
    fn pending_writes_from_losing_threads_are_visible_after_force_advance() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let b: Arc<CyclicBucketBuffer<SummingStore>> = Arc::new(buf(4, 10, 100));
        const WRITERS: usize = 8;
        let barrier = Arc::new(Barrier::new(WRITERS));
        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let b = b.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    // All writers race to advance past the current window at
                    // once; exactly one wins `try_lock` and the rest queue
                    // their write (each a batch of 1, far below the
                    // thread-local flush threshold).
                    b.record(110, 1);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // A reader forcing the window forward must see every writer's
        // contribution, including the ones that never flushed their own
        // batch and were sitting on a thread that never re-acquired the
        // advancement mutex itself.
        let total: i64 = b.all_elements_as_of(110).iter().sum();
        assert_eq!(total, WRITERS as i64);
    }
}
