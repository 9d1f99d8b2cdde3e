use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;
use rand::Rng;
use thread_local::ThreadLocal;

/// A single deferred write: a writer discovered it needed to advance
/// the head but lost the race for the advancement mutex, so it leaves
/// its `(event_id, value)` pair here for whoever holds the mutex next.
#[derive(Debug, Clone, Copy)]
pub struct PendingWrite {
    pub event_id: i64,
    pub value: i64,
}

const LOCAL_BATCH_SIZE: usize = 32;

type Batch = Arc<Mutex<Vec<PendingWrite>>>;

/// Bounded action queue with soft/hard flood thresholds, fronted by a
/// per-thread pre-batch so bursts of contended writers don't all hammer
/// the shared lock-free queue individually.
///
/// Every thread's batch is also registered in `registry`, so whichever
/// thread ends up holding the advancement mutex — rarely the thread
/// that deferred any given write — can flush *every* thread's batch,
/// not just its own.
pub struct PendingQueue {
    shared: ArrayQueue<PendingWrite>,
    soft_threshold: usize,
    hard_threshold: usize,
    local: ThreadLocal<Batch>,
    registry: Mutex<Vec<Batch>>,
}

impl PendingQueue {
    pub fn new(capacity: usize, soft_threshold: usize, hard_threshold: usize) -> Self {
        Self {
            shared: ArrayQueue::new(capacity.max(1)),
            soft_threshold,
            hard_threshold,
            local: ThreadLocal::new(),
            registry: Mutex::new(Vec::new()),
        }
    }

    fn local_batch(&self) -> &Batch {
        self.local.get_or(|| {
            let batch: Batch = Arc::new(Mutex::new(Vec::with_capacity(LOCAL_BATCH_SIZE)));
            self.registry.lock().push(batch.clone());
            batch
        })
    }

    /// Offers a deferred write. Buffers it in the calling thread's
    /// local batch first, flushing the batch into the shared queue once
    /// it reaches [`LOCAL_BATCH_SIZE`].
    pub fn offer(&self, write: PendingWrite) {
        let cell = self.local_batch();
        let mut batch = cell.lock();
        batch.push(write);
        if batch.len() >= LOCAL_BATCH_SIZE {
            self.flush_batch(&mut batch);
        }
    }

    /// Flushes every registered thread's local batch into the shared
    /// queue. Called by whoever currently holds the advancement mutex,
    /// since that's almost never the thread whose batch is stuck below
    /// [`LOCAL_BATCH_SIZE`].
    pub fn flush_all(&self) {
        for cell in self.registry.lock().iter() {
            let mut batch = cell.lock();
            if !batch.is_empty() {
                self.flush_batch(&mut batch);
            }
        }
    }

    fn flush_batch(&self, batch: &mut Vec<PendingWrite>) {
        for write in batch.drain(..) {
            self.offer_shared(write);
        }
    }

    fn offer_shared(&self, write: PendingWrite) {
        let len = self.shared.len();
        if len >= self.hard_threshold {
            tracing::warn!(len, "pending bucket advancement queue at hard flood, dropping write");
            return;
        }
        if len >= self.soft_threshold && !sample_one_percent() {
            tracing::trace!(len, "pending bucket advancement queue at soft flood, sampling out write");
            return;
        }
        if self.shared.push(write).is_err() {
            tracing::warn!("pending bucket advancement queue full, dropping write");
        }
    }

    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// True only if the shared queue *and* every thread's local batch
    /// are empty — a caller relying on this to decide whether any
    /// pending writes remain anywhere must see a registered batch that
    /// hasn't hit [`LOCAL_BATCH_SIZE`] yet as still pending.
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.registry.lock().iter().all(|cell| cell.lock().is_empty())
    }

    /// Pops up to `burst_size` queued writes for the caller (already
    /// holding the advancement mutex) to replay.
    pub fn drain_burst(&self, burst_size: usize) -> Vec<PendingWrite> {
        let mut out = Vec::with_capacity(burst_size.min(self.shared.len().max(1)));
        while out.len() < burst_size {
            match self.shared.pop() {
                Some(w) => out.push(w),
                None => break,
            }
        }
        out
    }

    pub fn clear(&self) {
        while self.shared.pop().is_some() {}
        for cell in self.registry.lock().iter() {
            cell.lock().clear();
        }
    }
}

fn sample_one_percent() -> bool {
    rand::rng().random_ratio(1, 100)
}
