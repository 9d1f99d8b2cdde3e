use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_queue::ArrayQueue;
use fortify_common::{Error, Result};
use parking_lot::{Condvar, Mutex};

use crate::task::TaskHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Construction knobs for a [`BoundedPool`].
pub struct BoundedPoolOptions {
    pub name: String,
    pub core_threads: usize,
    pub max_threads: usize,
    pub queue_capacity: usize,
    pub keep_alive: Duration,
    pub allow_core_thread_timeout: bool,
}

impl Default for BoundedPoolOptions {
    fn default() -> Self {
        Self {
            name: "fortify-pool".to_string(),
            core_threads: 1,
            max_threads: 1,
            queue_capacity: 64,
            keep_alive: Duration::from_secs(60),
            allow_core_thread_timeout: false,
        }
    }
}

struct PoolState {
    live_threads: usize,
    shutdown: bool,
}

struct Shared {
    queue: ArrayQueue<Job>,
    lock: Mutex<PoolState>,
    not_empty: Condvar,
    options: BoundedPoolOptions,
}

/// A worker pool backed by a bounded intake queue. The only
/// testable admission contract beyond running submitted work: when both
/// the queue and the worker set are saturated, submission fails
/// (`ThreadPoolRejected`), distinct from any error the task itself
/// raises once it runs.
pub struct BoundedPool {
    shared: Arc<Shared>,
}

impl BoundedPool {
    pub fn new(options: BoundedPoolOptions) -> Self {
        let shared = Arc::new(Shared {
            queue: ArrayQueue::new(options.queue_capacity.max(1)),
            lock: Mutex::new(PoolState {
                live_threads: 0,
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            options,
        });
        {
            let mut state = shared.lock.lock();
            for _ in 0..shared.options.core_threads {
                state.live_threads += 1;
                spawn_worker(shared.clone(), true);
            }
        }
        Self { shared }
    }

    pub fn name(&self) -> &str {
        &self.shared.options.name
    }

    fn try_submit(&self, job: Job) -> bool {
        let mut state = self.shared.lock.lock();
        if state.shutdown {
            return false;
        }
        match self.shared.queue.push(job) {
            Ok(()) => {
                if state.live_threads < self.shared.options.max_threads {
                    state.live_threads += 1;
                    spawn_worker(self.shared.clone(), false);
                }
                self.shared.not_empty.notify_one();
                true
            }
            Err(rejected_job) => {
                drop(state);
                drop(rejected_job);
                tracing::debug!(pool = %self.shared.options.name, "rejecting submission, queue and workers saturated");
                false
            }
        }
    }

    /// Submits `f`, returning a [`TaskHandle`] on admission. Saturated
    /// queue and worker set yields `ThreadPoolRejected` immediately.
    pub fn submit<F, T>(&self, f: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce(&AtomicBool) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = TaskHandle::new();
        let inner = handle.inner.clone();
        let job: Job = Box::new(move || inner.run(f));
        if self.try_submit(job) {
            Ok(handle)
        } else {
            Err(Error::ThreadPoolRejected {
                name: self.shared.options.name.clone(),
            })
        }
    }

    /// Submits `f` and blocks for at most `timeout` for its result.
    pub fn submit_with_timeout<F, T>(&self, f: F, timeout: Duration) -> Result<T>
    where
        F: FnOnce(&AtomicBool) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(f)?.await_timeout(timeout)
    }

    pub fn shutdown(&self) {
        let mut state = self.shared.lock.lock();
        state.shutdown = true;
        self.shared.not_empty.notify_all();
    }

    pub fn active_threads(&self) -> usize {
        self.shared.lock.lock().live_threads
    }
}

fn spawn_worker(shared: Arc<Shared>, core: bool) {
    thread::Builder::new()
        .name(shared.options.name.clone())
        .spawn(move || worker_loop(shared, core))
        .expect("failed to spawn pool worker thread");
}

fn worker_loop(shared: Arc<Shared>, core: bool) {
    loop {
        if let Some(job) = shared.queue.pop() {
            job();
            continue;
        }

        let mut state = shared.lock.lock();
        if state.shutdown {
            state.live_threads = state.live_threads.saturating_sub(1);
            return;
        }
        if !shared.queue.is_empty() {
            continue;
        }

        let allow_timeout = !core || shared.options.allow_core_thread_timeout;
        if allow_timeout {
            let timed_out = shared.not_empty.wait_for(&mut state, shared.options.keep_alive).timed_out();
            if timed_out && shared.queue.is_empty() {
                state.live_threads = state.live_threads.saturating_sub(1);
                return;
            }
        } else {
            shared.not_empty.wait(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn pool(core: usize, max: usize, queue: usize) -> BoundedPool {
        BoundedPool::new(BoundedPoolOptions {
            name: "test-pool".to_string(),
            core_threads: core,
            max_threads: max,
            queue_capacity: queue,
            keep_alive: Duration::from_millis(200),
            allow_core_thread_timeout: false,
        })
    }

    #[test]
    fn submitted_task_runs_and_returns_result() {
        let pool = pool(2, 4, 8);
        let handle = pool.submit(|_| Ok(2 + 3)).unwrap();
        assert_eq!(handle.await_blocking().unwrap(), 5);
    }

    #[test]
    fn pool_timeout_then_fast_task_succeeds() {
        let pool = pool(20, 20, 30);
        let result = pool.submit_with_timeout(
            |_| {
                thread::sleep(Duration::from_secs(1));
                Ok(())
            },
            Duration::from_millis(100),
        );
        assert!(matches!(result, Err(Error::OperationTimedOut { .. })));

        let fast = pool.submit_with_timeout(|_| Ok(42), Duration::from_secs(1)).unwrap();
        assert_eq!(fast, 42);
    }

    #[test]
    fn saturated_pool_rejects_submission() {
        let pool = pool(1, 1, 1);
        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let gate2 = gate.clone();
        // Occupy the single worker with a task blocked on the gate.
        let _occupying = pool
            .submit(move |_| {
                let (lock, cv) = &*gate2;
                let mut released = lock.lock();
                while !*released {
                    cv.wait(&mut released);
                }
                Ok(())
            })
            .unwrap();
        // Fill the one-slot queue.
        let _queued = pool.submit(|_| Ok(())).unwrap();
        let rejected = pool.submit(|_| Ok(()));
        assert!(matches!(rejected, Err(Error::ThreadPoolRejected { .. })));

        let (lock, cv) = &*gate;
        *lock.lock() = true;
        cv.notify_all();
    }

    #[test]
    fn cancel_before_start_prevents_execution() {
        let pool = pool(1, 1, 4);
        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let gate2 = gate.clone();
        // Occupy the single worker so the next submission is guaranteed
        // to sit in the queue, never picked up before we cancel it.
        let _occupying = pool
            .submit(move |_| {
                let (lock, cv) = &*gate2;
                let mut released = lock.lock();
                while !*released {
                    cv.wait(&mut released);
                }
                Ok(())
            })
            .unwrap();

        let ran = Arc::new(AtomicBool::new(false));
        let ran2 = ran.clone();
        let handle = pool.submit(move |_| {
            ran2.store(true, Ordering::SeqCst);
            Ok(())
        }).unwrap();
        assert!(handle.cancel(false));
        assert!(handle.is_cancelled());

        let (lock, cv) = &*gate;
        *lock.lock() = true;
        cv.notify_all();
        thread::sleep(Duration::from_millis(50));
        assert!(!ran.load(Ordering::SeqCst));
    }
}
