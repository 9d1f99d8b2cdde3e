use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fortify_common::{Error, Result};
use parking_lot::{Condvar, Mutex};

const STATUS_PENDING: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_DONE: u8 = 2;
const STATUS_CANCELLED: u8 = 3;

pub(crate) struct TaskInner<T> {
    status: AtomicU8,
    interrupt_requested: AtomicBool,
    result: Mutex<Option<Result<T>>>,
    condvar: Condvar,
}

impl<T: Send + 'static> TaskInner<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            status: AtomicU8::new(STATUS_PENDING),
            interrupt_requested: AtomicBool::new(false),
            result: Mutex::new(None),
            condvar: Condvar::new(),
        })
    }

    /// Runs `f` unless the task was cancelled before a worker picked it
    /// up. The interrupt flag is exposed so a long-running task body can
    /// poll it cooperatively; this pool never preempts a running thread.
    /// A panicking task body is caught and surfaced as
    /// [`fortify_common::Error::ExceptionOccurred`] rather than taking
    /// the worker thread down with it.
    pub(crate) fn run(self: &Arc<Self>, f: impl FnOnce(&AtomicBool) -> Result<T>) {
        if self
            .status
            .compare_exchange(STATUS_PENDING, STATUS_RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let interrupt = &self.interrupt_requested;
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(interrupt)))
            .unwrap_or_else(|payload| Err(Error::exception(TaskPanic::from_payload(payload))));
        let mut guard = self.result.lock();
        *guard = Some(outcome);
        self.status.store(STATUS_DONE, Ordering::Release);
        drop(guard);
        self.condvar.notify_all();
    }
}

/// Wraps a caught panic payload so it can travel as the `source` of an
/// `ExceptionOccurred` error.
#[derive(Debug)]
struct TaskPanic(String);

impl TaskPanic {
    fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "task panicked with a non-string payload".to_string());
        Self(message)
    }
}

impl std::fmt::Display for TaskPanic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TaskPanic {}

/// Handle to a task submitted via [`crate::pool::BoundedPool::submit`]:
/// blocking and bounded wait, cancellation with
/// an interrupt flag the task body may observe, a completion query, and
/// exception propagation by kind (interruption, execution failure,
/// timeout — all surfaced through the shared [`fortify_common::Error`]
/// taxonomy).
pub struct TaskHandle<T> {
    pub(crate) inner: Arc<TaskInner<T>>,
}

impl<T: Send + 'static> TaskHandle<T> {
    pub(crate) fn new() -> Self {
        Self { inner: TaskInner::new() }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.inner.status.load(Ordering::Acquire), STATUS_DONE | STATUS_CANCELLED)
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.status.load(Ordering::Acquire) == STATUS_CANCELLED
    }

    /// If the task has not yet started, marks it cancelled and it will
    /// never run. If it has already started, `interrupt` sets the
    /// cooperative flag but the call returns `false` since the task
    /// cannot be preempted out from under its worker thread.
    pub fn cancel(&self, interrupt: bool) -> bool {
        if interrupt {
            self.inner.interrupt_requested.store(true, Ordering::Release);
        }
        self.inner
            .status
            .compare_exchange(STATUS_PENDING, STATUS_CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn cancelled_error() -> Error {
        Error::invalid_argument("task", "cancelled before completion")
    }

    pub fn await_blocking(self) -> Result<T> {
        let mut guard = self.inner.result.lock();
        loop {
            if let Some(result) = guard.take() {
                return result;
            }
            if self.is_cancelled() {
                return Err(Self::cancelled_error());
            }
            self.inner.condvar.wait(&mut guard);
        }
    }

    pub fn await_timeout(self, timeout: Duration) -> Result<T> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.result.lock();
        loop {
            if let Some(result) = guard.take() {
                return result;
            }
            if self.is_cancelled() {
                return Err(Self::cancelled_error());
            }
            let now = Instant::now();
            if now >= deadline {
                let elapsed_ms = timeout.as_millis() as u64;
                return Err(Error::OperationTimedOut {
                    elapsed_ms,
                    limit_ms: elapsed_ms,
                });
            }
            self.inner.condvar.wait_for(&mut guard, deadline - now);
        }
    }
}
